#[cfg(test)]
mod kmer_codec_tests {
    use katss::kmers::kmer_codec::*;
    use katss::KatssError;

    #[test]
    fn k3_extremes() {
        let spec = build_kmer_spec(3).unwrap();
        assert_eq!(spec.encode(b"AAA", 0), Some(0));
        assert_eq!(spec.encode(b"TTT", 0), Some(63));
        assert_eq!(spec.encode(b"UUU", 0), Some(63));
        assert_eq!(spec.decode(0), "AAA");
        assert_eq!(spec.decode(63), "TTT");

        let rna = KmerSpec { k: 3, use_t: false };
        assert_eq!(rna.decode(63), "UUU");
    }

    #[test]
    fn most_significant_position_first() {
        // C=1 G=2 T=3 -> 0b01_10_11
        assert_eq!(encode(b"CGT", 0, 3), Some(0b01_10_11));
        assert_eq!(encode(b"xxCGT", 2, 3), Some(27));
    }

    #[test]
    fn every_key_round_trips_for_small_k() {
        for k in 1..=6 {
            let spec = build_kmer_spec(k).unwrap();
            for key in 0..spec.num_keys() as KmerKey {
                let text = spec.decode(key);
                assert_eq!(text.len(), k);
                assert_eq!(spec.encode(text.as_bytes(), 0), Some(key), "k={k} {text}");
            }
        }
    }

    #[test]
    fn lowercase_and_u_are_accepted() {
        let spec = build_kmer_spec(4).unwrap();
        assert_eq!(spec.encode(b"acgu", 0), spec.encode(b"ACGT", 0));
    }

    #[test]
    fn line_breaks_do_not_consume_positions() {
        let spec = build_kmer_spec(4).unwrap();
        assert_eq!(spec.encode(b"AC\nGT", 0), spec.encode(b"ACGT", 0));
        assert_eq!(spec.encode(b"A\r\nCGT", 0), spec.encode(b"ACGT", 0));
    }

    #[test]
    fn invalid_or_short_windows_are_rejected() {
        let spec = build_kmer_spec(3).unwrap();
        assert_eq!(spec.encode(b"ANA", 0), None);
        assert_eq!(spec.encode(b"AC", 0), None);
        assert_eq!(spec.encode(b"ACG", 1), None);
        assert_eq!(spec.encode(b"ACG", 10), None);
        assert_eq!(spec.encode(b"AC\n", 0), None);
    }

    #[test]
    fn kmer_size_is_validated() {
        assert!(matches!(build_kmer_spec(0), Err(KatssError::InvalidKmerSize(0))));
        assert!(matches!(build_kmer_spec(17), Err(KatssError::InvalidKmerSize(17))));
        assert!(build_kmer_spec(16).is_ok());
    }

    #[test]
    fn scanner_skips_windows_with_invalid_bases() {
        let spec = build_kmer_spec(2).unwrap();
        let keys: Vec<String> = spec.scan(b"ACNGT").map(|k| spec.decode(k)).collect();
        assert_eq!(keys, vec!["AC", "GT"]);
    }

    #[test]
    fn all_motifs_are_in_key_order() {
        let spec = build_kmer_spec(2).unwrap();
        let motifs = all_motifs(&spec);
        assert_eq!(motifs.len(), 16);
        assert_eq!(motifs[0], "AA");
        assert_eq!(motifs[1], "AC");
        assert_eq!(motifs[15], "TT");
    }
}

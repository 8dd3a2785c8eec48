#[cfg(test)]
mod counting_tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use katss::kmers::count_table::{CountTable, Storage};
    use katss::kmers::counting::count_source;
    use katss::kmers::kmer_codec::KmerKey;
    use katss::kmers::{CountOptions, KmerCounter};
    use katss::seqfile::{ChunkSource, SeqFile, SeqFormat};
    use katss::KatssError;
    use parking_lot::Mutex;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn write_tmp(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(contents).expect("write temp file");
        file.flush().expect("flush temp file");
        file
    }

    fn in_memory(text: &str, format: SeqFormat) -> SeqFile {
        SeqFile::from_reader(Box::new(Cursor::new(text.as_bytes().to_vec())), format)
    }

    /// Hands out one raw chunk per entry of `chunks`, then fails.
    struct FailingSource {
        chunks: Mutex<Vec<&'static str>>,
    }

    impl FailingSource {
        fn new(chunks: &[&'static str]) -> Self {
            let mut chunks = chunks.to_vec();
            chunks.reverse();
            FailingSource {
                chunks: Mutex::new(chunks),
            }
        }
    }

    impl ChunkSource for FailingSource {
        fn format(&self) -> SeqFormat {
            SeqFormat::Raw
        }

        fn read_chunk(&self, buf: &mut Vec<u8>, _max_len: usize) -> katss::Result<usize> {
            match self.chunks.lock().pop() {
                Some(chunk) => {
                    buf.clear();
                    buf.extend_from_slice(chunk.as_bytes());
                    Ok(buf.len())
                }
                None => Err(std::io::Error::other("device unplugged").into()),
            }
        }
    }

    /// Deterministic pseudo-random reads, a few with N.
    fn reads(n: usize, len: usize) -> String {
        let mut state = 0x2545_f491_u64;
        let mut out = String::new();
        for _ in 0..n {
            for _ in 0..len {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                out.push(match state % 41 {
                    0 => 'N',
                    r => ['A', 'C', 'G', 'T'][(r % 4) as usize],
                });
            }
            out.push('\n');
        }
        out
    }

    fn snapshot(counter: &KmerCounter) -> Vec<(KmerKey, u64)> {
        counter.table().nonzero_entries()
    }

    #[test]
    fn acgt_dinucleotides() -> anyhow::Result<()> {
        let tmp = write_tmp(b"ACGT\n");
        let counter = KmerCounter::count_path(tmp.path(), CountOptions::new(2))?;
        assert_eq!(counter.get_kmer("AC"), Some(1));
        assert_eq!(counter.get_kmer("CG"), Some(1));
        assert_eq!(counter.get_kmer("GT"), Some(1));
        assert_eq!(counter.get_kmer("AA"), Some(0));
        assert_eq!(counter.total(), 3);
        Ok(())
    }

    #[test]
    fn windows_with_n_are_skipped() -> anyhow::Result<()> {
        // 80 % nucleotides, below the autodetection threshold
        let source = in_memory("ACNAC\n", SeqFormat::Raw);
        let counter = KmerCounter::count_source(&source, CountOptions::new(2))?;
        assert_eq!(counter.get_kmer("AC"), Some(2));
        assert_eq!(counter.total(), 2);
        let c = counter.scan_counters();
        assert_eq!(c.windows, 4);
        assert_eq!(c.skipped, 2);
        assert_eq!(c.counted, 2);
        Ok(())
    }

    #[test]
    fn fasta_bodies_span_lines_but_not_records() -> anyhow::Result<()> {
        let tmp = write_tmp(b">one\nAC\nGT\n>two\nAA\n");
        let counter = KmerCounter::count_path(tmp.path(), CountOptions::new(3))?;
        // ACG and CGT cross the line break; nothing spans ">two"
        assert_eq!(counter.get_kmer("ACG"), Some(1));
        assert_eq!(counter.get_kmer("CGT"), Some(1));
        assert_eq!(counter.get_kmer("GTA"), Some(0));
        assert_eq!(counter.total(), 2);
        Ok(())
    }

    #[test]
    fn fastq_counts_only_sequence_lines() -> anyhow::Result<()> {
        let tmp = write_tmp(b"@r1\nACGT\n+\nAAAA\n@r2\nCCCC\n+\nIIII\n");
        let counter = KmerCounter::count_path(tmp.path(), CountOptions::new(2))?;
        assert_eq!(counter.get_kmer("AA"), Some(0));
        assert_eq!(counter.get_kmer("CC"), Some(3));
        assert_eq!(counter.total(), 6);
        Ok(())
    }

    #[test]
    fn gzip_input_counts_like_plain() -> anyhow::Result<()> {
        let text = reads(50, 40);
        let plain = write_tmp(text.as_bytes());
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(text.as_bytes())?;
        let gz = write_tmp(&enc.finish()?);

        let a = KmerCounter::count_path(plain.path(), CountOptions::new(4))?;
        let b = KmerCounter::count_path(gz.path(), CountOptions::new(4))?;
        assert_eq!(snapshot(&a), snapshot(&b));
        Ok(())
    }

    #[test]
    fn counts_do_not_depend_on_thread_count() -> anyhow::Result<()> {
        let text = reads(400, 80);
        let reference = KmerCounter::count_source(
            &in_memory(&text, SeqFormat::Raw),
            CountOptions::new(5),
        )?;
        for threads in [2, 4, 16] {
            let options = CountOptions::new(5).with_threads(threads).with_chunk_size(512);
            let counter = KmerCounter::count_source(&in_memory(&text, SeqFormat::Raw), options)?;
            assert_eq!(snapshot(&counter), snapshot(&reference), "threads={threads}");
            assert_eq!(counter.total(), reference.total());
        }
        Ok(())
    }

    #[test]
    fn counts_do_not_depend_on_flush_threshold_or_storage() -> anyhow::Result<()> {
        let text = reads(100, 60);
        let reference = KmerCounter::count_source(
            &in_memory(&text, SeqFormat::Raw),
            CountOptions::new(6),
        )?;
        for (flush, storage) in [(1, Storage::Dense), (7, Storage::Sparse), (1000, Storage::Auto)] {
            let options = CountOptions::new(6)
                .with_threads(3)
                .with_flush_threshold(flush)
                .with_storage(storage);
            let counter = KmerCounter::count_source(&in_memory(&text, SeqFormat::Raw), options)?;
            assert_eq!(snapshot(&counter), snapshot(&reference), "flush={flush}");
        }
        Ok(())
    }

    #[test]
    fn low_level_count_accumulates_into_an_existing_table() -> anyhow::Result<()> {
        let table = CountTable::new(2, Storage::Dense)?;
        let options = CountOptions::new(2).with_threads(2);
        count_source(&in_memory("ACGT\n", SeqFormat::Raw), &table, &options)?.into_result()?;
        count_source(&in_memory("ACGT\n", SeqFormat::Raw), &table, &options)?.into_result()?;
        assert_eq!(table.total(), 6);
        Ok(())
    }

    #[test]
    fn mismatched_table_is_rejected() {
        let table = CountTable::new(3, Storage::Dense).unwrap();
        let err = count_source(
            &in_memory("ACGT\n", SeqFormat::Raw),
            &table,
            &CountOptions::new(2),
        )
        .unwrap_err();
        assert!(matches!(err, KatssError::KmerSizeMismatch(3, 2)));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let source = in_memory("ACGT\n", SeqFormat::Raw);
        assert!(matches!(
            KmerCounter::count_source(&source, CountOptions::new(0)),
            Err(KatssError::InvalidKmerSize(0))
        ));
        assert!(matches!(
            KmerCounter::count_source(&source, CountOptions::new(3).with_chunk_size(0)),
            Err(KatssError::InvalidOption(_))
        ));
    }

    #[test]
    fn failed_read_yields_partial_result_and_no_counter() {
        let source = FailingSource::new(&["ACGT\n", "GGCC\n"]);
        let result = KmerCounter::count_source(&source, CountOptions::new(2).with_threads(2));
        match result {
            Err(KatssError::PartialResult {
                failed, workers, ..
            }) => {
                assert_eq!(workers, 2);
                assert!(failed >= 1);
            }
            other => panic!("expected a partial result, got {other:?}"),
        }
    }

    #[test]
    fn low_level_count_keeps_best_effort_counts() -> anyhow::Result<()> {
        let table = CountTable::new(2, Storage::Dense)?;
        let source = FailingSource::new(&["ACGT\n"]);
        let report = count_source(&source, &table, &CountOptions::new(2))?;
        assert!(!report.is_complete());
        assert_eq!(report.counters.counted, 3);
        assert_eq!(table.total(), 3);
        Ok(())
    }
}

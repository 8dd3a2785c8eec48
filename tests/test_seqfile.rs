#[cfg(test)]
mod seqfile_tests {
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression as Level;
    use katss::seqfile::*;
    use katss::KatssError;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn write_tmp(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(contents).expect("write temp file");
        file.flush().expect("flush temp file");
        file
    }

    fn detect(text: &str) -> Option<SeqFormat> {
        detect_format_from(Cursor::new(text.as_bytes())).unwrap()
    }

    #[test]
    fn two_fastq_records_are_fastq() {
        let text = "@r1\nACGT\n+\nIIII\n@r2\nGGCC\n+\nIIII\n";
        assert_eq!(detect(text), Some(SeqFormat::Fastq));
    }

    #[test]
    fn fastq_with_fasta_like_quality_line_is_fastq() {
        let text = "@r1\nACGT\n+\n>III\n@r2\nGGCC\n+\n;III\n";
        assert_eq!(detect(text), Some(SeqFormat::Fastq));
    }

    #[test]
    fn header_line_off_the_quality_position_is_fasta() {
        assert_eq!(detect("@x\nACGT\n>y\nACGT\n"), Some(SeqFormat::Fasta));
    }

    #[test]
    fn header_line_first_is_fasta() {
        assert_eq!(detect(">seq1\nACGT\nAC\n"), Some(SeqFormat::Fasta));
        assert_eq!(detect(";comment\n>seq1\nACGT\n"), Some(SeqFormat::Fasta));
    }

    #[test]
    fn eight_sequence_lines_are_raw() {
        let text = "ACGTACGT\n".repeat(8);
        assert_eq!(detect(&text), Some(SeqFormat::Raw));
    }

    #[test]
    fn mostly_nucleotide_lines_are_raw() {
        // 1 N in 10 bases is still 90 % nucleotides
        let text = "ACGTNACGTA\nACGUACGUAC\n";
        assert_eq!(detect(text), Some(SeqFormat::Raw));
    }

    #[test]
    fn prose_is_unrecognized() {
        assert_eq!(detect("hello world\nthis is not dna\n"), None);
        assert_eq!(detect(""), None);
    }

    #[test]
    fn unrecognized_file_is_an_error() {
        let tmp = write_tmp(b"name,value\nfoo,1\n");
        let err = SeqFile::open_detected(tmp.path()).err().unwrap();
        assert!(matches!(err, KatssError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = detect_format(std::path::Path::new("/nonexistent/reads.fa")).unwrap_err();
        assert!(matches!(err, KatssError::Open { .. }));
    }

    fn read_all(file: &SeqFile) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = Vec::new();
        while file.read_chunk(&mut buf, 16).unwrap() > 0 {
            out.extend_from_slice(&buf);
        }
        out
    }

    #[test]
    fn gzip_input_is_decompressed() -> anyhow::Result<()> {
        let text = b">a\nACGT\n>b\nGGCC\n";
        let mut enc = GzEncoder::new(Vec::new(), Level::default());
        enc.write_all(text)?;
        let tmp = write_tmp(&enc.finish()?);

        assert_eq!(detect_format(tmp.path())?, SeqFormat::Fasta);
        let file = SeqFile::open_detected(tmp.path())?;
        assert_eq!(file.format(), SeqFormat::Fasta);
        assert_eq!(read_all(&file), text.to_vec());
        Ok(())
    }

    #[test]
    fn zlib_input_is_decompressed() -> anyhow::Result<()> {
        let text = b"ACGT\nTTGA\n";
        let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
        enc.write_all(text)?;
        let tmp = write_tmp(&enc.finish()?);

        let file = SeqFile::open_detected(tmp.path())?;
        assert_eq!(file.format(), SeqFormat::Raw);
        assert_eq!(read_all(&file), text.to_vec());
        Ok(())
    }

    #[test]
    fn chunks_never_split_records() -> anyhow::Result<()> {
        let tmp = write_tmp(b">a\nAAAA\nCCCC\n>b\nGGGG\n>c\nTT\n");
        let file = SeqFile::open(tmp.path(), SeqFormat::Fasta)?;
        let mut buf = Vec::new();
        let mut records = Vec::new();
        let mut ranges = Vec::new();
        while file.read_chunk(&mut buf, 4)? > 0 {
            file.format().records(&buf, &mut ranges);
            records.extend(ranges.iter().map(|r| buf[r.clone()].to_vec()));
        }
        assert_eq!(
            records,
            vec![b"AAAA\nCCCC\n".to_vec(), b"GGGG\n".to_vec(), b"TT\n".to_vec()]
        );
        Ok(())
    }
}

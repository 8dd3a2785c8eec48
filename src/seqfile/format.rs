use crate::kmers::kmer_codec::is_nucleotide;
use std::io::BufRead;
use std::ops::Range;

/// Number of lines sampled when guessing the format of a file.
pub const SAMPLE_LINES: usize = 10;
/// Minimum fraction of nucleotide characters for a line to count as sequence.
pub const MIN_NUCLEOTIDE_FRACTION: f64 = 0.9;

/// Layout of a sequence file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeqFormat {
    /// `>` header lines, sequence bodies possibly spanning several lines
    Fasta,
    /// 4-line records: `@` header, sequence, `+` separator, qualities
    Fastq,
    /// One sequence per line
    Raw,
}

impl SeqFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SeqFormat::Fasta => "FASTA",
            SeqFormat::Fastq => "FASTQ",
            SeqFormat::Raw => "raw sequences",
        }
    }

    /// Byte ranges of the sequence part of every record in `chunk`.
    ///
    /// `chunk` must hold whole records, as returned by
    /// [`SeqFile::read_chunk`](crate::seqfile::SeqFile::read_chunk).
    /// FASTA bodies keep their embedded line breaks; the other formats yield
    /// single lines without terminators. Empty sequences are skipped.
    pub fn records(&self, chunk: &[u8], out: &mut Vec<Range<usize>>) {
        out.clear();
        match self {
            SeqFormat::Fasta => fasta_records(chunk, out),
            SeqFormat::Fastq => fastq_records(chunk, out),
            SeqFormat::Raw => raw_records(chunk, out),
        }
    }
}

impl std::fmt::Display for SeqFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Iterate `(start, end_without_terminator, next_line_start)` over the lines of `chunk`.
fn lines(chunk: &[u8]) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= chunk.len() {
            return None;
        }
        let start = pos;
        let next = match chunk[start..].iter().position(|&b| b == b'\n') {
            Some(i) => start + i + 1,
            None => chunk.len(),
        };
        let mut end = if next > start && chunk[next - 1] == b'\n' {
            next - 1
        } else {
            next
        };
        if end > start && chunk[end - 1] == b'\r' {
            end -= 1;
        }
        pos = next;
        Some((start, end, next))
    })
}

fn fasta_records(chunk: &[u8], out: &mut Vec<Range<usize>>) {
    let mut body: Option<Range<usize>> = None;
    for (start, _, next) in lines(chunk) {
        let first = chunk.get(start).copied();
        if first == Some(b'>') {
            if let Some(r) = body.take() {
                push_nonempty(out, r);
            }
            body = Some(next..next);
        } else if first == Some(b';') {
            // comment lines end the current body
            if let Some(r) = body.take() {
                push_nonempty(out, r);
            }
            body = Some(next..next);
        } else if let Some(r) = body.as_mut() {
            r.end = next;
        } else {
            // sequence lines before any header form their own record
            body = Some(start..next);
        }
    }
    if let Some(r) = body {
        push_nonempty(out, r);
    }
}

fn fastq_records(chunk: &[u8], out: &mut Vec<Range<usize>>) {
    for (i, (start, end, _)) in lines(chunk).enumerate() {
        if i % 4 == 1 {
            push_nonempty(out, start..end);
        }
    }
}

fn raw_records(chunk: &[u8], out: &mut Vec<Range<usize>>) {
    for (start, end, _) in lines(chunk) {
        push_nonempty(out, start..end);
    }
}

#[inline]
fn push_nonempty(out: &mut Vec<Range<usize>>, r: Range<usize>) {
    if r.end > r.start {
        out.push(r);
    }
}

/// Guess the format from the first [`SAMPLE_LINES`] non-blank lines.
///
/// * `@` on line 1 (mod 4) and `+` on line 3 (mod 4) are FASTQ markers; two
///   or more make the file FASTQ.
/// * A line starting with `>` or `;` makes the file FASTA right away, unless
///   it sits where a FASTQ quality line would (line 0 mod 4) after a FASTQ
///   marker was seen. Quality strings may start with either character.
/// * Otherwise the file is raw sequences if every sampled line is at least
///   90 % nucleotides.
///
/// Returns `None` when no rule applies.
pub fn detect_format_from<R: BufRead>(reader: R) -> std::io::Result<Option<SeqFormat>> {
    let mut lines_read = 0usize;
    let mut fastq_markers = 0usize;
    let mut sequence_lines = 0usize;

    for line in reader.split(b'\n') {
        if lines_read == SAMPLE_LINES {
            break;
        }
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        lines_read += 1;

        match line[0] {
            b'@' if lines_read % 4 == 1 => fastq_markers += 1,
            b'+' if lines_read % 4 == 3 => fastq_markers += 1,
            b'>' | b';' if fastq_markers == 0 || lines_read % 4 != 0 => {
                return Ok(Some(SeqFormat::Fasta))
            }
            _ => {
                let nts = line.iter().filter(|&&b| is_nucleotide(b)).count();
                if nts as f64 / line.len() as f64 >= MIN_NUCLEOTIDE_FRACTION {
                    sequence_lines += 1;
                }
            }
        }
    }

    if fastq_markers >= 2 {
        Ok(Some(SeqFormat::Fastq))
    } else if lines_read > 0 && sequence_lines == lines_read {
        Ok(Some(SeqFormat::Raw))
    } else {
        Ok(None)
    }
}

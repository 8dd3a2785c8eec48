use crate::error::{KatssError, Result};
use crate::seqfile::format::{detect_format_from, SeqFormat};
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Size of the decompressed read buffer.
pub const READ_BUFFER_SIZE: usize = 1 << 16;

/// Compression detected from the first bytes of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Zlib,
}

impl Compression {
    pub fn from_magic(magic: &[u8]) -> Self {
        match magic {
            [0x1f, 0x8b, ..] => Compression::Gzip,
            [0x78, 0x01 | 0x5e | 0x9c | 0xda, ..] => Compression::Zlib,
            _ => Compression::Plain,
        }
    }
}

/// Source of whole-record text chunks that several workers can pull from.
///
/// Implementations serialize `read_chunk` internally; callers never hold any
/// other lock while requesting a chunk.
pub trait ChunkSource: Sync {
    fn format(&self) -> SeqFormat;

    /// Replace the contents of `buf` with the next chunk of whole records.
    /// Returns the number of bytes placed in `buf`; 0 once exhausted.
    fn read_chunk(&self, buf: &mut Vec<u8>, max_len: usize) -> Result<usize>;
}

/// Open `path` with transparent gzip/zlib decompression.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let open_err = |source| KatssError::Open {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(open_err)?;
    let mut magic = [0u8; 2];
    let n = read_up_to(&mut file, &mut magic).map_err(open_err)?;
    let file = File::open(path).map_err(open_err)?;
    let compression = Compression::from_magic(&magic[..n]);
    debug!(?path, ?compression, "opening sequence file");

    let reader: Box<dyn BufRead + Send> = match compression {
        Compression::Plain => Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
        Compression::Gzip => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiGzDecoder::new(file),
        )),
        Compression::Zlib => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            ZlibDecoder::new(file),
        )),
    };
    Ok(reader)
}

fn read_up_to(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Guess the format of the (possibly compressed) file at `path`.
pub fn detect_format(path: &Path) -> Result<SeqFormat> {
    let reader = open_reader(path)?;
    detect_format_from(reader)
        .map_err(|source| KatssError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| KatssError::UnrecognizedFormat {
            path: path.to_path_buf(),
        })
}

struct ReaderState {
    reader: Box<dyn BufRead + Send>,
    // header line read ahead while finishing the previous FASTA record
    pending: Vec<u8>,
    line: Vec<u8>,
    eof: bool,
}

impl ReaderState {
    /// Read one line (terminator included) into `self.line`. False at EOF.
    fn next_line(&mut self) -> Result<bool> {
        self.line.clear();
        if self.eof {
            return Ok(false);
        }
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            self.eof = true;
            return Ok(false);
        }
        if self.line.last() != Some(&b'\n') {
            self.line.push(b'\n');
        }
        Ok(true)
    }

    fn line_is_blank(&self) -> bool {
        self.line.iter().all(|b| b.is_ascii_whitespace())
    }

    /// Append the next record to `buf`. False when there are no more records.
    fn read_record(&mut self, format: SeqFormat, buf: &mut Vec<u8>) -> Result<bool> {
        match format {
            SeqFormat::Raw => {
                while self.next_line()? {
                    if !self.line_is_blank() {
                        buf.extend_from_slice(&self.line);
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            SeqFormat::Fastq => {
                // skip blank lines between records
                loop {
                    if !self.next_line()? {
                        return Ok(false);
                    }
                    if !self.line_is_blank() {
                        break;
                    }
                }
                buf.extend_from_slice(&self.line);
                for _ in 0..3 {
                    if !self.next_line()? {
                        // truncated record: pad so line positions stay aligned
                        buf.push(b'\n');
                        continue;
                    }
                    buf.extend_from_slice(&self.line);
                }
                Ok(true)
            }
            SeqFormat::Fasta => {
                let mut started = false;
                if !self.pending.is_empty() {
                    buf.append(&mut self.pending);
                    started = true;
                }
                while self.next_line()? {
                    if self.line.first() == Some(&b'>') && started {
                        std::mem::swap(&mut self.pending, &mut self.line);
                        return Ok(true);
                    }
                    if self.line_is_blank() {
                        continue;
                    }
                    buf.extend_from_slice(&self.line);
                    started = true;
                }
                Ok(started)
            }
        }
    }
}

/// A sequence file shared by several worker threads.
///
/// Every call to [`SeqFile::read_chunk`] takes the internal lock, so workers
/// can share one handle through `&SeqFile`. Dropping the handle closes it.
pub struct SeqFile {
    path: Option<PathBuf>,
    format: SeqFormat,
    state: Mutex<ReaderState>,
}

impl SeqFile {
    /// Open `path` as `format`.
    pub fn open(path: &Path, format: SeqFormat) -> Result<Self> {
        let reader = open_reader(path)?;
        let mut file = Self::from_reader(reader, format);
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Open `path`, detecting its format first.
    pub fn open_detected(path: &Path) -> Result<Self> {
        let format = detect_format(path)?;
        debug!(?path, %format, "detected sequence format");
        Self::open(path, format)
    }

    /// Wrap an already opened reader, e.g. in-memory data.
    pub fn from_reader(reader: Box<dyn BufRead + Send>, format: SeqFormat) -> Self {
        SeqFile {
            path: None,
            format,
            state: Mutex::new(ReaderState {
                reader,
                pending: Vec::new(),
                line: Vec::new(),
                eof: false,
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl ChunkSource for SeqFile {
    fn format(&self) -> SeqFormat {
        self.format
    }

    /// Fill `buf` with whole records until it holds at least `max_len` bytes
    /// or the file ends. A single record longer than `max_len` is returned
    /// whole, so no k-mer window is ever split between two chunks.
    fn read_chunk(&self, buf: &mut Vec<u8>, max_len: usize) -> Result<usize> {
        buf.clear();
        let mut state = self.state.lock();
        while buf.len() < max_len {
            if !state.read_record(self.format, buf)? {
                break;
            }
        }
        Ok(buf.len())
    }
}

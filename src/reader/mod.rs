//! Line source for the bulk and verify stages.
//!
//! Reads newline-delimited records from a (possibly compressed) file with a
//! hard cap on line length. Over-long lines are an error, never truncated:
//! exported rows carry escaped string data and silently cutting one would
//! corrupt the dump.

use crate::error::{DbExportError, Result};
use crate::progress::ProgressReader;
use memchr::memchr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Default maximum size of a single line, in bytes.
pub const DEFAULT_MAX_LINE_BYTES: usize = 100 * 1024;

pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the matching decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Sequential, non-restartable reader of text lines.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    line_buffer: Vec<u8>,
    max_line_bytes: usize,
    lines_read: u64,
}

impl LineReader<Box<dyn Read>> {
    /// Open `path`, decompressing by extension.
    pub fn open(path: &Path, max_line_bytes: usize) -> Result<Self> {
        Self::open_with_progress(path, max_line_bytes, None)
    }

    /// Open `path` and report raw file bytes consumed to `progress`.
    pub fn open_with_progress(
        path: &Path,
        max_line_bytes: usize,
        progress: Option<Box<dyn Fn(u64)>>,
    ) -> Result<Self> {
        let open_error = |source| DbExportError::InputOpen {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_error)?;
        let raw: Box<dyn Read> = match progress {
            Some(cb) => Box::new(ProgressReader::new(file, move |bytes| cb(bytes))),
            None => Box::new(file),
        };
        let compression = Compression::from_path(path);
        tracing::debug!(path = %path.display(), %compression, "opening input");
        let reader = compression.wrap_reader(raw).map_err(open_error)?;

        Ok(Self::new(reader, max_line_bytes))
    }
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, reader),
            line_buffer: Vec::with_capacity(4 * 1024),
            max_line_bytes,
            lines_read: 0,
        }
    }

    /// Read the next line without its terminator (`\n` or `\r\n`).
    ///
    /// Returns `Ok(None)` at end of input. The last line may lack a newline.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        self.line_buffer.clear();
        let line_number = self.lines_read + 1;

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                if self.line_buffer.is_empty() {
                    return Ok(None);
                }
                break;
            }

            if let Some(pos) = memchr(b'\n', buf) {
                self.line_buffer.extend_from_slice(&buf[..pos]);
                self.reader.consume(pos + 1);
                break;
            }

            let len = buf.len();
            self.line_buffer.extend_from_slice(buf);
            self.reader.consume(len);

            // one extra byte of slack for a trailing '\r'
            if self.line_buffer.len() > self.max_line_bytes + 1 {
                return Err(DbExportError::LineTooLong {
                    line: line_number,
                    limit: self.max_line_bytes,
                });
            }
        }

        if self.line_buffer.last() == Some(&b'\r') {
            self.line_buffer.pop();
        }
        if self.line_buffer.len() > self.max_line_bytes {
            return Err(DbExportError::LineTooLong {
                line: line_number,
                limit: self.max_line_bytes,
            });
        }

        let line = std::str::from_utf8(&self.line_buffer)
            .map_err(|_| DbExportError::InvalidEncoding { line: line_number })?
            .to_owned();
        self.lines_read = line_number;

        Ok(Some(line))
    }
}

//! Byte-based progress tracking for the reading stages.
//!
//! `ProgressReader` sits between the raw file and any decompressor, so the
//! reported position always refers to bytes of the file on disk and can be
//! compared against its metadata length.

use std::io::Read;

/// A reader wrapper that reports the running byte total to a callback.
pub struct ProgressReader<R: Read> {
    reader: R,
    callback: Box<dyn Fn(u64)>,
    bytes_read: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new<F>(reader: R, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            reader,
            callback: Box::new(callback),
            bytes_read: 0,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.bytes_read += n as u64;
            (self.callback)(self.bytes_read);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_reports_running_total() {
        let seen = Rc::new(Cell::new(0u64));
        let seen_clone = seen.clone();
        let data: &[u8] = b"INSERT INTO t (a) VALUES (1);\n";
        let mut reader = ProgressReader::new(data, move |n| seen_clone.set(n));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, data);
        assert_eq!(seen.get(), data.len() as u64);
    }
}

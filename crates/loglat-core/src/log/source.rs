use super::LogFileRef;
use crate::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Streams lines out of a plain or gzip-compressed log.
///
/// Decompression happens here so the parser only ever sees text. The file
/// handle and decoder are owned by the source and released when it is dropped.
pub struct LineSource {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    lines_read: u64,
}

impl LineSource {
    /// Open the file referenced by a located log
    pub fn open(log: &LogFileRef) -> Result<Self> {
        Self::open_path(&log.path, log.is_compressed)
    }

    pub fn open_path(path: &Path, is_compressed: bool) -> Result<Self> {
        tracing::debug!(
            "Opening log file: {} (compressed: {})",
            path.display(),
            is_compressed
        );

        let file = File::open(path).map_err(|source| Error::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_reader(file, is_compressed, path.to_path_buf()))
    }

    /// Wrap any reader; `path` is only used in error messages
    pub fn from_reader<R: Read + 'static>(reader: R, is_compressed: bool, path: PathBuf) -> Self {
        let reader: Box<dyn BufRead> = if is_compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            Box::new(BufReader::new(reader))
        };

        Self {
            path,
            reader,
            buf: Vec::new(),
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Read the next line without its terminator. Invalid UTF-8 is replaced, not fatal.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| Error::UnreadableFile {
                path: self.path.clone(),
                source,
            })?;

        if read == 0 {
            return Ok(None);
        }
        self.lines_read += 1;

        let mut line = self.buf.as_slice();
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }
}

impl Iterator for LineSource {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

use crate::core::error::{Error, Result};
use crate::core::io::{self, InputKind};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// The four raw lines of one record, line terminators and trailing
/// whitespace removed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawRecord {
    /// 1-based line number of the header within its file.
    pub line: u64,
    pub header: Vec<u8>,
    pub seq: Vec<u8>,
    pub sep: Vec<u8>,
    pub qual: Vec<u8>,
}

/// Streams 4-line groups out of any buffered source.
///
/// Input ends at EOF or at a blank line found where a header is expected;
/// only blank lines may follow the latter. A final group with 1-3 lines is
/// reported as `MalformedFileLength`. Once exhausted or failed the reader
/// yields nothing more.
pub struct RecordReader<R> {
    inner: R,
    path: PathBuf,
    compressed: bool,
    line: u64,
    done: bool,
    blank_line: Option<u64>,
    scratch: Vec<u8>,
}

impl RecordReader<Box<dyn BufRead + Send>> {
    pub fn open(path: &Path, decompress_threads: usize) -> Result<Self> {
        let kind = io::detect_input_kind(path)?;
        let inner = io::open_reader(path, kind, decompress_threads)?;
        Ok(RecordReader::new(inner, path).compressed(kind == InputKind::Gzip))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            compressed: false,
            line: 0,
            done: false,
            blank_line: None,
            scratch: Vec::new(),
        }
    }

    /// Marks the source as decompressed so read errors surface as
    /// `DecompressionFailure`.
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Numbers lines as if `lines` lines preceded this source.
    pub fn lines_before(mut self, lines: u64) -> Self {
        self.line = lines;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line number of the blank line that ended the stream, if any.
    pub fn blank_line(&self) -> Option<u64> {
        self.blank_line
    }

    /// Fills `rec` with the next group, reusing its buffers. `Ok(false)` at
    /// end of stream.
    pub fn read_next(&mut self, rec: &mut RawRecord) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let res = self.fill(rec);
        if !matches!(res, Ok(true)) {
            self.done = true;
        }
        res
    }

    fn fill(&mut self, rec: &mut RawRecord) -> Result<bool> {
        if !self.read_line(&mut rec.header)? {
            return Ok(false);
        }
        if rec.header.is_empty() {
            self.blank_line = Some(self.line);
            self.expect_only_blank_lines()?;
            return Ok(false);
        }
        rec.line = self.line;
        for (filled, field) in [&mut rec.seq, &mut rec.sep, &mut rec.qual]
            .into_iter()
            .enumerate()
        {
            if !self.read_line(field)? {
                return Err(Error::MalformedFileLength {
                    path: self.path.clone(),
                    trailing: filled + 1,
                    line: rec.line,
                });
            }
        }
        Ok(true)
    }

    fn expect_only_blank_lines(&mut self) -> Result<()> {
        let mut line = std::mem::take(&mut self.scratch);
        let res = loop {
            match self.read_line(&mut line) {
                Ok(false) => break Ok(()),
                Ok(true) if line.is_empty() => continue,
                Ok(true) => {
                    break Err(Error::TrailingData {
                        path: self.path.clone(),
                        line: self.line,
                    });
                }
                Err(e) => break Err(e),
            }
        };
        self.scratch = line;
        res
    }

    fn read_line(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        out.clear();
        let n = self
            .inner
            .read_until(b'\n', out)
            .map_err(|source| self.read_error(source))?;
        if n == 0 {
            return Ok(false);
        }
        self.line += 1;
        while out.last().is_some_and(|b| b.is_ascii_whitespace()) {
            out.pop();
        }
        Ok(true)
    }

    fn read_error(&self, source: std::io::Error) -> Error {
        if self.compressed {
            Error::DecompressionFailure {
                path: self.path.clone(),
                source,
            }
        } else {
            io::io_error(&self.path, source)
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut rec = RawRecord::default();
        match self.read_next(&mut rec) {
            Ok(true) => Some(Ok(rec)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

use crate::core::error::{Error, Result};
use flate2::read::MultiGzDecoder;
use gzp::deflate::{Bgzf, Mgzip};
use gzp::par::decompress::ParDecompressBuilder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// Read buffer for every input stream.
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| io_error(path, e))?;
        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Plain,
    Gzip,
}

/// A byte range of a plain file holding whole records only.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    /// Number of lines before `start`.
    pub lines_before: u64,
    pub last: bool,
}

/// Splits a mapped file into ranges of roughly `chunk_size` bytes. Every
/// range ends after a line count that is a multiple of 4, so no record is
/// ever cut in two.
pub struct RecordChunker {
    data: Arc<MmapSource>,
    pos: usize,
    lines: u64,
    chunk_size: usize,
    index: usize,
}

impl RecordChunker {
    pub fn new(data: Arc<MmapSource>, chunk_size: usize) -> Self {
        Self {
            data,
            pos: 0,
            lines: 0,
            chunk_size: chunk_size.max(1),
            index: 0,
        }
    }

    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let bytes = self.data.bytes();
        let len = bytes.len();
        if self.pos >= len {
            return None;
        }
        let start = self.pos;
        let target = start.saturating_add(self.chunk_size).min(len);
        let mut end = len;
        let mut lines = 0u64;
        for nl in memchr::memchr_iter(b'\n', &bytes[start..]) {
            lines += 1;
            let after = start + nl + 1;
            if lines % 4 == 0 && after >= target {
                end = after;
                break;
            }
        }
        let chunk = Chunk {
            index: self.index,
            start,
            end,
            lines_before: self.lines,
            last: end == len,
        };
        self.pos = end;
        self.lines += lines;
        self.index += 1;
        Some(chunk)
    }
}

impl Iterator for RecordChunker {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if ext == "gz" {
            return Ok(InputKind::Gzip);
        }
    }
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut magic = [0u8; 2];
    let n = read_prefix(&mut file, &mut magic).map_err(|e| io_error(path, e))?;
    if n == 2 && magic == [0x1f, 0x8b] {
        Ok(InputKind::Gzip)
    } else {
        Ok(InputKind::Plain)
    }
}

#[derive(Clone, Copy, Debug)]
enum GzipVariant {
    Standard,
    Mgzip,
    Bgzf,
}

fn detect_gzip_variant(path: &Path) -> Result<GzipVariant> {
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut header = [0u8; 20];
    let n = read_prefix(&mut file, &mut header).map_err(|e| io_error(path, e))?;
    if n < 14 {
        return Ok(GzipVariant::Standard);
    }
    if header[0] != 0x1f || header[1] != 0x8b {
        return Ok(GzipVariant::Standard);
    }
    if header[3] & 4 == 0 {
        return Ok(GzipVariant::Standard);
    }
    if header[12] == b'B' && header[13] == b'C' {
        return Ok(GzipVariant::Bgzf);
    }
    if header[12] == b'I' && header[13] == b'G' {
        return Ok(GzipVariant::Mgzip);
    }
    Ok(GzipVariant::Standard)
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

pub fn open_gzip_reader(path: &Path, threads: usize) -> Result<Box<dyn Read + Send>> {
    let variant = detect_gzip_variant(path)?;
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let reader: Box<dyn Read + Send> = match variant {
        GzipVariant::Bgzf if threads > 1 => Box::new(
            ParDecompressBuilder::<Bgzf>::new()
                .num_threads(threads)
                .map_err(|e| decompression_error(path, e))?
                .from_reader(reader),
        ),
        GzipVariant::Mgzip if threads > 1 => Box::new(
            ParDecompressBuilder::<Mgzip>::new()
                .num_threads(threads)
                .map_err(|e| decompression_error(path, e))?
                .from_reader(reader),
        ),
        _ => Box::new(MultiGzDecoder::new(reader)),
    };
    Ok(reader)
}

/// Buffered line source for `path`, decompressing on the fly when needed.
pub fn open_reader(
    path: &Path,
    kind: InputKind,
    decompress_threads: usize,
) -> Result<Box<dyn BufRead + Send>> {
    match kind {
        InputKind::Plain => {
            let file = File::open(path).map_err(|e| io_error(path, e))?;
            Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
        }
        InputKind::Gzip => {
            let decoder = open_gzip_reader(path, decompress_threads)?;
            Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, decoder)))
        }
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn decompression_error(path: &Path, err: gzp::GzpError) -> Error {
    Error::DecompressionFailure {
        path: path.to_path_buf(),
        source: std::io::Error::other(err.to_string()),
    }
}

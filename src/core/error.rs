use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the ingestion engine can report. All of them abort the run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no FASTQ files found under {}", root.display())]
    NoInputFiles { root: PathBuf },

    #[error("unsupported file extension: {}", path.display())]
    UnsupportedExtension { path: PathBuf },

    #[error("failed to scan {}", root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gzip decompression failed for {}", path.display())]
    DecompressionFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{} has {trailing} unpaired line(s) starting at line {line}; line count is not a multiple of 4",
        path.display()
    )]
    MalformedFileLength {
        path: PathBuf,
        trailing: usize,
        line: u64,
    },

    #[error("unexpected content at line {line} of {} after a blank line", path.display())]
    TrailingData { path: PathBuf, line: u64 },

    #[error("malformed header at line {line}: {reason}")]
    MalformedHeader { line: u64, reason: &'static str },

    #[error("empty {field} line in record at line {line}")]
    EmptyRecord { line: u64, field: &'static str },

    #[error(
        "quality length {qual_len} does not match sequence length {seq_len} in record at line {line}"
    )]
    QualityLengthMismatch {
        line: u64,
        seq_len: usize,
        qual_len: usize,
    },

    #[error("cannot parse timestamp {text:?} in record at line {line}")]
    TimestampParse {
        line: u64,
        text: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("duplicate read id {read_id} in {} and {}", first.display(), second.display())]
    DuplicateReadId {
        read_id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("worker failed on {}", path.display())]
    WorkerFailure {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("worker thread panicked")]
    WorkerPanic,
}

impl Error {
    /// Strips any `WorkerFailure` wrapping.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WorkerFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn worker(path: PathBuf, source: Error) -> Self {
        Error::WorkerFailure {
            path,
            source: Box::new(source),
        }
    }
}

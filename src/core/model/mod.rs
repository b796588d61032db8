use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Flag {
    Pass,
    Fail,
}

impl Flag {
    pub fn as_str_lower(self) -> &'static str {
        match self {
            Flag::Pass => "pass",
            Flag::Fail => "fail",
        }
    }

    /// Case-sensitive substring match on the whole path; "fail" wins over "pass".
    /// `None` when the path mentions neither.
    pub fn from_path(path: &Path) -> Option<Flag> {
        let text = path.to_string_lossy();
        if text.contains("fail") {
            Some(Flag::Fail)
        } else if text.contains("pass") {
            Some(Flag::Pass)
        } else {
            None
        }
    }
}

/// One decoded read.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRecord {
    pub read_id: String,
    pub sample_name: Arc<str>,
    pub flag: Flag,
    pub length: usize,
    /// Mean Phred+33 score, not rounded.
    pub mean_quality: f64,
    pub gc_percent: u8,
    pub timestamp: DateTime<Utc>,
    pub source: Arc<Path>,
}

/// Values shared by every record of one input file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileContext {
    pub path: Arc<Path>,
    pub sample_name: Arc<str>,
    pub flag: Flag,
}

impl FileContext {
    pub fn from_path(path: &Path) -> Self {
        let sample_name = sample_name_from_path(path);
        let flag = Flag::from_path(path).unwrap_or_else(|| {
            tracing::warn!(
                sample = %sample_name,
                path = %path.display(),
                "path contains neither \"pass\" nor \"fail\"; assuming pass reads"
            );
            Flag::Pass
        });
        Self {
            path: Arc::from(path),
            sample_name: Arc::from(sample_name),
            flag,
        }
    }
}

/// Base name up to the first '.', then up to the first '_'.
pub fn sample_name_from_path(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let stem = base.split('.').next().unwrap_or_default();
    stem.split('_').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn flag_follows_path_substrings() {
        assert_eq!(
            Flag::from_path(Path::new("/run/fail/barcode01_x.fastq")),
            Some(Flag::Fail)
        );
        assert_eq!(
            Flag::from_path(Path::new("/run/pass/barcode01_x.fastq")),
            Some(Flag::Pass)
        );
        assert_eq!(Flag::from_path(Path::new("/run/barcode01_x.fastq")), None);
    }

    #[test]
    fn fail_takes_precedence_and_is_case_sensitive() {
        assert_eq!(
            Flag::from_path(Path::new("/pass/sub/fail/a.fastq")),
            Some(Flag::Fail)
        );
        assert_eq!(Flag::from_path(Path::new("/run/FAIL/a.fastq")), None);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn context_with_log(path: &str) -> (FileContext, String) {
        let out = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(out.clone())
            .with_ansi(false)
            .finish();
        let ctx = tracing::subscriber::with_default(subscriber, || {
            FileContext::from_path(Path::new(path))
        });
        let log = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        (ctx, log)
    }

    #[test]
    fn context_defaults_to_pass_with_warning() {
        let (ctx, log) = context_with_log("/data/run1/barcode07_0.fastq.gz");
        assert_eq!(ctx.flag, Flag::Pass);
        assert_eq!(&*ctx.sample_name, "barcode07");
        assert!(log.contains("WARN"), "{log}");
        assert!(log.contains("neither"), "{log}");
        assert!(log.contains("/data/run1/barcode07_0.fastq.gz"), "{log}");
    }

    #[test]
    fn flagged_context_logs_nothing() {
        let (ctx, log) = context_with_log("/data/run1/fail/barcode07_0.fastq.gz");
        assert_eq!(ctx.flag, Flag::Fail);
        assert!(log.is_empty(), "{log}");
    }

    #[test]
    fn sample_name_strips_extension_and_suffix() {
        assert_eq!(
            sample_name_from_path(Path::new("/x/pass/barcode01_abc_0.fastq")),
            "barcode01"
        );
        assert_eq!(sample_name_from_path(Path::new("/x/sampleA.fq.gz")), "sampleA");
        assert_eq!(sample_name_from_path(Path::new("reads.fastq")), "reads");
    }
}

use crate::core::error::{Error, Result};
use crate::core::io::io_error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const FASTQ_EXTENSIONS: [&str; 4] = [".fastq", ".fq", ".fastq.gz", ".fq.gz"];

pub fn is_fastq_name(name: &str) -> bool {
    FASTQ_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// All FASTQ files under `root`, absolute and sorted. A file given as `root`
/// is returned on its own if its extension is recognized.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let root = std::path::absolute(root).map_err(|e| io_error(root, e))?;
    let meta = std::fs::metadata(&root).map_err(|e| io_error(&root, e))?;
    if meta.is_file() {
        let name = root
            .file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        if !is_fastq_name(&name) {
            return Err(Error::UnsupportedExtension { path: root });
        }
        return Ok(vec![root]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = entry.map_err(|source| Error::Discovery {
            root: root.clone(),
            source,
        })?;
        if entry.file_type().is_file() && is_fastq_name(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    if files.is_empty() {
        return Err(Error::NoInputFiles { root });
    }
    files.sort();
    tracing::debug!(root = %root.display(), files = files.len(), "discovered input files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_fastq_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("pass/barcode01/a_0.fastq"));
        touch(&root.join("pass/barcode02/b_0.fastq.gz"));
        touch(&root.join("fail/c_0.fq"));
        touch(&root.join("fail/d_0.fq.gz"));
        touch(&root.join("sequencing_summary.txt"));
        touch(&root.join("pass/notes.fastq.bak"));

        let files = discover(root).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|p| p.is_absolute()));
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
        assert!(files.iter().any(|p| p.ends_with("fail/d_0.fq.gz")));
    }

    #[test]
    fn empty_tree_is_no_input_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sub/readme.md"));
        let err = discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoInputFiles { .. }));
    }

    #[test]
    fn single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("x_1.fastq");
        touch(&fq);
        assert_eq!(discover(&fq).unwrap(), vec![fq]);

        let txt = dir.path().join("x_1.txt");
        touch(&txt);
        assert!(matches!(
            discover(&txt).unwrap_err(),
            Error::UnsupportedExtension { .. }
        ));
    }

    #[test]
    fn missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}

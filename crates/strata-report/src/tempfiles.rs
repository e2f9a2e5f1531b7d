//! Temp-file facility backing disk spill.
//!
//! Callers that process large documents hand the report a manager rooted at
//! a directory they control; reports without one never touch the disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Creates uniquely named temp files under a fixed directory.
#[derive(Debug, Clone)]
pub struct TempFileManager {
    dir: PathBuf,
}

impl TempFileManager {
    /// Opens a manager rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory all files are created under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a new temp file named `<prefix>********<suffix>`. The file
    /// is deleted when the returned handle drops.
    pub fn create(&self, prefix: &str, suffix: &str) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn files_are_created_under_the_managed_dir() {
        let root = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(root.path().join("spill")).unwrap();
        let file = manager.create("sortinp", ".json").unwrap();
        assert!(file.path().starts_with(manager.dir()));
        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sortinp"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn dropping_the_handle_deletes_the_file() {
        let root = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(root.path()).unwrap();
        let file = manager.create("x", ".tmp").unwrap();
        let path = file.path().to_path_buf();
        file.as_file().write_all(b"abc").unwrap();
        let mut reopened = file.reopen().unwrap();
        reopened.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = String::new();
        reopened.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "abc");
        drop(file);
        assert!(!path.exists());
    }
}

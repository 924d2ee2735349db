//! I/O boundary traits
//!
//! Services read record files through [`FileSystem`] so tests can hand them
//! in-memory files.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Read access to record files.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Whether `path` names a readable regular file.
    fn is_file(&self, path: &Path) -> bool;
}

/// The process's filesystem.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Files held in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), content.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_memory_file_when_reading_then_returns_content() {
        let fs = MemoryFileSystem::new().with_file("/data/muts.tsv", "Sample\tGene\n");

        assert!(fs.is_file(Path::new("/data/muts.tsv")));
        assert_eq!(fs.read_to_string(Path::new("/data/muts.tsv")).unwrap(), "Sample\tGene\n");
        assert!(!fs.is_file(Path::new("/data/other.tsv")));
        assert_eq!(
            fs.read_to_string(Path::new("/data/other.tsv")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}

//! In-memory package

use std::collections::HashMap;

use super::tree::PathTree;
use super::{normalize, Archive, ArchiveError, DirEntry, EntryKind};

/// A package held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    tree: PathTree,
    files: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, creating its parent directories
    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.tree.insert_file(path);
        self.files.insert(normalize(path).to_string(), data);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data.into());
        self
    }

    pub fn insert_dir(&mut self, path: &str) {
        self.tree.insert_dir(path);
    }
}

impl Archive for MemoryArchive {
    fn entry_kind(&mut self, path: &str) -> Result<EntryKind, ArchiveError> {
        Ok(self.tree.kind(path))
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        self.tree.read_dir(path)
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        match self.files.get(normalize(path)) {
            Some(data) => Ok(data.clone()),
            None if self.tree.kind(path) == EntryKind::Directory => {
                Err(ArchiveError::NotAFile(path.to_string()))
            }
            None => Err(ArchiveError::EntryNotFound(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_back() {
        let mut archive = MemoryArchive::new().with_file("/def/world/a.sii", "data");
        assert_eq!(archive.read_file("def/world/a.sii").unwrap(), b"data");
        assert!(matches!(archive.read_file("def/world"), Err(ArchiveError::NotAFile(_))));
        assert!(matches!(archive.read_file("def/x"), Err(ArchiveError::EntryNotFound(_))));
    }
}

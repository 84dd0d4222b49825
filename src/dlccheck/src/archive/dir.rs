//! Unpacked package directory on disk

use std::fs;
use std::path::{Path, PathBuf};

use super::{join, normalize, Archive, ArchiveError, DirEntry, EntryKind};

/// Reader for a package extracted to a directory
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ArchiveError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ArchiveError::NotADirectory(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ArchiveError> {
        let path = normalize(path);
        // keep lookups inside the package root
        if path.split('/').any(|part| part == "..") {
            return Err(ArchiveError::EntryNotFound(path.to_string()));
        }
        Ok(path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part)))
    }
}

impl Archive for DirArchive {
    fn entry_kind(&mut self, path: &str) -> Result<EntryKind, ArchiveError> {
        let full = self.resolve(path)?;
        Ok(if full.is_dir() {
            EntryKind::Directory
        } else if full.is_file() {
            EntryKind::File
        } else {
            EntryKind::None
        })
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(ArchiveError::EntryNotFound(path.to_string()));
        }
        if !full.is_dir() {
            return Err(ArchiveError::NotADirectory(path.to_string()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let child = join(path, &name);
            if entry.file_type()?.is_dir() {
                entries.push(DirEntry::directory(child));
            } else {
                entries.push(DirEntry::file(child));
            }
        }

        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(ArchiveError::NotAFile(path.to_string()));
        }
        if !full.exists() {
            return Err(ArchiveError::EntryNotFound(path.to_string()));
        }
        Ok(fs::read(&full)?)
    }
}

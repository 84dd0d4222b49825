//! ZIP-format packages
//!
//! Mods are commonly shipped as plain ZIP files renamed to `.scs`. Member
//! names are indexed once on open; directories are inferred from them.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use super::tree::PathTree;
use super::{normalize, Archive, ArchiveError, DirEntry, EntryKind};

/// Reader for a ZIP-format package
pub struct ZipFs<R = BufReader<File>> {
    zip: ZipArchive<R>,
    tree: PathTree,
    /// Normalized path -> member name as stored
    members: std::collections::HashMap<String, String>,
}

impl ZipFs<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipFs<R> {
    pub fn from_reader(reader: R) -> Result<Self, ArchiveError> {
        let mut zip = ZipArchive::new(reader)?;
        let mut tree = PathTree::default();
        let mut members = std::collections::HashMap::new();

        for i in 0..zip.len() {
            let member = zip.by_index(i)?;
            let name = member.name().to_string();
            if member.is_dir() {
                tree.insert_dir(&name);
            } else {
                tree.insert_file(&name);
                members.insert(normalize(&name).to_string(), name);
            }
        }

        Ok(Self { zip, tree, members })
    }
}

impl<R: Read + Seek> Archive for ZipFs<R> {
    fn entry_kind(&mut self, path: &str) -> Result<EntryKind, ArchiveError> {
        Ok(self.tree.kind(path))
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        self.tree.read_dir(path)
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let Some(name) = self.members.get(normalize(path)) else {
            return Err(match self.tree.kind(path) {
                EntryKind::Directory => ArchiveError::NotAFile(path.to_string()),
                _ => ArchiveError::EntryNotFound(path.to_string()),
            });
        };

        let mut member = self.zip.by_name(name)?;
        let mut data = Vec::with_capacity(member.size() as usize);
        member.read_to_end(&mut data)?;
        Ok(data)
    }
}

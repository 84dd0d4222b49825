//! Readers for SCS content packages
//!
//! A package is a tree of directories and files addressed by `/`-separated
//! paths. Paths are accepted with or without a leading slash; `""` and `"/"`
//! both name the root.
//!
//! Supported containers:
//! - HashFS v1 (`SCS#` magic), the format of shipped DLC packages
//! - ZIP, common for mods distributed as `.scs`
//! - Unpacked directories on disk
//! - In-memory packages

mod city;
mod dir;
mod hashfs;
mod memory;
mod tree;
mod zipfs;

pub use city::city_hash64;
pub use dir::DirArchive;
pub use hashfs::{HashFs, HASHFS_MAGIC};
pub use memory::MemoryArchive;
pub use zipfs::ZipFs;

#[cfg(test)]
pub(crate) use hashfs::tests::build as build_hashfs_image;

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Errors from reading a package
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unrecognized package format (magic {0:02x?})")]
    UnknownFormat([u8; 4]),

    #[error("Unsupported HashFS version {0}")]
    UnsupportedVersion(u16),

    #[error("Unsupported HashFS hash method {0:?}")]
    UnsupportedHashMethod([u8; 4]),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Entry is encrypted: {0}")]
    Encrypted(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Corrupt {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// What a path inside a package points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    None,
    File,
    Directory,
}

/// A child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path inside the package, without leading slash
    pub path: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Lowercased extension of a file entry, without the dot
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next()?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// Random-access view of one content package
pub trait Archive {
    fn entry_kind(&mut self, path: &str) -> Result<EntryKind, ArchiveError>;

    /// Immediate children of a directory
    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>, ArchiveError>;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Children of a directory, and with `recursive` all their descendants
    ///
    /// Walks with an explicit stack so nesting depth is bounded only by
    /// memory. Entries come out in listing order, parents before children.
    fn list_directory(
        &mut self,
        path: &str,
        recursive: bool,
    ) -> Result<Vec<DirEntry>, ArchiveError> {
        let mut listed = Vec::new();
        let mut pending = vec![normalize(path).to_string()];

        while let Some(dir) = pending.pop() {
            let entries = self.read_dir(&dir)?;
            if recursive {
                // reversed so the stack pops subdirectories in listing order
                for entry in entries.iter().rev() {
                    if entry.kind == EntryKind::Directory {
                        pending.push(entry.path.clone());
                    }
                }
            }
            listed.extend(entries);
        }

        Ok(listed)
    }
}

impl<A: Archive + ?Sized> Archive for Box<A> {
    fn entry_kind(&mut self, path: &str) -> Result<EntryKind, ArchiveError> {
        (**self).entry_kind(path)
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        (**self).read_dir(path)
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        (**self).read_file(path)
    }
}

/// Strip leading and trailing slashes
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Join a directory and a child name into a package path
pub fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Open a package, picking the reader from its magic bytes
///
/// Directories open as [`DirArchive`].
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn Archive>, ArchiveError> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(Box::new(DirArchive::open(path)?));
    }

    let mut magic = [0u8; 4];
    File::open(path)?.read_exact(&mut magic)?;

    match &magic {
        m if *m == HASHFS_MAGIC => Ok(Box::new(HashFs::open(path)?)),
        // PK\x03\x04, or PK\x05\x06 for an empty archive
        [0x50, 0x4B, _, _] => Ok(Box::new(ZipFs::open(path)?)),
        _ => Err(ArchiveError::UnknownFormat(magic)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_normalize_and_join() {
        assert_eq!(normalize("/def/world/"), "def/world");
        assert_eq!(normalize("/"), "");
        assert_eq!(join("/def/", "city"), "def/city");
        assert_eq!(join("", "def"), "def");
    }

    #[test]
    fn test_entry_extension() {
        assert_eq!(DirEntry::file("def/world/model.sii").extension().as_deref(), Some("sii"));
        assert_eq!(DirEntry::file("def/a.b/README").extension(), None);
        assert_eq!(DirEntry::file("def/x.SUI").extension().as_deref(), Some("sui"));
    }

    #[test]
    fn test_list_directory_recursive_order() {
        let mut archive = MemoryArchive::new();
        archive.insert("def/sign/a.sii", b"".to_vec());
        archive.insert("def/sign/sub/b.sii", b"".to_vec());
        archive.insert("def/sign/sub/deeper/c.sui", b"".to_vec());
        archive.insert("def/sign/z.sii", b"".to_vec());

        let flat: Vec<String> = archive
            .list_directory("/def/sign", false)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(flat, ["def/sign/a.sii", "def/sign/sub", "def/sign/z.sii"]);

        let deep: Vec<String> = archive
            .list_directory("/def/sign", true)
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == EntryKind::File)
            .map(|e| e.path)
            .collect();
        assert_eq!(
            deep,
            [
                "def/sign/a.sii",
                "def/sign/z.sii",
                "def/sign/sub/b.sii",
                "def/sign/sub/deeper/c.sui",
            ]
        );
    }

    #[test]
    fn test_list_directory_deep_nesting() {
        let mut archive = MemoryArchive::new();
        let deep = (0..500).map(|i| format!("d{}", i)).collect::<Vec<_>>().join("/");
        archive.insert(&format!("{}/leaf.sii", deep), Vec::new());

        let entries = archive.list_directory("", true).unwrap();
        assert!(entries.iter().any(|e| e.path.ends_with("leaf.sii")));
    }

    #[test]
    fn test_open_unknown_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"JUNKJUNK").unwrap();
        let err = open(file.path()).err().unwrap();
        assert!(matches!(err, ArchiveError::UnknownFormat(m) if &m == b"JUNK"));
    }

    #[test]
    fn test_open_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("def/world")).unwrap();
        let mut archive = open(dir.path()).unwrap();
        assert_eq!(archive.entry_kind("/def/world").unwrap(), EntryKind::Directory);
    }
}

//! HashFS v1 package reader
//!
//! # Layout
//!
//! Header (20 bytes, little-endian):
//! - Bytes 0-3: `SCS#` magic
//! - Bytes 4-5: Version (1)
//! - Bytes 6-7: Path salt
//! - Bytes 8-11: Hash method (`CITY`)
//! - Bytes 12-15: Entry count
//! - Bytes 16-19: Offset of the entry table
//!
//! Entry table: one 32-byte record per entry (path hash, data offset, flags,
//! CRC, size, stored size). Paths are never stored; an entry is found by
//! hashing its path, prefixed with the decimal salt when the salt is non-zero.
//!
//! Directory entries hold a listing of their children, one name per line,
//! with sub-directories marked by a leading `*`.

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::{city_hash64, join, normalize, Archive, ArchiveError, DirEntry, EntryKind};

/// Magic bytes at the start of every HashFS package
pub const HASHFS_MAGIC: [u8; 4] = *b"SCS#";

const SUPPORTED_VERSION: u16 = 1;
const HASH_METHOD_CITY: [u8; 4] = *b"CITY";

const FLAG_DIRECTORY: u32 = 0x1;
const FLAG_COMPRESSED: u32 = 0x2;
const FLAG_ENCRYPTED: u32 = 0x8;

const RECORD_SIZE: u64 = 32;

#[derive(Debug, Clone, Copy)]
struct Entry {
    offset: u64,
    flags: u32,
    size: u32,
    stored_size: u32,
}

impl Entry {
    fn is_directory(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0
    }
}

/// Reader for a HashFS v1 package
pub struct HashFs<R = BufReader<File>> {
    reader: R,
    salt: u16,
    entries: HashMap<u64, Entry>,
}

impl HashFs<BufReader<File>> {
    /// Open a package file and read its entry table
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> HashFs<R> {
    pub fn from_reader(mut reader: R) -> Result<Self, ArchiveError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != HASHFS_MAGIC {
            return Err(ArchiveError::UnknownFormat(magic));
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != SUPPORTED_VERSION {
            return Err(ArchiveError::UnsupportedVersion(version));
        }
        let salt = reader.read_u16::<LittleEndian>()?;

        let mut hash_method = [0u8; 4];
        reader.read_exact(&mut hash_method)?;
        if hash_method != HASH_METHOD_CITY {
            return Err(ArchiveError::UnsupportedHashMethod(hash_method));
        }

        let entry_count = reader.read_u32::<LittleEndian>()?;
        let table_offset = reader.read_u32::<LittleEndian>()?;

        // header values are untrusted until they fit inside the file
        let file_len = reader.seek(SeekFrom::End(0))?;
        let table_end = table_offset as u64 + entry_count as u64 * RECORD_SIZE;
        if table_end > file_len {
            return Err(ArchiveError::Corrupt {
                path: "entry table".to_string(),
                reason: format!(
                    "{} entries at offset {} end past the file ({} bytes)",
                    entry_count, table_offset, file_len
                ),
            });
        }
        reader.seek(SeekFrom::Start(table_offset as u64))?;

        let mut entries = HashMap::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let hash = reader.read_u64::<LittleEndian>()?;
            let offset = reader.read_u64::<LittleEndian>()?;
            let flags = reader.read_u32::<LittleEndian>()?;
            let _crc = reader.read_u32::<LittleEndian>()?;
            let size = reader.read_u32::<LittleEndian>()?;
            let stored_size = reader.read_u32::<LittleEndian>()?;

            let fits = offset
                .checked_add(stored_size as u64)
                .is_some_and(|end| end <= file_len);
            if !fits {
                return Err(ArchiveError::Corrupt {
                    path: format!("entry {:016x}", hash),
                    reason: format!(
                        "{} bytes at offset {} end past the file ({} bytes)",
                        stored_size, offset, file_len
                    ),
                });
            }
            entries.insert(
                hash,
                Entry {
                    offset,
                    flags,
                    size,
                    stored_size,
                },
            );
        }

        Ok(Self {
            reader,
            salt,
            entries,
        })
    }

    pub fn salt(&self) -> u16 {
        self.salt
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash a package path the way the entry table is keyed
    pub fn hash_path(&self, path: &str) -> u64 {
        hash_path(path, self.salt)
    }

    fn entry(&self, path: &str) -> Option<Entry> {
        self.entries.get(&self.hash_path(path)).copied()
    }

    fn read_entry(&mut self, path: &str, entry: Entry) -> Result<Vec<u8>, ArchiveError> {
        if entry.flags & FLAG_ENCRYPTED != 0 {
            return Err(ArchiveError::Encrypted(path.to_string()));
        }

        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut stored = vec![0u8; entry.stored_size as usize];
        self.reader.read_exact(&mut stored)?;

        if entry.flags & FLAG_COMPRESSED == 0 {
            return Ok(stored);
        }

        // one byte past the declared size is enough to detect a mismatch
        let mut data = Vec::new();
        ZlibDecoder::new(stored.as_slice())
            .take(entry.size as u64 + 1)
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::Corrupt {
                path: path.to_string(),
                reason: format!("zlib: {}", e),
            })?;

        if data.len() != entry.size as usize {
            return Err(ArchiveError::Corrupt {
                path: path.to_string(),
                reason: format!("expected {} bytes, inflated {}", entry.size, data.len()),
            });
        }
        Ok(data)
    }
}

/// Hash a package path with the given salt
pub(crate) fn hash_path(path: &str, salt: u16) -> u64 {
    let path = normalize(path);
    if salt == 0 {
        city_hash64(path.as_bytes())
    } else {
        city_hash64(format!("{}{}", salt, path).as_bytes())
    }
}

impl<R: Read + Seek> Archive for HashFs<R> {
    fn entry_kind(&mut self, path: &str) -> Result<EntryKind, ArchiveError> {
        Ok(match self.entry(path) {
            None => EntryKind::None,
            Some(entry) if entry.is_directory() => EntryKind::Directory,
            Some(_) => EntryKind::File,
        })
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>, ArchiveError> {
        let entry = self
            .entry(path)
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))?;
        if !entry.is_directory() {
            return Err(ArchiveError::NotADirectory(path.to_string()));
        }

        let listing = self.read_entry(path, entry)?;
        let listing = String::from_utf8_lossy(&listing);

        Ok(listing
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(|line| match line.strip_prefix('*') {
                Some(subdir) => DirEntry::directory(join(path, subdir)),
                None => DirEntry::file(join(path, line)),
            })
            .collect())
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry = self
            .entry(path)
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))?;
        if entry.is_directory() {
            return Err(ArchiveError::NotAFile(path.to_string()));
        }
        self.read_entry(path, entry)
    }
}

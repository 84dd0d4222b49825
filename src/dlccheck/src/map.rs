//! Sector-by-sector map scanning
//!
//! A map is a descriptor file (`europe.mbd`) next to a directory of the same
//! base name holding one file per sector. Sectors are decoded one at a time
//! and dropped after extraction, so memory use stays at one sector's items
//! however large the map is.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::InputKind;
use crate::extract::{Extractor, FoundAssets};
use crate::item::MapItem;
use crate::{Error, Result};

/// Errors from decoding a sector
#[derive(thiserror::Error, Debug)]
pub enum SectorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported sector data: {0}")]
    Unsupported(String),

    #[error("no .{expected} sector files, directory holds [{}]", .present.join(", "))]
    NoSectors {
        expected: String,
        /// Extensions of the files that are there
        present: Vec<String>,
    },
}

/// Decodes the items of individual map sectors
pub trait MapReader {
    /// Extension of the sector files this reader understands, without the dot
    fn sector_extension(&self) -> &str;

    /// Decode only the named sector files of the map at `descriptor`
    fn open_restricted(
        &self,
        descriptor: &Path,
        sectors: &[String],
    ) -> std::result::Result<Vec<MapItem>, SectorError>;
}

/// Reads sectors dumped as JSON arrays of tagged [`MapItem`]s
///
/// The binary sector format is decoded by external tooling; this reader
/// consumes its dumps, one `<sector>.json` per sector.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSectorReader;

impl MapReader for JsonSectorReader {
    fn sector_extension(&self) -> &str {
        "json"
    }

    fn open_restricted(
        &self,
        descriptor: &Path,
        sectors: &[String],
    ) -> std::result::Result<Vec<MapItem>, SectorError> {
        let dir = sector_dir(descriptor);
        let mut items = Vec::new();
        for sector in sectors {
            let data = fs::read(dir.join(sector))?;
            let decoded: Vec<MapItem> = serde_json::from_slice(&data)?;
            items.extend(decoded);
        }
        Ok(items)
    }
}

/// Directory holding the sectors of the map at `descriptor`
pub fn sector_dir(descriptor: &Path) -> PathBuf {
    let parent = descriptor.parent().unwrap_or_else(|| Path::new(""));
    let stem = descriptor.file_stem().unwrap_or_default();
    parent.join(stem)
}

/// File names of all sectors with the given extension, sorted
pub fn sector_files(descriptor: &Path, extension: &str) -> Result<Vec<String>> {
    let dir = sector_dir(descriptor);
    if !dir.is_dir() {
        return Err(Error::InputNotFound {
            kind: InputKind::SectorDirectory,
            path: dir,
        });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);

        if matches && entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    files.sort();
    Ok(files)
}

/// Distinct lowercased extensions of the files in `dir`, sorted
fn extensions_in(dir: &Path) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            found.push(ext.to_ascii_lowercase());
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

/// Counters from one map scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub sectors: usize,
    pub items: usize,
}

/// Feed every item of every sector through `extractor` into `found`
pub fn scan_map<M: MapReader + ?Sized>(
    descriptor: &Path,
    reader: &M,
    extractor: &Extractor,
    found: &mut FoundAssets,
) -> Result<ScanStats> {
    let sectors = sector_files(descriptor, reader.sector_extension())?;
    if sectors.is_empty() {
        let dir = sector_dir(descriptor);
        let present = extensions_in(&dir)?;
        return Err(Error::SectorDecode {
            sector: dir,
            source: SectorError::NoSectors {
                expected: reader.sector_extension().to_string(),
                present,
            },
        });
    }
    let mut stats = ScanStats::default();

    for sector in sectors {
        let items = reader
            .open_restricted(descriptor, std::slice::from_ref(&sector))
            .map_err(|source| Error::SectorDecode {
                sector: sector_dir(descriptor).join(&sector),
                source,
            })?;

        let before = found.len();
        for item in &items {
            extractor.extract(item, found);
        }
        debug!(
            "{}: {} items, {} new asset keys",
            sector,
            items.len(),
            found.len() - before
        );

        stats.sectors += 1;
        stats.items += items.len();
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn map_with_sectors(sectors: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let descriptor = dir.path().join("europe.mbd");
        fs::write(&descriptor, b"").unwrap();
        fs::create_dir(dir.path().join("europe")).unwrap();
        for (name, contents) in sectors {
            fs::write(dir.path().join("europe").join(name), contents).unwrap();
        }
        (dir, descriptor)
    }

    #[test]
    fn test_sector_dir() {
        assert_eq!(
            sector_dir(Path::new("/maps/europe.mbd")),
            PathBuf::from("/maps/europe")
        );
        assert_eq!(sector_dir(Path::new("europe.mbd")), PathBuf::from("europe"));
    }

    #[test]
    fn test_sector_files_filtered_and_sorted() {
        let (_dir, descriptor) = map_with_sectors(&[
            ("sec+0001+0000.json", "[]"),
            ("sec-0001+0000.json", "[]"),
            ("sec+0001+0000.base", ""),
            ("notes.txt", ""),
        ]);
        let files = sector_files(&descriptor, "json").unwrap();
        assert_eq!(files, ["sec+0001+0000.json", "sec-0001+0000.json"]);
    }

    #[test]
    fn test_missing_sector_dir() {
        let dir = TempDir::new().unwrap();
        let err = sector_files(&dir.path().join("nowhere.mbd"), "json").unwrap_err();
        assert!(matches!(
            err,
            Error::InputNotFound {
                kind: InputKind::SectorDirectory,
                ..
            }
        ));
    }

    #[test]
    fn test_scan_map() {
        let (_dir, descriptor) = map_with_sectors(&[
            (
                "sec+0000+0000.json",
                r#"[{"type": "model", "name": "tree1"}, {"type": "trigger"}]"#,
            ),
            (
                "sec+0000+0001.json",
                r#"[{"type": "model", "name": "tree1"}, {"type": "sign", "model": "stop"}]"#,
            ),
        ]);

        let mut found = FoundAssets::new();
        let stats =
            scan_map(&descriptor, &JsonSectorReader, &Extractor::default(), &mut found).unwrap();

        assert_eq!(stats, ScanStats { sectors: 2, items: 4 });
        assert_eq!(found.len(), 2);
        assert!(found.contains("model.tree1"));
        assert!(found.contains("sign.stop"));
    }

    #[test]
    fn test_corrupt_sector() {
        let (_dir, descriptor) = map_with_sectors(&[("sec+0000+0000.json", "{ not json")]);
        let mut found = FoundAssets::new();
        let err = scan_map(&descriptor, &JsonSectorReader, &Extractor::default(), &mut found)
            .unwrap_err();
        assert!(matches!(err, Error::SectorDecode { .. }));
    }

    #[test]
    fn test_no_readable_sectors() {
        let (_dir, descriptor) = map_with_sectors(&[
            ("sec+0000+0000.base", ""),
            ("sec+0000+0000.aux", ""),
            ("sec+0001+0000.base", ""),
        ]);
        let mut found = FoundAssets::new();
        let err = scan_map(&descriptor, &JsonSectorReader, &Extractor::default(), &mut found)
            .unwrap_err();

        let Error::SectorDecode { sector, source } = &err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!(sector, &sector_dir(&descriptor));
        let SectorError::NoSectors { expected, present } = source else {
            panic!("unexpected error: {}", source);
        };
        assert_eq!(expected, "json");
        assert_eq!(present, &["aux", "base"]);
        assert_eq!(
            source.to_string(),
            "no .json sector files, directory holds [aux, base]"
        );
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_empty_sector_dir() {
        let (_dir, descriptor) = map_with_sectors(&[]);
        let mut found = FoundAssets::new();
        let err = scan_map(&descriptor, &JsonSectorReader, &Extractor::default(), &mut found)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SectorDecode {
                source: SectorError::NoSectors { .. },
                ..
            }
        ));
    }

    /// Records which sectors were requested per call
    struct Recording(std::cell::RefCell<Vec<Vec<String>>>);

    impl MapReader for Recording {
        fn sector_extension(&self) -> &str {
            "base"
        }

        fn open_restricted(
            &self,
            _: &Path,
            sectors: &[String],
        ) -> std::result::Result<Vec<MapItem>, SectorError> {
            self.0.borrow_mut().push(sectors.to_vec());
            Ok(vec![MapItem::Other])
        }
    }

    #[test]
    fn test_sectors_decoded_one_at_a_time() {
        let (_dir, descriptor) = map_with_sectors(&[("a.base", ""), ("b.base", "")]);
        let reader = Recording(Default::default());
        let mut found = FoundAssets::new();
        scan_map(&descriptor, &reader, &Extractor::default(), &mut found).unwrap();
        assert_eq!(*reader.0.borrow(), [vec!["a.base".to_string()], vec!["b.base".to_string()]]);
    }
}

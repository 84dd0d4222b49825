//! One full check: index packages, scan the map, build the report

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::{self, Archive};
use crate::error::InputKind;
use crate::extract::{EmptyTokens, Extractor, FoundAssets};
use crate::map::{self, MapReader};
use crate::origin::{ConflictPolicy, OriginIndex, OriginIndexBuilder};
use crate::report::DlcReport;
use crate::{Error, Result};

/// File name pattern of installed DLC packages
pub const DEFAULT_ARCHIVE_PATTERN: &str = "dlc_*.scs";

/// Settings of a check run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Glob matched against file names in the game root
    pub archive_pattern: String,
    pub conflict_policy: ConflictPolicy,
    pub empty_tokens: EmptyTokens,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            archive_pattern: DEFAULT_ARCHIVE_PATTERN.to_string(),
            conflict_policy: ConflictPolicy::default(),
            empty_tokens: EmptyTokens::default(),
        }
    }
}

/// Runs checks with one set of options and one map reader
///
/// Each call to [`check`](Self::check) owns its package handles, index and
/// found set; nothing carries over between runs.
pub struct DlcChecker<M> {
    options: Options,
    reader: M,
}

impl<M: MapReader> DlcChecker<M> {
    pub fn new(options: Options, reader: M) -> Self {
        Self { options, reader }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Report the DLC packages the map at `descriptor` uses
    pub fn check(&self, descriptor: &Path, game_root: &Path) -> Result<DlcReport> {
        if !descriptor.is_file() {
            return Err(Error::InputNotFound {
                kind: InputKind::MapDescriptor,
                path: descriptor.to_path_buf(),
            });
        }
        if !game_root.is_dir() {
            return Err(Error::InputNotFound {
                kind: InputKind::GameRoot,
                path: game_root.to_path_buf(),
            });
        }

        let mut archives = open_archives(game_root, &self.options.archive_pattern)?;
        let index = self.build_index(&mut archives)?;

        let extractor = Extractor::new(self.options.empty_tokens);
        let mut found = FoundAssets::new();
        let stats = map::scan_map(descriptor, &self.reader, &extractor, &mut found)?;
        info!(
            "Scanned {} sectors, {} items, {} distinct asset keys",
            stats.sectors,
            stats.items,
            found.len()
        );

        let map_name = descriptor
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(DlcReport::build(&map_name, &found, &index))
    }

    fn build_index(&self, archives: &mut [(String, Box<dyn Archive>)]) -> Result<OriginIndex> {
        let mut builder = OriginIndexBuilder::new(self.options.conflict_policy);
        for (id, archive) in archives.iter_mut() {
            builder.add_archive(id.as_str(), archive.as_mut())?;
        }
        let index = builder.build();
        info!(
            "Indexed {} units from {} DLC packages",
            index.len(),
            index.archives().len()
        );
        Ok(index)
    }
}

/// Paths in `game_root` whose file name matches `pattern`, sorted by name
pub fn discover_archives(game_root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(game_root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if glob_match::glob_match(pattern, name) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// Open every matching package, keyed by file name
///
/// Handles stay open for the whole run.
pub fn open_archives(game_root: &Path, pattern: &str) -> Result<Vec<(String, Box<dyn Archive>)>> {
    let mut archives = Vec::new();
    for path in discover_archives(game_root, pattern)? {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        debug!("Opening {}", path.display());

        let archive = archive::open(&path).map_err(|source| Error::ArchiveRead {
            archive: id.clone(),
            source,
        })?;
        archives.push((id, archive));
    }
    Ok(archives)
}

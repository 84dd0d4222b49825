//! Group found assets by the DLC package declaring them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::extract::FoundAssets;
use crate::origin::OriginIndex;
use crate::{Error, Result};

/// Output encoding of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Assets one package contributes to the map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DlcGroup {
    pub archive: String,
    pub assets: BTreeSet<String>,
}

/// DLC usage of one map
///
/// Groups keep package discovery order; packages contributing nothing are
/// not part of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DlcReport {
    pub map_name: String,
    pub dlcs: Vec<DlcGroup>,
}

impl DlcReport {
    /// Join found keys against the origin index
    ///
    /// Keys without an origin are base game content and are dropped.
    pub fn build(map_name: &str, found: &FoundAssets, index: &OriginIndex) -> Self {
        let mut groups: Vec<DlcGroup> = index
            .archives()
            .iter()
            .map(|archive| DlcGroup {
                archive: archive.clone(),
                assets: BTreeSet::new(),
            })
            .collect();

        for key in found.iter() {
            let Some(origin) = index.origin(key.as_str()) else {
                continue;
            };
            if let Some(group) = groups.iter_mut().find(|g| g.archive == origin) {
                group.assets.insert(key.to_string());
            }
        }

        groups.retain(|g| !g.assets.is_empty());
        Self {
            map_name: map_name.to_string(),
            dlcs: groups,
        }
    }

    /// Packages the map needs, in discovery order
    pub fn used_dlcs(&self) -> impl Iterator<Item = &str> {
        self.dlcs.iter().map(|g| g.archive.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.dlcs.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.to_string(),
            // strings and sets only, serialization can't fail
            ReportFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default() + "\n",
        }
    }

    /// Write the text report to `path`, or stdout when `None`
    pub fn write_to(&self, path: Option<&Path>) -> Result<()> {
        self.write_as(path, ReportFormat::Text)
    }

    /// Write the report to `path` atomically, or to stdout when `None`
    ///
    /// The report is written to a temporary file next to `path` and renamed
    /// over it, so readers never see a partial report.
    pub fn write_as(&self, path: Option<&Path>, format: ReportFormat) -> Result<()> {
        let rendered = self.render(format);

        let Some(path) = path else {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
            return Ok(());
        };

        let write_err = |source: std::io::Error| Error::ReportWrite {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(rendered.as_bytes()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl fmt::Display for DlcReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The map \"{}\" uses assets from the following DLCs:\n",
            self.map_name
        )?;
        for group in &self.dlcs {
            writeln!(f, "* {}", group.archive)?;
        }
        writeln!(f)?;

        writeln!(f, "Detailed list of all DLC assets:\n")?;
        for group in &self.dlcs {
            writeln!(f, "[ {} ]", group.archive)?;
            for asset in &group.assets {
                writeln!(f, "{}", asset)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

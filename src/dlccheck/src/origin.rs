//! Which DLC package declares each unit
//!
//! Every package is searched in the same fixed set of definition
//! directories. Each named unit found there is registered against the
//! package, turning the union of all packages into one lookup table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::archive::{Archive, ArchiveError, EntryKind};
use crate::sii;
use crate::{Error, Result};

/// A definition directory searched in every package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionDir {
    pub path: &'static str,
    pub recursive: bool,
}

/// Directories holding unit declarations map items can refer to
pub const DEFINITION_DIRS: [DefinitionDir; 5] = [
    DefinitionDir {
        path: "/def/",
        recursive: false,
    },
    DefinitionDir {
        path: "/def/city",
        recursive: false,
    },
    DefinitionDir {
        path: "/def/ferry",
        recursive: true,
    },
    DefinitionDir {
        path: "/def/sign",
        recursive: true,
    },
    DefinitionDir {
        path: "/def/world",
        recursive: false,
    },
];

/// Extensions of definition files and definition includes
pub const DEFINITION_EXTENSIONS: [&str; 2] = ["sii", "sui"];

/// How to settle two packages declaring the same unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Abort with [`Error::OriginConflict`]
    #[default]
    Error,
    /// Keep the package discovered first
    FirstWins,
    /// Let the package discovered later override
    LastWins,
}

/// Outcome of registering one unit name
#[derive(Debug, Clone, PartialEq, Eq)]
enum Registration {
    Inserted,
    /// Same package declared the name again
    Unchanged,
    /// Conflict resolved in favor of the existing package
    Kept { existing: String },
    /// Conflict resolved in favor of the incoming package
    Replaced { previous: String },
}

/// A resolved duplicate declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub key: String,
    pub winner: String,
    pub loser: String,
}

/// Unit name -> declaring package, plus packages in discovery order
#[derive(Debug, Clone, Default)]
pub struct OriginIndex {
    archives: Vec<String>,
    origins: HashMap<String, usize>,
    conflicts: Vec<Conflict>,
}

impl OriginIndex {
    /// Package that declares `key`, `None` for base game content
    pub fn origin(&self, key: &str) -> Option<&str> {
        self.origins.get(key).map(|&i| self.archives[i].as_str())
    }

    /// Every package, in discovery order
    pub fn archives(&self) -> &[String] {
        &self.archives
    }

    /// Conflicts settled by a non-error policy
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.origins
            .iter()
            .map(|(k, &i)| (k.as_str(), self.archives[i].as_str()))
    }
}

/// Builds an [`OriginIndex`] one package at a time
#[derive(Debug)]
pub struct OriginIndexBuilder {
    policy: ConflictPolicy,
    dirs: Vec<DefinitionDir>,
    index: OriginIndex,
}

impl OriginIndexBuilder {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            dirs: DEFINITION_DIRS.to_vec(),
            index: OriginIndex::default(),
        }
    }

    /// Replace the searched definition directories
    pub fn with_dirs(mut self, dirs: Vec<DefinitionDir>) -> Self {
        self.dirs = dirs;
        self
    }

    /// Register `name` as declared by package number `archive`
    ///
    /// `archive` is always a position in `index.archives`, assigned by
    /// [`add_archive`](Self::add_archive).
    fn register(&mut self, name: &str, archive: usize) -> Result<Registration> {
        let index = &mut self.index;
        let Some(&existing) = index.origins.get(name) else {
            index.origins.insert(name.to_string(), archive);
            return Ok(Registration::Inserted);
        };
        if existing == archive {
            return Ok(Registration::Unchanged);
        }

        let existing_name = index.archives[existing].clone();
        let incoming_name = index.archives[archive].clone();
        match self.policy {
            ConflictPolicy::Error => Err(Error::OriginConflict {
                key: name.to_string(),
                existing: existing_name,
                incoming: incoming_name,
            }),
            ConflictPolicy::FirstWins => {
                warn!(
                    "{} declared by {} and {}, keeping {}",
                    name, existing_name, incoming_name, existing_name
                );
                index.conflicts.push(Conflict {
                    key: name.to_string(),
                    winner: existing_name.clone(),
                    loser: incoming_name,
                });
                Ok(Registration::Kept {
                    existing: existing_name,
                })
            }
            ConflictPolicy::LastWins => {
                warn!(
                    "{} declared by {} and {}, using {}",
                    name, existing_name, incoming_name, incoming_name
                );
                index.origins.insert(name.to_string(), archive);
                index.conflicts.push(Conflict {
                    key: name.to_string(),
                    winner: incoming_name,
                    loser: existing_name.clone(),
                });
                Ok(Registration::Replaced {
                    previous: existing_name,
                })
            }
        }
    }

    /// Scan one package and register every named unit it declares
    ///
    /// Packages must be added in discovery order.
    pub fn add_archive(&mut self, id: &str, archive: &mut dyn Archive) -> Result<usize> {
        let number = self.index.archives.len();
        self.index.archives.push(id.to_string());

        let read_err = |source: ArchiveError| Error::ArchiveRead {
            archive: id.to_string(),
            source,
        };

        let mut registered = 0;
        for dir in self.dirs.clone() {
            if archive.entry_kind(dir.path).map_err(read_err)? != EntryKind::Directory {
                continue;
            }

            let entries = archive
                .list_directory(dir.path, dir.recursive)
                .map_err(read_err)?;
            for entry in entries {
                if entry.kind != EntryKind::File {
                    continue;
                }
                let is_definition = entry
                    .extension()
                    .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext.as_str()));
                if !is_definition {
                    debug!("{}: skipping non-definition file {}", id, entry.path);
                    continue;
                }

                let bytes = archive.read_file(&entry.path).map_err(read_err)?;
                let text = String::from_utf8_lossy(&bytes);
                let doc = sii::parse(&text).map_err(|source| Error::DefinitionParse {
                    archive: id.to_string(),
                    file: entry.path.clone(),
                    source,
                })?;

                for unit in doc.units.iter().filter(|u| !u.is_anonymous()) {
                    if self.register(&unit.name, number)? == Registration::Inserted {
                        registered += 1;
                    }
                }
            }
        }

        debug!("{}: {} units registered", id, registered);
        Ok(registered)
    }

    pub fn build(self) -> OriginIndex {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use std::sync::{Arc, Mutex};

    fn units(names: &[&str]) -> String {
        let mut text = String::from("SiiNunit\n{\n");
        for name in names {
            text.push_str(&format!("model_def : {}\n{{\n}}\n", name));
        }
        text.push_str("}\n");
        text
    }

    #[test]
    fn test_registers_named_units() {
        let mut archive = MemoryArchive::new().with_file(
            "/def/world/model.sii",
            units(&["model.x", "_nameless.1a.2b", ".local"]),
        );

        let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
        assert_eq!(builder.add_archive("dlc_a.scs", &mut archive).unwrap(), 1);
        let index = builder.build();

        assert_eq!(index.origin("model.x"), Some("dlc_a.scs"));
        assert_eq!(index.origin("_nameless.1a.2b"), None);
        assert_eq!(index.origin(".local"), None);
        assert_eq!(index.archives(), ["dlc_a.scs"]);
    }

    #[test]
    fn test_directory_scope() {
        let mut archive = MemoryArchive::new()
            .with_file("/def/top.sii", units(&["city.top"]))
            .with_file("/def/city/paris.sui", units(&["city.paris"]))
            .with_file("/def/city/deep/hidden.sii", units(&["city.hidden"]))
            .with_file("/def/sign/a/b/deep.sii", units(&["sign.deep"]))
            .with_file("/def/ferry/port/calais.sii", units(&["ferry.calais"]))
            .with_file("/def/world/readme.txt", units(&["model.txt"]))
            .with_file("/def/vehicle/truck.sii", units(&["vehicle.truck"]));

        let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
        builder.add_archive("dlc_a.scs", &mut archive).unwrap();
        let index = builder.build();

        assert_eq!(index.origin("city.top"), Some("dlc_a.scs"));
        assert_eq!(index.origin("city.paris"), Some("dlc_a.scs"));
        assert_eq!(index.origin("sign.deep"), Some("dlc_a.scs"));
        assert_eq!(index.origin("ferry.calais"), Some("dlc_a.scs"));
        // non-recursive directory, wrong extension, unsearched directory
        assert_eq!(index.origin("city.hidden"), None);
        assert_eq!(index.origin("model.txt"), None);
        assert_eq!(index.origin("vehicle.truck"), None);
    }

    /// Log sink shared between a test and its subscriber
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_skipped_files_are_logged() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let mut archive = MemoryArchive::new()
            .with_file("/def/world/readme.txt", "notes")
            .with_file("/def/world/model.sii", units(&["model.x"]));

        let registered = tracing::subscriber::with_default(subscriber, || {
            let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
            builder.add_archive("dlc_a.scs", &mut archive).unwrap()
        });
        assert_eq!(registered, 1);

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("dlc_a.scs: skipping non-definition file def/world/readme.txt"));
        assert!(!logs.contains("skipping non-definition file def/world/model.sii"));
    }

    #[test]
    fn test_missing_directories_are_skipped() {
        let mut archive = MemoryArchive::new().with_file("/manifest.sii", units(&["model.m"]));
        let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
        assert_eq!(builder.add_archive("dlc_a.scs", &mut archive).unwrap(), 0);
        assert!(builder.build().is_empty());
    }

    fn conflicting() -> (MemoryArchive, MemoryArchive) {
        (
            MemoryArchive::new().with_file("/def/world/a.sii", units(&["model.shared"])),
            MemoryArchive::new().with_file("/def/world/b.sii", units(&["model.shared"])),
        )
    }

    #[test]
    fn test_conflict_error_policy() {
        let (mut a, mut b) = conflicting();
        let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
        builder.add_archive("dlc_a.scs", &mut a).unwrap();
        let err = builder.add_archive("dlc_b.scs", &mut b).unwrap_err();
        match err {
            Error::OriginConflict {
                key,
                existing,
                incoming,
            } => {
                assert_eq!(key, "model.shared");
                assert_eq!(existing, "dlc_a.scs");
                assert_eq!(incoming, "dlc_b.scs");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_conflict_first_wins() {
        let (mut a, mut b) = conflicting();
        let mut builder = OriginIndexBuilder::new(ConflictPolicy::FirstWins);
        builder.add_archive("dlc_a.scs", &mut a).unwrap();
        builder.add_archive("dlc_b.scs", &mut b).unwrap();
        let index = builder.build();
        assert_eq!(index.origin("model.shared"), Some("dlc_a.scs"));
        assert_eq!(index.conflicts().len(), 1);
        assert_eq!(index.conflicts()[0].loser, "dlc_b.scs");
    }

    #[test]
    fn test_conflict_last_wins() {
        let (mut a, mut b) = conflicting();
        let mut builder = OriginIndexBuilder::new(ConflictPolicy::LastWins);
        builder.add_archive("dlc_a.scs", &mut a).unwrap();
        builder.add_archive("dlc_b.scs", &mut b).unwrap();
        let index = builder.build();
        assert_eq!(index.origin("model.shared"), Some("dlc_b.scs"));
        assert_eq!(index.conflicts()[0].winner, "dlc_b.scs");
    }

    #[test]
    fn test_conflict_names_packages_by_discovery_position() {
        let (mut a, mut c) = conflicting();
        let mut b = MemoryArchive::new().with_file("/def/world/b.sii", units(&["model.other"]));

        for (policy, winner, loser) in [
            (ConflictPolicy::FirstWins, "dlc_a.scs", "dlc_c.scs"),
            (ConflictPolicy::LastWins, "dlc_c.scs", "dlc_a.scs"),
        ] {
            let mut builder = OriginIndexBuilder::new(policy);
            builder.add_archive("dlc_a.scs", &mut a).unwrap();
            builder.add_archive("dlc_b.scs", &mut b).unwrap();
            builder.add_archive("dlc_c.scs", &mut c).unwrap();
            let index = builder.build();

            assert_eq!(index.origin("model.shared"), Some(winner));
            assert_eq!(index.origin("model.other"), Some("dlc_b.scs"));
            assert_eq!(
                index.conflicts(),
                [Conflict {
                    key: "model.shared".to_string(),
                    winner: winner.to_string(),
                    loser: loser.to_string(),
                }]
            );
        }
    }

    #[test]
    fn test_same_archive_redeclaration() {
        let mut archive = MemoryArchive::new()
            .with_file("/def/world/a.sii", units(&["model.x"]))
            .with_file("/def/world/a_extra.sui", units(&["model.x"]));
        let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
        assert_eq!(builder.add_archive("dlc_a.scs", &mut archive).unwrap(), 1);
        assert!(builder.build().conflicts().is_empty());
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut archive =
            MemoryArchive::new().with_file("/def/world/bad.sii", "SiiNunit\n{\n");
        let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
        let err = builder.add_archive("dlc_a.scs", &mut archive).unwrap_err();
        assert!(matches!(
            err,
            Error::DefinitionParse { ref file, .. } if file == "def/world/bad.sii"
        ));
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let (mut a, _) = conflicting();
            let mut c =
                MemoryArchive::new().with_file("/def/sign/s.sii", units(&["sign.a", "sign.b"]));
            let mut builder = OriginIndexBuilder::new(ConflictPolicy::Error);
            builder.add_archive("dlc_a.scs", &mut a).unwrap();
            builder.add_archive("dlc_c.scs", &mut c).unwrap();
            let index = builder.build();
            let mut pairs: Vec<(String, String)> = index
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            pairs.sort();
            pairs
        };
        assert_eq!(build(), build());
    }
}

//! Errors for the whole check run.
//!
//! Every variant is fatal. They are kept apart so a caller can tell input
//! validation failures from corrupt data and from origin policy conflicts.

use std::fmt;
use std::path::PathBuf;

use crate::archive::ArchiveError;
use crate::map::SectorError;
use crate::sii::ParseError;

/// Which user-supplied input was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    MapDescriptor,
    GameRoot,
    SectorDirectory,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputKind::MapDescriptor => "Map descriptor",
            InputKind::GameRoot => "Game root directory",
            InputKind::SectorDirectory => "Sector directory",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {}", path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },

    #[error("Failed to read archive {archive}: {source}")]
    ArchiveRead {
        archive: String,
        #[source]
        source: ArchiveError,
    },

    #[error("Failed to parse definition {file} in {archive}: {source}")]
    DefinitionParse {
        archive: String,
        file: String,
        #[source]
        source: ParseError,
    },

    #[error("Failed to decode sector {}: {source}", sector.display())]
    SectorDecode {
        sector: PathBuf,
        #[source]
        source: SectorError,
    },

    #[error("Asset {key} is declared by both {existing} and {incoming}")]
    OriginConflict {
        key: String,
        existing: String,
        incoming: String,
    },

    #[error("Failed to write report to {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this failure class
    ///
    /// 2 and 3 are the historic codes for a missing map descriptor and game
    /// root; everything past that is one code per class.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InputNotFound {
                kind: InputKind::MapDescriptor,
                ..
            } => 2,
            Error::InputNotFound {
                kind: InputKind::GameRoot,
                ..
            } => 3,
            Error::InputNotFound {
                kind: InputKind::SectorDirectory,
                ..
            } => 2,
            Error::ArchiveRead { .. } => 4,
            Error::DefinitionParse { .. } => 5,
            Error::SectorDecode { .. } => 6,
            Error::OriginConflict { .. } => 7,
            Error::ReportWrite { .. } | Error::Io(_) => 8,
        }
    }

    /// True for failures caused by missing or wrong user input
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InputNotFound { .. })
    }
}

//! # dlccheck
//!
//! Determine which DLC packages a map depends on.
//!
//! The check runs in three phases:
//! 1. Every installed DLC package (`dlc_*.scs` in the game root) is opened and
//!    its well-known definition directories are parsed into an
//!    [`OriginIndex`] mapping unit names to the package declaring them.
//! 2. The map's sectors are decoded one at a time and every item is reduced to
//!    [`AssetKey`]s (`category.token`) collected into [`FoundAssets`].
//! 3. Found keys are joined against the index into a [`DlcReport`]. Keys with
//!    no origin belong to the base game and are dropped.
//!
//! ## Example
//!
//! ```no_run
//! use dlccheck::{DlcChecker, JsonSectorReader, Options};
//!
//! # fn main() -> Result<(), dlccheck::Error> {
//! let checker = DlcChecker::new(Options::default(), JsonSectorReader);
//! let report = checker.check("map/europe.mbd".as_ref(), "/games/ets2".as_ref())?;
//! report.write_to(None)?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
mod check;
mod error;
pub mod extract;
pub mod item;
pub mod map;
pub mod origin;
pub mod report;
pub mod sii;

#[doc(inline)]
pub use archive::{Archive, ArchiveError, DirArchive, EntryKind, HashFs, MemoryArchive, ZipFs};
#[doc(inline)]
pub use check::{discover_archives, open_archives, DlcChecker, Options, DEFAULT_ARCHIVE_PATTERN};
#[doc(inline)]
pub use error::{Error, InputKind};
#[doc(inline)]
pub use extract::{AssetKey, Category, EmptyTokens, Extractor, FoundAssets};
#[doc(inline)]
pub use item::{MapItem, Token};
#[doc(inline)]
pub use map::{JsonSectorReader, MapReader, ScanStats, SectorError};
#[doc(inline)]
pub use origin::{ConflictPolicy, OriginIndex, OriginIndexBuilder};
#[doc(inline)]
pub use report::{DlcReport, ReportFormat};

pub type Result<T> = std::result::Result<T, Error>;

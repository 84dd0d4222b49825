//! CLI argument definitions for dlccheck

use clap::{ArgAction, Parser, ValueEnum};
use dlccheck::{ConflictPolicy, EmptyTokens};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dlccheck", version)]
#[command(about = "List the DLC packages a map uses assets from", long_about = None)]
pub struct Cli {
    /// Path to the map descriptor (e.g. map/europe.mbd)
    pub map: PathBuf,

    /// Game installation directory holding the DLC packages
    pub game_root: PathBuf,

    /// Write the report to this file instead of stdout
    pub output: Option<PathBuf>,

    /// Glob selecting DLC packages in the game root [default: dlc_*.scs]
    #[arg(long, value_name = "GLOB")]
    pub archives: Option<String>,

    /// What to do when two packages declare the same unit
    #[arg(long, value_enum)]
    pub conflicts: Option<ConflictArg>,

    /// Whether unset asset references are reported as `category.`
    #[arg(long, value_enum)]
    pub empty_tokens: Option<EmptyTokensArg>,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", env = "DLCCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictArg {
    /// Abort the run
    Error,
    /// Keep the package discovered first
    FirstWins,
    /// Keep the package discovered last
    LastWins,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Error => ConflictPolicy::Error,
            ConflictArg::FirstWins => ConflictPolicy::FirstWins,
            ConflictArg::LastWins => ConflictPolicy::LastWins,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyTokensArg {
    Skip,
    Emit,
}

impl From<EmptyTokensArg> for EmptyTokens {
    fn from(arg: EmptyTokensArg) -> Self {
        match arg {
            EmptyTokensArg::Skip => EmptyTokens::Skip,
            EmptyTokensArg::Emit => EmptyTokens::Emit,
        }
    }
}

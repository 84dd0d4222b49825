mod cli;
mod config;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use dlccheck::{DlcChecker, JsonSectorReader};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;

/// Exit code for bad invocations: argument count, flags, config file
const EXIT_USAGE: u8 = 1;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "dlccheck=warn",
        1 => "dlccheck=info",
        _ => "dlccheck=debug",
    };

    // stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = config.resolve(cli);

    let checker = DlcChecker::new(settings.options, JsonSectorReader);
    let report = checker.check(&cli.map, &cli.game_root)?;
    if report.is_empty() {
        info!("{} uses no DLC assets", report.map_name);
    }

    report.write_as(cli.output.as_deref(), settings.format)?;
    Ok(())
}

fn exit_code(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<dlccheck::Error>()
        .map(dlccheck::Error::exit_code)
        .unwrap_or(EXIT_USAGE)
}

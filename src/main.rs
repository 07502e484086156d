//! # splitfetch
//!
//! A concurrent range-based file downloader.
//!
//! This module contains the main entry point for the `splitfetch` application. It
//! parses command-line arguments, configures logging and the HTTP client, and
//! starts the download.

use std::process::ExitCode;

use clap::Parser;
use human_panic::setup_panic;
use tracing::Level;

use splitfetch::features::save_to_local::{cli::LocalArgs, handler};
use splitfetch::utils;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    local: LocalArgs,
    /// Log debug information about every chunk.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_panic!();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    utils::logger_init(level);

    // The handler has already logged the failure with its stage.
    match handler::handle(cli.local).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

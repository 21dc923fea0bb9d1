//! mlink - share files through S3-compatible storage and YOURLS
//!
//! Uploads files, shortens their links, and downloads them again from the
//! short link.

use clap::Parser;
use mlink_core::CancellationToken;

mod commands;
mod exit_code;
mod logging;
mod output;
mod signal;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (log_guard, log_failure) = logging::init(cli.debug, cli.logs.as_deref());
    if let Some(e) = log_failure
        && !cli.quiet
    {
        eprintln!("⚠ File logging disabled: {e:#}");
    }

    let cancel = CancellationToken::new();
    let supervisor = signal::supervise(cancel.clone());

    let exit_code = commands::execute(cli, cancel).await;
    tracing::debug!(exit_code = exit_code.as_i32(), "finished");

    supervisor.abort();
    // process::exit skips destructors; flush the log writer first
    drop(log_guard);
    std::process::exit(exit_code.as_i32());
}

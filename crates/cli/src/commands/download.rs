//! download command - Fetch a file through its short link
//!
//! Expands the short link with YOURLS, resolves the storage link to bucket
//! and key, and streams the object to disk. Without `--filepath` the file
//! lands in `./files/{key}`.

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use mlink_core::{Download, Shortener as _, cancellable, fetch};
use serde::Serialize;

use super::{CommandContext, report};
use crate::exit_code::ExitCode;
use crate::output::Spinner;

/// Download a file through its short link
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Short link returned by `mlink upload`
    pub link: String,

    /// Where to save the file (default: ./files/<key>)
    #[arg(short, long, value_name = "PATH")]
    pub filepath: Option<PathBuf>,
}

/// Output structure for download command
#[derive(Debug, Serialize)]
struct DownloadOutput {
    short_url: String,
    url: String,
    bucket: String,
    key: String,
    path: String,
    size_bytes: u64,
}

impl DownloadOutput {
    fn new(short_url: String, url: String, download: Download) -> Self {
        Self {
            short_url,
            url,
            bucket: download.location.bucket,
            key: download.location.key,
            path: download.path.display().to_string(),
            size_bytes: download.bytes,
        }
    }
}

impl fmt::Display for DownloadOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {} ({} bytes)",
            self.bucket, self.key, self.path, self.size_bytes
        )
    }
}

/// Execute the download command
pub async fn execute(args: DownloadArgs, ctx: &CommandContext) -> ExitCode {
    let formatter = ctx.formatter();

    let config = match ctx.load_config(&formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let shortener = match ctx.shortener(&config, &formatter) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let spinner = Spinner::start(&ctx.output, "Expanding link");
    let long_url = match cancellable(&ctx.cancel, shortener.expand(&args.link)).await {
        Ok(url) => url,
        Err(e) => {
            spinner.finish_and_clear();
            return report(&formatter, &format!("Failed to expand {}", args.link), &e);
        }
    };
    tracing::debug!(%long_url, "expanded link");

    let store = match ctx.object_store(&config, &formatter).await {
        Ok(s) => s,
        Err(code) => {
            spinner.finish_and_clear();
            return code;
        }
    };

    spinner.set_message("Downloading");
    let download = match fetch(&store, &long_url, args.filepath.as_deref(), &ctx.cancel).await {
        Ok(d) => d,
        Err(e) => {
            spinner.finish_and_clear();
            return report(&formatter, "Failed to download file", &e);
        }
    };
    spinner.finish_and_clear();
    tracing::info!(path = %download.path.display(), bytes = download.bytes, "download successful");

    let output = DownloadOutput::new(args.link, long_url, download);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.success(&output.to_string());
    }
    ExitCode::Success
}

//! upload command - Publish a file and shorten its link
//!
//! Uploads into the base bucket, or its `-private` sibling with `--private`,
//! then registers the storage link with YOURLS.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use mlink_core::{Publication, Publisher, Shortener as _, Visibility, cancellable};
use serde::Serialize;

use super::{CommandContext, report};
use crate::exit_code::ExitCode;
use crate::output::Spinner;

/// Upload a file and shorten its link
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload
    pub path: PathBuf,

    /// Upload into the private bucket and share a time-limited signed link
    #[arg(short, long)]
    pub private: bool,
}

/// Output structure for upload command
#[derive(Debug, Serialize)]
struct UploadOutput {
    short_url: String,
    url: String,
    bucket: String,
    key: String,
    visibility: Visibility,
    content_type: String,
    size_bytes: i64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<String>,
}

impl UploadOutput {
    fn new(publication: Publication, short_url: String) -> Self {
        let expires_in = publication.link.expires_in.map(friendly_duration);
        Self {
            short_url,
            url: publication.link.url,
            bucket: publication.link.location.bucket,
            key: publication.link.location.key,
            visibility: publication.bucket.visibility,
            content_type: publication.content_type,
            size_bytes: publication.info.size_bytes,
            size_human: publication.info.size_human,
            expires_in,
        }
    }
}

impl fmt::Display for UploadOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.short_url)?;
        write!(
            f,
            "  {} ({}, {}, {})",
            self.url, self.visibility, self.content_type, self.size_human
        )?;
        if let Some(expiry) = &self.expires_in {
            write!(f, "\nLink will be valid for {expiry}")?;
        }
        Ok(())
    }
}

/// `168h`, `1h 30m`; falls back to seconds for durations jiff rejects
fn friendly_duration(duration: Duration) -> String {
    match jiff::SignedDuration::try_from(duration) {
        Ok(d) => format!("{d:#}"),
        Err(_) => format!("{}s", duration.as_secs()),
    }
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, ctx: &CommandContext) -> ExitCode {
    let formatter = ctx.formatter();

    let config = match ctx.load_config(&formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match ctx.object_store(&config, &formatter).await {
        Ok(s) => s,
        Err(code) => return code,
    };
    let shortener = match ctx.shortener(&config, &formatter) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let visibility = Visibility::from_private_flag(args.private);
    let spinner = Spinner::start(&ctx.output, &format!("Uploading {}", args.path.display()));

    let publication = match Publisher::new(&store, &config.storage)
        .publish(&args.path, visibility, &ctx.cancel)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            spinner.finish_and_clear();
            return report(
                &formatter,
                &format!("Failed to upload {}", args.path.display()),
                &e,
            );
        }
    };
    tracing::info!(url = %publication.link, "upload successful");

    spinner.set_message("Shortening link");
    let short_url = match cancellable(&ctx.cancel, shortener.shorten(&publication.link.url)).await
    {
        Ok(url) => url,
        Err(e) => {
            spinner.finish_and_clear();
            return report(&formatter, "Failed to shorten link", &e);
        }
    };
    spinner.finish_and_clear();
    tracing::info!(%short_url, "shortening successful");

    formatter.output(&UploadOutput::new(publication, short_url));
    ExitCode::Success
}

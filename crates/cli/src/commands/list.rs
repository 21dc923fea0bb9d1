//! list command - Show the links mlink created
//!
//! Reads the most recent links from YOURLS, keeps those titled by mlink and
//! checks each linked object in turn.

use std::fmt;

use clap::Args;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use mlink_core::catalog::{inspect, list_published};
use mlink_core::{CatalogEntry, DEFAULT_LINK_LIMIT, EntryStatus};
use serde::Serialize;

use super::{CommandContext, report};
use crate::exit_code::ExitCode;
use crate::output::Spinner;

/// List published links
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Number of recent shortener links to inspect
    #[arg(short = 'i', long, default_value_t = DEFAULT_LINK_LIMIT as i64)]
    pub limit: i64,
}

/// Output structure for list command
#[derive(Debug, Serialize)]
struct ListOutput {
    links: Vec<CatalogEntry>,
    total: usize,
    missing: usize,
    expired: usize,
    #[serde(skip)]
    colors: bool,
}

impl ListOutput {
    fn new(links: Vec<CatalogEntry>, colors: bool) -> Self {
        let count = |status: EntryStatus| links.iter().filter(|e| e.status == status).count();
        let missing = count(EntryStatus::Missing);
        let expired = count(EntryStatus::Expired);
        Self {
            total: links.len(),
            missing,
            expired,
            links,
            colors,
        }
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                "Short link",
                "Object",
                "Size",
                "Modified",
                "Expires",
                "Status",
            ]);

        if !self.colors {
            table.force_no_tty();
        }

        for entry in &self.links {
            let (size, modified, status) = match &entry.status {
                EntryStatus::Available(info) => (
                    info.size_human.clone(),
                    info.last_modified
                        .map(|ts| ts.strftime("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                    Cell::new("available").fg(Color::Green),
                ),
                EntryStatus::Missing => (
                    String::new(),
                    String::new(),
                    Cell::new("missing").fg(Color::Red),
                ),
                EntryStatus::Expired => (
                    String::new(),
                    String::new(),
                    Cell::new("expired").fg(Color::Yellow),
                ),
            };
            let expires = entry
                .expires_at
                .map(|ts| ts.strftime("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());

            table.add_row(vec![
                Cell::new(&entry.short_url),
                Cell::new(entry.location.to_string()),
                Cell::new(size),
                Cell::new(modified),
                Cell::new(expires),
                status,
            ]);
        }

        table
    }
}

impl fmt::Display for ListOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.links.is_empty() {
            return f.write_str("No links uploaded with mlink found");
        }

        writeln!(f, "{}", self.table())?;
        write!(
            f,
            "Total: {} links, {} missing, {} expired",
            self.total, self.missing, self.expired
        )
    }
}

/// Execute the list command
pub async fn execute(args: ListArgs, ctx: &CommandContext) -> ExitCode {
    let formatter = ctx.formatter();

    let config = match ctx.load_config(&formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let shortener = match ctx.shortener(&config, &formatter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let store = match ctx.object_store(&config, &formatter).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let spinner = Spinner::start(&ctx.output, "Fetching links");
    let links = match list_published(&shortener, args.limit, &ctx.cancel).await {
        Ok(links) => links,
        Err(e) => {
            spinner.finish_and_clear();
            return report(&formatter, "Failed to list links", &e);
        }
    };

    spinner.set_message("Checking objects");
    let entries = match inspect(&store, &links, &ctx.cancel).await {
        Ok(entries) => entries,
        Err(e) => {
            spinner.finish_and_clear();
            return report(&formatter, "Failed to check objects", &e);
        }
    };
    spinner.finish_and_clear();
    tracing::info!(links = entries.len(), "listing done");

    formatter.output(&ListOutput::new(entries, formatter.colors_enabled()));
    ExitCode::Success
}

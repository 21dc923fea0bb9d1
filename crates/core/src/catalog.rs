//! Catalog of links published by mlink
//!
//! The shortener may be shared with other tools. Links created by mlink are
//! recognised by their title, which is always exactly [`LINK_TITLE`].

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::Serialize;

use crate::cancel::{CancellationToken, cancellable};
use crate::error::{Error, Result};
use crate::link::{ObjectLocation, resolve, signed_expiry};
use crate::traits::{ObjectInfo, ObjectStore, Shortener};

/// Title attached to every short link mlink creates
pub const LINK_TITLE: &str = "Uploaded using mlink";

/// Number of links requested when no positive limit is given
pub const DEFAULT_LINK_LIMIT: usize = 20;

/// Current state of a published object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryStatus {
    Available(ObjectInfo),
    Missing,
    /// The presigned link no longer works, whether or not the object exists
    Expired,
}

/// A published link together with the object it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub short_url: String,
    pub long_url: String,
    pub location: ObjectLocation,
    /// When a presigned link stops working; `None` for public links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// Effective link limit; anything below 1 becomes [`DEFAULT_LINK_LIMIT`]
pub fn effective_limit(limit: i64) -> usize {
    if limit < 1 {
        DEFAULT_LINK_LIMIT
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Short link to long link for the recent links mlink created
pub async fn list_published(
    shortener: &dyn Shortener,
    limit: i64,
    cancel: &CancellationToken,
) -> Result<BTreeMap<String, String>> {
    let limit = effective_limit(limit);
    let records = cancellable(cancel, shortener.recent_links(limit)).await?;
    let total = records.len();

    let links: BTreeMap<String, String> = records
        .into_iter()
        .filter(|record| record.title == LINK_TITLE)
        .map(|record| (record.short_url, record.long_url))
        .collect();

    tracing::debug!(total, matched = links.len(), limit, "filtered shortener links");
    Ok(links)
}

/// Look up every linked object, one at a time
///
/// Presigned links past their expiry are reported as [`EntryStatus::Expired`]
/// without asking the store. Objects that no longer exist are reported as
/// [`EntryStatus::Missing`]. Any other failure aborts the whole listing.
pub async fn inspect(
    store: &dyn ObjectStore,
    links: &BTreeMap<String, String>,
    cancel: &CancellationToken,
) -> Result<Vec<CatalogEntry>> {
    let now = Timestamp::now();
    let mut entries = Vec::with_capacity(links.len());

    for (short_url, long_url) in links {
        let location = resolve(long_url)?;
        let expires_at = signed_expiry(long_url);

        let status = if expires_at.is_some_and(|at| at <= now) {
            tracing::debug!(%location, "signed link expired");
            EntryStatus::Expired
        } else {
            match cancellable(cancel, store.stat_object(&location)).await {
                Ok(info) => EntryStatus::Available(info),
                Err(Error::NotFound(_)) => {
                    tracing::debug!(%location, "linked object no longer exists");
                    EntryStatus::Missing
                }
                Err(e) => return Err(e.context(&format!("failed to stat {location}"))),
            }
        };

        entries.push(CatalogEntry {
            short_url: short_url.clone(),
            long_url: long_url.clone(),
            location,
            expires_at,
            status,
        });
    }

    Ok(entries)
}

//! Object retrieval to local disk

use std::path::{Path, PathBuf};

use jiff::Timestamp;

use crate::cancel::{CancellationToken, cancellable};
use crate::error::{Error, Result};
use crate::link::{ObjectLocation, resolve, signed_expiry};
use crate::traits::ObjectStore;

/// Directory downloads land in when no destination is given, as `{dir}/{key}`
pub const DEFAULT_DOWNLOAD_DIR: &str = "./files";

/// A completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub location: ObjectLocation,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Download the object behind `link`
///
/// The link is resolved before the store is contacted, so a malformed link
/// never causes a network call. A presigned link past its expiry fails with
/// [`Error::NotFound`], also without touching the store. An existing file at
/// the destination is replaced.
pub async fn fetch(
    store: &dyn ObjectStore,
    link: &str,
    destination: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<Download> {
    let path = destination.map(Path::to_path_buf);
    fetch_into(store, link, path, Path::new(DEFAULT_DOWNLOAD_DIR), cancel).await
}

async fn fetch_into(
    store: &dyn ObjectStore,
    link: &str,
    destination: Option<PathBuf>,
    download_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Download> {
    let location = resolve(link)?;
    tracing::debug!(bucket = %location.bucket, key = %location.key, "resolved link");

    if let Some(expired_at) = signed_expiry(link)
        && expired_at <= Timestamp::now()
    {
        tracing::debug!(%location, %expired_at, "signed link expired");
        return Err(Error::NotFound(format!(
            "signed link for {location} expired at {expired_at}"
        )));
    }

    let path = match destination {
        Some(p) => p,
        None => {
            let p = download_dir.join(&location.key);
            tracing::debug!(path = %p.display(), "no destination given, using default");
            p
        }
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = cancellable(cancel, store.get_object_to_file(&location, &path))
        .await
        .map_err(|e| e.context(&format!("failed to download {location}")))?;

    tracing::debug!(path = %path.display(), bytes, "download complete");

    Ok(Download {
        location,
        path,
        bytes,
    })
}

//! Backend trait definitions
//!
//! [`ObjectStore`] and [`Shortener`] describe the two remote services the
//! pipeline drives. They keep the core decoupled from the S3 SDK and the
//! HTTP client, and are mocked in tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;

use crate::error::Result;
use crate::link::ObjectLocation;

/// Metadata for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: i64,

    /// Human-readable size
    pub size_human: String,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for an object of `size` bytes
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: size,
            size_human: humansize::format_size(size.max(0) as u64, humansize::BINARY),
            last_modified: None,
            etag: None,
            content_type: None,
        }
    }
}

/// One link as reported by the shortener's statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub short_url: String,
    pub long_url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub clicks: u64,
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create a bucket in `region`, optionally with object locking
    async fn create_bucket(&self, bucket: &str, region: &str, object_locking: bool) -> Result<()>;

    /// Replace the bucket policy with `policy` (a JSON document)
    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;

    /// Stream the file at `source` into `location`
    async fn put_object(
        &self,
        location: &ObjectLocation,
        source: &Path,
        content_type: &str,
    ) -> Result<ObjectInfo>;

    /// Stream the object at `location` into `destination`, returning bytes written
    async fn get_object_to_file(&self, location: &ObjectLocation, destination: &Path)
    -> Result<u64>;

    /// Presigned GET URL valid for `expires_in`
    async fn presigned_get(&self, location: &ObjectLocation, expires_in: Duration)
    -> Result<String>;

    /// Get object metadata
    async fn stat_object(&self, location: &ObjectLocation) -> Result<ObjectInfo>;
}

/// Trait for URL shortener operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Shortener: Send + Sync {
    /// Register `long_url` under a fresh keyword, returning the short URL
    async fn shorten(&self, long_url: &str) -> Result<String>;

    /// Look up the long URL behind `short_url`
    async fn expand(&self, short_url: &str) -> Result<String>;

    /// The `limit` most recently created links
    async fn recent_links(&self, limit: usize) -> Result<Vec<LinkRecord>>;
}

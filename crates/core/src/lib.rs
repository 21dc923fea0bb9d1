//! mlink-core: publication and resolution pipeline for mlink
//!
//! This crate provides the core functionality of mlink, including:
//! - Configuration loading
//! - Bucket lifecycle and visibility
//! - Object naming and content classification
//! - Publishing files and resolving share links back to objects
//! - Listing the links mlink created on a shared shortener
//! - ObjectStore and Shortener traits for the two remote services
//!
//! This crate is designed to be independent of any specific S3 SDK or HTTP
//! client, allowing the pipeline to be tested against mocks.

pub mod bucket;
pub mod cancel;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod link;
pub mod naming;
pub mod publish;
pub mod traits;
pub mod visibility;

pub use bucket::{BucketHandle, BucketManager};
pub use cancel::{CancellationToken, cancellable};
pub use catalog::{CatalogEntry, EntryStatus, DEFAULT_LINK_LIMIT, LINK_TITLE};
pub use config::{AppConfig, ConfigLoader, ShortenerConfig, StorageConfig};
pub use error::{Error, Result};
pub use fetch::{Download, fetch};
pub use link::{ObjectLocation, ShareLink, resolve, signed_expiry};
pub use publish::{Publication, Publisher};
pub use traits::{LinkRecord, ObjectInfo, ObjectStore, Shortener};
pub use visibility::Visibility;

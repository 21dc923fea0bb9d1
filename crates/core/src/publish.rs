//! Object publication
//!
//! Uploads a local file under a fresh key into the bucket matching the
//! requested visibility and produces the link to share.

use std::path::Path;

use crate::bucket::{BucketHandle, BucketManager};
use crate::cancel::{CancellationToken, cancellable};
use crate::classify::classify;
use crate::config::StorageConfig;
use crate::error::Result;
use crate::link::{ObjectLocation, ShareLink};
use crate::naming::object_key;
use crate::traits::{ObjectInfo, ObjectStore};
use crate::visibility::Visibility;

/// Outcome of a successful publish
#[derive(Debug, Clone)]
pub struct Publication {
    /// Link to hand out
    pub link: ShareLink,
    /// Bucket the object landed in
    pub bucket: BucketHandle,
    /// Metadata reported by the store
    pub info: ObjectInfo,
    /// Detected content type
    pub content_type: String,
}

/// Publishes files into the configured buckets
pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
    config: &'a StorageConfig,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a StorageConfig) -> Self {
        Self { store, config }
    }

    /// Upload `path` and return its share link
    ///
    /// Public objects get a plain `{endpoint}/{bucket}/{key}` URL, private
    /// objects a presigned URL valid for the configured default expiry.
    /// Nothing is retried.
    pub async fn publish(
        &self,
        path: &Path,
        visibility: Visibility,
        cancel: &CancellationToken,
    ) -> Result<Publication> {
        tracing::debug!(path = %path.display(), %visibility, "publishing file");

        let bucket = BucketManager::new(
            self.store,
            &self.config.region,
            self.config.object_locking,
        )
        .ensure(&self.config.bucket_name, visibility, cancel)
        .await?;

        let content_type = classify(path).await?;
        tracing::debug!(%content_type, "classified content");

        let location = ObjectLocation::new(&bucket.name, object_key(path));
        tracing::debug!(key = %location.key, "generated object key");

        let info = cancellable(
            cancel,
            self.store.put_object(&location, path, &content_type),
        )
        .await
        .map_err(|e| e.context(&format!("failed to upload {}", path.display())))?;

        tracing::debug!(
            bucket = %location.bucket,
            key = %location.key,
            size = info.size_bytes,
            etag = info.etag.as_deref().unwrap_or("-"),
            "upload complete"
        );

        let link = match visibility {
            Visibility::Public => {
                let endpoint = self.config.endpoint_url()?;
                ShareLink::public(&endpoint, location)
            }
            Visibility::Private => {
                let expiry = self.config.default_expiry;
                let url = cancellable(cancel, self.store.presigned_get(&location, expiry))
                    .await
                    .map_err(|e| e.context("failed to get presigned url"))?;
                ShareLink::signed(url, location, expiry)
            }
        };
        tracing::debug!(url = %link, "share link ready");

        Ok(Publication {
            link,
            bucket,
            info,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::link::resolve;
    use crate::traits::MockObjectStore;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn storage_config() -> StorageConfig {
        StorageConfig {
            endpoint: "store.example".to_string(),
            access_key: "access".to_string(),
            secret_key: "secret".to_string(),
            use_ssl: true,
            bucket_name: "my-bucket".to_string(),
            region: "us-east-1".to_string(),
            object_locking: false,
            default_expiry: Duration::from_secs(3600),
        }
    }

    fn report_pdf(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n").unwrap();
        path
    }

    fn store_with_bucket() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|_| Ok(true));
        store.expect_set_bucket_policy().returning(|_, _| Ok(()));
        store
    }

    #[tokio::test]
    async fn test_public_publish_builds_resolvable_url() {
        let dir = TempDir::new().unwrap();
        let file = report_pdf(&dir);
        let expected_source = file.clone();

        let mut store = store_with_bucket();
        store
            .expect_put_object()
            .withf(move |location, source, content_type| {
                location.bucket == "my-bucket"
                    && location.key.ends_with(".pdf")
                    && source == expected_source.as_path()
                    && content_type == "application/pdf"
            })
            .times(1)
            .returning(|location, _, _| Ok(ObjectInfo::new(location.key.clone(), 28)));
        store.expect_presigned_get().never();

        let config = storage_config();
        let publication = Publisher::new(&store, &config)
            .publish(&file, Visibility::Public, &CancellationToken::new())
            .await
            .unwrap();

        let link = &publication.link;
        assert_eq!(
            link.url,
            format!("https://store.example/my-bucket/{}", link.location.key)
        );
        assert!(!link.is_signed());
        assert_eq!(resolve(&link.url).unwrap(), link.location);
        assert_eq!(publication.content_type, "application/pdf");
        assert_eq!(publication.info.size_bytes, 28);
    }

    #[tokio::test]
    async fn test_private_publish_uses_presigned_url() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("secret.zip");
        std::fs::write(&file, b"PK\x03\x04\x14\x00\x00\x00\x08\x00").unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_bucket_exists()
            .withf(|bucket| bucket == "my-bucket-private")
            .returning(|_| Ok(true));
        store.expect_set_bucket_policy().never();
        store
            .expect_put_object()
            .returning(|location, _, _| Ok(ObjectInfo::new(location.key.clone(), 10)));
        store
            .expect_presigned_get()
            .withf(|_, expires_in| *expires_in == Duration::from_secs(3600))
            .times(1)
            .returning(|location, expires_in| {
                Ok(format!(
                    "https://store.example/{}/{}?X-Amz-Expires={}&X-Amz-Signature=abc",
                    location.bucket,
                    location.key,
                    expires_in.as_secs()
                ))
            });

        let config = storage_config();
        let publication = Publisher::new(&store, &config)
            .publish(&file, Visibility::Private, &CancellationToken::new())
            .await
            .unwrap();

        let link = &publication.link;
        assert!(link.is_signed());
        assert_eq!(link.expires_in, Some(Duration::from_secs(3600)));
        assert_eq!(link.location.bucket, "my-bucket-private");
        assert!(link.location.key.ends_with(".zip"));
        assert_eq!(resolve(&link.url).unwrap(), link.location);
    }

    #[tokio::test]
    async fn test_classification_failure_skips_upload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("empty.txt");
        std::fs::write(&file, b"").unwrap();

        let mut store = store_with_bucket();
        store.expect_put_object().never();

        let config = storage_config();
        let err = Publisher::new(&store, &config)
            .publish(&file, Visibility::Public, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Classification(_)));
    }

    #[tokio::test]
    async fn test_missing_file_skips_upload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("missing.pdf");

        let mut store = store_with_bucket();
        store.expect_put_object().never();

        let config = storage_config();
        let err = Publisher::new(&store, &config)
            .publish(&file, Visibility::Public, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_upload_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let file = report_pdf(&dir);

        let mut store = store_with_bucket();
        store
            .expect_put_object()
            .times(1)
            .returning(|_, _, _| Err(Error::Network("connection reset".into())));

        let config = storage_config();
        let err = Publisher::new(&store, &config)
            .publish(&file, Visibility::Public, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert!(err.to_string().contains("failed to upload"));
    }

    #[tokio::test]
    async fn test_republish_never_reuses_key() {
        let dir = TempDir::new().unwrap();
        let file = report_pdf(&dir);

        let mut store = store_with_bucket();
        store
            .expect_put_object()
            .times(2)
            .returning(|location, _, _| Ok(ObjectInfo::new(location.key.clone(), 28)));

        let config = storage_config();
        let publisher = Publisher::new(&store, &config);
        let token = CancellationToken::new();
        let first = publisher
            .publish(&file, Visibility::Public, &token)
            .await
            .unwrap();
        let second = publisher
            .publish(&file, Visibility::Public, &token)
            .await
            .unwrap();

        assert_ne!(first.link.location.key, second.link.location.key);
    }
}

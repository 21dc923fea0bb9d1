//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from mlink-core.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use tokio::io::AsyncWriteExt;
use url::Url;

use mlink_core::{Error, ObjectInfo, ObjectLocation, ObjectStore, Result, StorageConfig};

/// Region S3 expects to be left out of the create-bucket location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    endpoint: Url,
}

impl S3Client {
    /// Create a new S3 client from the storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "mlink-static-credentials",
        );

        // Build SDK config
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .load()
            .await;

        // Path-style addressing keeps links in the `{endpoint}/{bucket}/{key}` form
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        tracing::debug!(endpoint = %endpoint, region = %config.region, "created S3 client");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            endpoint,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Endpoint the client talks to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(false),
            Err(e) => match map_sdk_error(e) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str, object_locking: bool) -> Result<()> {
        let mut request = self
            .inner
            .create_bucket()
            .bucket(bucket)
            .object_lock_enabled_for_bucket(object_locking);

        if !region.is_empty() && region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        request.send().await.map_err(map_sdk_error)?;
        Ok(())
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.inner
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(())
    }

    async fn put_object(
        &self,
        location: &ObjectLocation,
        source: &Path,
        content_type: &str,
    ) -> Result<ObjectInfo> {
        let size = tokio::fs::metadata(source).await?.len() as i64;
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        let response = self
            .inner
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let mut info = ObjectInfo::new(&location.key, size);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        info.content_type = Some(content_type.to_string());
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn get_object_to_file(
        &self,
        location: &ObjectLocation,
        destination: &Path,
    ) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                    Error::NotFound(location.to_string())
                } else {
                    map_sdk_error(e)
                }
            })?;

        // Stream into a sibling file first so a failed transfer never clobbers the destination
        let partial = partial_path(destination);
        let mut reader = response.body.into_async_read();
        let mut file = tokio::fs::File::create(&partial).await?;

        let written = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(Error::Network(format!("transfer of {location} failed: {e}")));
            }
        };
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, destination).await?;
        Ok(written)
    }

    async fn presigned_get(&self, location: &ObjectLocation, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Config(format!("invalid link expiry {expires_in:?}: {e}")))?;

        let request = self
            .inner
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(presigning)
            .await
            .map_err(map_sdk_error)?;

        Ok(request.uri().to_string())
    }

    async fn stat_object(&self, location: &ObjectLocation) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_not_found()) {
                    Error::NotFound(location.to_string())
                } else {
                    map_sdk_error(e)
                }
            })?;

        let size = response.content_length().unwrap_or(0);
        let mut info = ObjectInfo::new(&location.key, size);

        if let Some(modified) = response.last_modified() {
            info.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
        }

        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }

        if let Some(ct) = response.content_type() {
            info.content_type = Some(ct.to_string());
        }

        Ok(info)
    }
}

/// `{destination}.part`, where downloads stream before being renamed
fn partial_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    destination.with_file_name(name)
}

/// Translate an SDK failure into the mlink error taxonomy
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();

    if matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
        return Error::Network(message);
    }

    let status = err.raw_response().map(|r| r.status().as_u16());
    classify(err.code(), status, message)
}

fn classify(code: Option<&str>, status: Option<u16>, message: String) -> Error {
    let expired = message.contains("expired");

    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            Error::NotFound(message)
        }
        // Presigned links past their expiry come back as AccessDenied
        (Some("AccessDenied"), _) | (_, Some(403)) if expired => Error::NotFound(message),
        (
            Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken"),
            _,
        )
        | (_, Some(401 | 403)) => Error::Auth(message),
        (Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists"), _) | (_, Some(409)) => {
            Error::Conflict(message)
        }
        (_, Some(500..=599)) => Error::Network(message),
        _ => Error::Backend(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_config(endpoint: &str, use_ssl: bool) -> StorageConfig {
        StorageConfig {
            endpoint: endpoint.to_string(),
            access_key: "access".to_string(),
            secret_key: "secret".to_string(),
            use_ssl,
            bucket_name: "minio-link".to_string(),
            region: "us-east-1".to_string(),
            object_locking: false,
            default_expiry: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_client_endpoint_from_config() {
        let client = S3Client::new(&storage_config("localhost:9000", false))
            .await
            .unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:9000/");

        let client = S3Client::new(&storage_config("store.example", true))
            .await
            .unwrap();
        assert_eq!(client.endpoint().as_str(), "https://store.example/");
    }

    #[tokio::test]
    async fn test_presigned_url_is_path_style_and_signed() {
        let client = S3Client::new(&storage_config("localhost:9000", false))
            .await
            .unwrap();
        let location = ObjectLocation::new("minio-link-private", "abc.zip");

        let url = client
            .presigned_get(&location, Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/minio-link-private/abc.zip?"));
        assert!(mlink_core::link::is_signed_url(&url));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert_eq!(mlink_core::resolve(&url).unwrap(), location);
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("./files/abc.pdf")),
            PathBuf::from("./files/abc.pdf.part")
        );
    }

    #[test]
    fn test_classify_not_found() {
        assert!(matches!(
            classify(Some("NoSuchKey"), Some(404), "missing".into()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            classify(None, Some(404), "head".into()),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_expired_signature_is_not_found() {
        let err = classify(Some("AccessDenied"), Some(403), "Request has expired".into());
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_classify_access_denied() {
        assert!(matches!(
            classify(Some("AccessDenied"), Some(403), "Access Denied.".into()),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify(Some("SignatureDoesNotMatch"), None, "bad key".into()),
            Error::Auth(_)
        ));
    }

    #[test]
    fn test_classify_conflict() {
        assert!(matches!(
            classify(Some("BucketAlreadyOwnedByYou"), Some(409), "exists".into()),
            Error::Conflict(_)
        ));
    }

    #[test]
    fn test_classify_other() {
        assert!(matches!(
            classify(Some("SlowDown"), Some(503), "slow down".into()),
            Error::Network(_)
        ));
        assert!(matches!(
            classify(Some("MalformedPolicy"), Some(400), "bad policy".into()),
            Error::Backend(_)
        ));
    }
}

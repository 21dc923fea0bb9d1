//! Bucket lifecycle
//!
//! Makes sure the bucket for a visibility exists before anything is uploaded
//! into it. Creation and policy application are each idempotent, so running
//! [`BucketManager::ensure`] again after a failure is always safe.

use serde::Serialize;

use crate::cancel::{CancellationToken, cancellable};
use crate::error::{Error, Result};
use crate::traits::ObjectStore;
use crate::visibility::Visibility;

/// A bucket ready to receive uploads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketHandle {
    pub name: String,
    pub visibility: Visibility,
    /// Whether this call created the bucket
    pub created: bool,
}

/// Policy document granting anonymous `GetObject` on every object in `bucket`
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AddPerm",
                "Effect": "Allow",
                "Principal": { "AWS": ["*"] },
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{bucket}/*")]
            }
        ]
    })
    .to_string()
}

/// Creates buckets on demand and keeps public buckets readable
pub struct BucketManager<'a> {
    store: &'a dyn ObjectStore,
    region: &'a str,
    object_locking: bool,
}

impl<'a> BucketManager<'a> {
    pub fn new(store: &'a dyn ObjectStore, region: &'a str, object_locking: bool) -> Self {
        Self {
            store,
            region,
            object_locking,
        }
    }

    /// Ensure the bucket for `visibility` exists
    ///
    /// Public buckets get their anonymous-read policy re-applied on every
    /// call, whether or not the bucket was just created.
    pub async fn ensure(
        &self,
        base_name: &str,
        visibility: Visibility,
        cancel: &CancellationToken,
    ) -> Result<BucketHandle> {
        let name = visibility.bucket_name(base_name);

        let exists = cancellable(cancel, self.store.bucket_exists(&name))
            .await
            .map_err(|e| e.context(&format!("failed to check if bucket {name} exists")))?;

        let mut created = false;
        if exists {
            tracing::debug!(bucket = %name, "bucket already exists");
        } else {
            match cancellable(
                cancel,
                self.store
                    .create_bucket(&name, self.region, self.object_locking),
            )
            .await
            {
                Ok(()) => {
                    tracing::info!(
                        bucket = %name,
                        region = %self.region,
                        object_locking = self.object_locking,
                        "created bucket"
                    );
                    created = true;
                }
                Err(Error::Conflict(msg)) => {
                    tracing::warn!(bucket = %name, "bucket appeared concurrently: {msg}");
                }
                Err(e) => return Err(e.context(&format!("failed to create bucket {name}"))),
            }
        }

        if visibility.is_public() {
            let policy = public_read_policy(&name);
            cancellable(cancel, self.store.set_bucket_policy(&name, &policy))
                .await
                .map_err(|e| e.context(&format!("failed to set policy on bucket {name}")))?;
            tracing::debug!(bucket = %name, "applied public read policy");
        }

        Ok(BucketHandle {
            name,
            visibility,
            created,
        })
    }
}

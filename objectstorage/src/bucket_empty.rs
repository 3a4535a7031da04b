//! Concurrent eviction of every object version and delete marker in a
//! bucket, used by forced bucket destroys.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scw_gax::pool::WorkerPool;
use scw_gax::CancellationToken;

use crate::api::objects::list_versions::ListObjectVersionsRequest;
use crate::api::objects::head::HeadObjectRequest;
use crate::api::objects::legal_hold::PutObjectLegalHoldRequest;
use crate::api::objects::delete::DeleteObjectRequest;
use crate::api::objects::{ObjectLockLegalHold, ObjectVersion};
use crate::api::Error;
use crate::ObjectStorageClient;

const MAX_WORKERS: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum EmptyBucketError {
    /// Listing the bucket's versions failed; nothing was dispatched.
    #[error(transparent)]
    List(#[from] Error),

    /// One or more deletion tasks failed.
    #[error("{0}")]
    Deletions(MultiError),
}

/// The aggregate of every per-task failure from one emptying pass.
#[derive(Debug)]
pub struct MultiError(pub Vec<Error>);

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} object deletions failed", self.0.len())?;
        for error in &self.0 {
            write!(f, "; {error}")?;
        }
        Ok(())
    }
}

/// Deletes every object version and delete marker in the bucket, fanning
/// deletions out over `min(num_cpus, 8)` workers. Returns the number of
/// object versions deleted.
pub async fn empty_bucket(
    client: &ObjectStorageClient,
    bucket: &str,
    cancel: Option<CancellationToken>,
) -> Result<u64, EmptyBucketError> {
    let workers = num_cpus::get().min(MAX_WORKERS);
    let pool: WorkerPool<Error> = WorkerPool::new(workers, cancel.clone());
    let deleted = Arc::new(AtomicU64::new(0));

    let mut key_marker = None;
    let mut version_id_marker = None;
    loop {
        let req = ListObjectVersionsRequest {
            bucket: bucket.to_string(),
            key_marker: key_marker.clone(),
            version_id_marker: version_id_marker.clone(),
            ..Default::default()
        };
        let page = client.list_object_versions(&req, cancel.clone()).await?;

        for marker in page.delete_markers {
            let client = client.clone();
            let bucket = bucket.to_string();
            let cancel = cancel.clone();
            pool.submit(async move {
                let req = DeleteObjectRequest {
                    bucket,
                    key: marker.key,
                    version_id: Some(marker.version_id),
                };
                match client.delete_object(&req, cancel).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.is_not_found() => Ok(()),
                    Err(e) => Err(e),
                }
            })
            .await;
        }

        for version in page.versions {
            let client = client.clone();
            let bucket = bucket.to_string();
            let cancel = cancel.clone();
            let deleted = Arc::clone(&deleted);
            pool.submit(async move {
                delete_version(&client, &bucket, version, cancel).await?;
                deleted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .await;
        }

        if !page.is_truncated {
            break;
        }
        key_marker = page.next_key_marker;
        version_id_marker = page.next_version_id_marker;
        if key_marker.is_none() && version_id_marker.is_none() {
            break;
        }
    }

    let errors = pool.close_and_wait().await;
    let total = deleted.load(Ordering::Relaxed);
    tracing::info!(bucket, deleted = total, failed = errors.len(), "emptied bucket");
    if errors.is_empty() {
        Ok(total)
    } else {
        Err(EmptyBucketError::Deletions(MultiError(errors)))
    }
}

/// Deletes one object version. A forbidden response may mean the version is
/// under legal hold; if so the hold is lifted and the delete retried once.
async fn delete_version(
    client: &ObjectStorageClient,
    bucket: &str,
    version: ObjectVersion,
    cancel: Option<CancellationToken>,
) -> Result<(), Error> {
    let req = DeleteObjectRequest {
        bucket: bucket.to_string(),
        key: version.key.clone(),
        version_id: Some(version.version_id.clone()),
    };
    match client.delete_object(&req, cancel.clone()).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) if e.is_forbidden() => {
            let head = client
                .head_object(
                    &HeadObjectRequest {
                        bucket: bucket.to_string(),
                        key: version.key.clone(),
                        version_id: Some(version.version_id.clone()),
                        encryption: None,
                    },
                    cancel.clone(),
                )
                .await?;
            if head.legal_hold_status.as_deref() != Some("ON") {
                return Err(e);
            }
            tracing::debug!(
                bucket,
                key = %version.key,
                version_id = %version.version_id,
                "lifting legal hold before delete"
            );
            client
                .put_object_legal_hold(
                    &PutObjectLegalHoldRequest {
                        bucket: bucket.to_string(),
                        key: version.key.clone(),
                        version_id: Some(version.version_id.clone()),
                        legal_hold: ObjectLockLegalHold {
                            status: "OFF".to_string(),
                        },
                    },
                    cancel.clone(),
                )
                .await?;
            match client.delete_object(&req, cancel).await {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::ErrorResponse;

    #[test]
    fn multi_error_lists_every_failure() {
        let errors = vec![
            Error::Response(ErrorResponse {
                status: 500,
                code: "InternalError".to_string(),
                message: "a".to_string(),
            }),
            Error::Response(ErrorResponse {
                status: 500,
                code: "InternalError".to_string(),
                message: "b".to_string(),
            }),
        ];
        let rendered = MultiError(errors).to_string();
        assert!(rendered.starts_with("2 object deletions failed"));
        assert!(rendered.contains("; a"));
        assert!(rendered.contains("; b"));
    }
}

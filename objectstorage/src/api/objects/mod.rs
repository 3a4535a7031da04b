use std::collections::HashMap;

use base64::prelude::*;
use md5::{Digest, Md5};
use reqwest_middleware::RequestBuilder;
use time::OffsetDateTime;

pub mod acl;
pub mod copy;
pub mod delete;
pub mod head;
pub mod legal_hold;
pub mod list_versions;
pub mod put;
pub mod tagging;

/// A customer-supplied encryption key (SSE-C). The service never stores the
/// key; every operation on an encrypted object must carry the header
/// triplet derived here.
#[derive(Clone, PartialEq, Eq)]
pub struct SseCustomerKey {
    key: Vec<u8>,
}

impl SseCustomerKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    pub fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-amz-server-side-encryption-customer-algorithm", "AES256")
            .header(
                "x-amz-server-side-encryption-customer-key",
                BASE64_STANDARD.encode(&self.key),
            )
            .header(
                "x-amz-server-side-encryption-customer-key-md5",
                BASE64_STANDARD.encode(Md5::digest(&self.key)),
            )
    }

    /// The same triplet for the copy source side of a copy-object call.
    pub fn with_copy_source_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(
                "x-amz-copy-source-server-side-encryption-customer-algorithm",
                "AES256",
            )
            .header(
                "x-amz-copy-source-server-side-encryption-customer-key",
                BASE64_STANDARD.encode(&self.key),
            )
            .header(
                "x-amz-copy-source-server-side-encryption-customer-key-md5",
                BASE64_STANDARD.encode(Md5::digest(&self.key)),
            )
    }
}

impl std::fmt::Debug for SseCustomerKey {
    // never leak key material into logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SseCustomerKey(..)")
    }
}

/// One stored version of an object.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub storage_class: String,
}

/// A delete marker left by a versioned delete.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMarkerEntry {
    pub key: String,
    pub version_id: String,
    #[serde(default)]
    pub is_latest: bool,
}

#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectVersionsResponse {
    #[serde(default)]
    pub versions: Vec<ObjectVersion>,
    #[serde(default)]
    pub delete_markers: Vec<DeleteMarkerEntry>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_key_marker: Option<String>,
    #[serde(default)]
    pub next_version_id_marker: Option<String>,
}

/// Metadata observed by a HEAD on one object version. Assembled by the
/// client from response headers.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct HeadObjectResult {
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub metadata: HashMap<String, String>,
    pub storage_class: Option<String>,
    pub legal_hold_status: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CopyObjectResult {
    #[serde(default)]
    pub etag: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
}

#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ObjectLockLegalHold {
    /// `ON` or `OFF`.
    pub status: String,
}

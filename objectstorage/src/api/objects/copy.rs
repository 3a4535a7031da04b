use std::collections::HashMap;

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::objects::SseCustomerKey;
use crate::api::Escape;

/// Request message for CopyObject. With `copy_source` equal to the
/// destination, this mutates metadata, storage class and content type in
/// place.
#[derive(Clone, Default, Debug)]
pub struct CopyObjectRequest {
    pub bucket: String,
    pub key: String,
    /// `<bucket>/<key>` of the source object.
    pub copy_source: String,
    pub content_type: Option<String>,
    pub storage_class: Option<String>,
    pub acl: Option<String>,
    pub metadata: HashMap<String, String>,
    pub encryption: Option<SseCustomerKey>,
    pub copy_source_encryption: Option<SseCustomerKey>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &CopyObjectRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    let mut builder = client
        .put(url)
        .header("x-amz-copy-source", req.copy_source.escape())
        .header("x-amz-metadata-directive", "REPLACE");
    if let Some(content_type) = &req.content_type {
        builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
    }
    if let Some(storage_class) = &req.storage_class {
        builder = builder.header("x-amz-storage-class", storage_class);
    }
    if let Some(acl) = &req.acl {
        builder = builder.header("x-amz-acl", acl);
    }
    for (key, value) in &req.metadata {
        builder = builder.header(format!("x-amz-meta-{key}"), value);
    }
    if let Some(encryption) = &req.encryption {
        builder = encryption.with_headers(builder);
    }
    if let Some(encryption) = &req.copy_source_encryption {
        builder = encryption.with_copy_source_headers(builder);
    }
    builder
}

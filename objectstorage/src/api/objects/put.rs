use std::collections::HashMap;

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::objects::SseCustomerKey;
use crate::api::Escape;

/// Request message for PutObject.
#[derive(Clone, Default, Debug)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
    pub storage_class: Option<String>,
    /// Canned ACL, `private` or `public-read`.
    pub acl: Option<String>,
    /// User metadata, sent as `x-amz-meta-*` headers; keys are lower-case.
    pub metadata: HashMap<String, String>,
    pub encryption: Option<SseCustomerKey>,
}

pub(crate) fn build(
    base_url: &str,
    client: &Client,
    req: &PutObjectRequest,
    body: Vec<u8>,
) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    let mut builder = client.put(url).body(body);
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
    builder
}

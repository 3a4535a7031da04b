use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::objects::SseCustomerKey;
use crate::api::Escape;

/// Request message for HeadObject.
#[derive(Clone, Default, Debug)]
pub struct HeadObjectRequest {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub encryption: Option<SseCustomerKey>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &HeadObjectRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    let mut builder = client.head(url);
    if let Some(version_id) = &req.version_id {
        builder = builder.query(&[("versionId", version_id)]);
    }
    if let Some(encryption) = &req.encryption {
        builder = encryption.with_headers(builder);
    }
    builder
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::Escape;

/// Request message for DeleteObject. With a `version_id` this removes one
/// stored version or delete marker.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &DeleteObjectRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    client.delete(url).query(&req)
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::Escape;

/// Request message for DeleteBucket.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBucketRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &DeleteBucketRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.delete(url)
}

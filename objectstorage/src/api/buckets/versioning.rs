use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::VersioningConfiguration;
use crate::api::Escape;

/// Request message for PutBucketVersioning.
#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketVersioningRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    pub versioning_configuration: VersioningConfiguration,
}

pub(crate) fn build_put(
    base_url: &str,
    client: &Client,
    req: &PutBucketVersioningRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client
        .put(url)
        .query(&[("versioning", "")])
        .json(&req.versioning_configuration)
}

/// Request message for GetBucketVersioning.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketVersioningRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(
    base_url: &str,
    client: &Client,
    req: &GetBucketVersioningRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("versioning", "")])
}

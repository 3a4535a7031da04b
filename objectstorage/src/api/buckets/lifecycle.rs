use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::LifecycleRule;
use crate::api::Escape;

#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleConfiguration {
    #[serde(default)]
    pub rules: Vec<LifecycleRule>,
}

/// Request message for PutBucketLifecycleConfiguration.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketLifecycleRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(flatten)]
    pub lifecycle_configuration: LifecycleConfiguration,
}

pub(crate) fn build_put(
    base_url: &str,
    client: &Client,
    req: &PutBucketLifecycleRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client
        .put(url)
        .query(&[("lifecycle", "")])
        .json(&req.lifecycle_configuration)
}

/// Request message for GetBucketLifecycleConfiguration.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketLifecycleRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(
    base_url: &str,
    client: &Client,
    req: &GetBucketLifecycleRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("lifecycle", "")])
}

/// Request message for DeleteBucketLifecycle.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBucketLifecycleRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteBucketLifecycleRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.delete(url).query(&[("lifecycle", "")])
}

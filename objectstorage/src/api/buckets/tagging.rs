use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::Tag;
use crate::api::Escape;

#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Tagging {
    #[serde(default)]
    pub tag_set: Vec<Tag>,
}

/// Request message for PutBucketTagging; the set replaces any prior tags.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketTaggingRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(flatten)]
    pub tagging: Tagging,
}

pub(crate) fn build_put(
    base_url: &str,
    client: &Client,
    req: &PutBucketTaggingRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.put(url).query(&[("tagging", "")]).json(&req.tagging)
}

/// Request message for GetBucketTagging.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketTaggingRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(
    base_url: &str,
    client: &Client,
    req: &GetBucketTaggingRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("tagging", "")])
}

/// Request message for DeleteBucketTagging.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBucketTaggingRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteBucketTaggingRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.delete(url).query(&[("tagging", "")])
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::tagging::Tagging;
use crate::api::Escape;

/// Request message for PutObjectTagging; replaces the whole tag set.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectTaggingRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub key: String,
    #[serde(skip_serializing)]
    pub version_id: Option<String>,
    #[serde(flatten)]
    pub tagging: Tagging,
}

pub(crate) fn build_put(
    base_url: &str,
    client: &Client,
    req: &PutObjectTaggingRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    let mut builder = client.put(url).query(&[("tagging", "")]);
    if let Some(version_id) = &req.version_id {
        builder = builder.query(&[("versionId", version_id)]);
    }
    builder.json(&req.tagging)
}

/// Request message for GetObjectTagging.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectTaggingRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub key: String,
    #[serde(skip_serializing)]
    pub version_id: Option<String>,
}

pub(crate) fn build_get(
    base_url: &str,
    client: &Client,
    req: &GetObjectTaggingRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    let mut builder = client.get(url).query(&[("tagging", "")]);
    if let Some(version_id) = &req.version_id {
        builder = builder.query(&[("versionId", version_id)]);
    }
    builder
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::WebsiteConfiguration;
use crate::api::Escape;

/// Request message for PutBucketWebsite.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketWebsiteRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(flatten)]
    pub website_configuration: WebsiteConfiguration,
}

pub(crate) fn build_put(
    base_url: &str,
    client: &Client,
    req: &PutBucketWebsiteRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client
        .put(url)
        .query(&[("website", "")])
        .json(&req.website_configuration)
}

/// Request message for GetBucketWebsite.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketWebsiteRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(
    base_url: &str,
    client: &Client,
    req: &GetBucketWebsiteRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("website", "")])
}

/// Request message for DeleteBucketWebsite.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBucketWebsiteRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteBucketWebsiteRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.delete(url).query(&[("website", "")])
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::CorsRule;
use crate::api::Escape;

#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CorsConfiguration {
    #[serde(default)]
    pub cors_rules: Vec<CorsRule>,
}

/// Request message for PutBucketCors; the rule list is order-preserving and
/// replaces any prior configuration.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketCorsRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(flatten)]
    pub cors_configuration: CorsConfiguration,
}

pub(crate) fn build_put(base_url: &str, client: &Client, req: &PutBucketCorsRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client
        .put(url)
        .query(&[("cors", "")])
        .json(&req.cors_configuration)
}

/// Request message for GetBucketCors.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketCorsRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetBucketCorsRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("cors", "")])
}

/// Request message for DeleteBucketCors.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBucketCorsRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteBucketCorsRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.delete(url).query(&[("cors", "")])
}

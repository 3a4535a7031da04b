use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use serde_json::Value;

use crate::api::Escape;

/// Request message for PutBucketPolicy. The policy document is carried as
/// loose JSON; equivalence rather than byte equality is what matters.
#[derive(Clone, PartialEq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketPolicyRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    pub policy: Value,
}

pub(crate) fn build_put(base_url: &str, client: &Client, req: &PutBucketPolicyRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.put(url).query(&[("policy", "")]).json(&req.policy)
}

/// Request message for GetBucketPolicy.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketPolicyRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetBucketPolicyRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("policy", "")])
}

/// Request message for DeleteBucketPolicy.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBucketPolicyRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteBucketPolicyRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.delete(url).query(&[("policy", "")])
}

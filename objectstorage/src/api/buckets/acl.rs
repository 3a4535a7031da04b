use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::AccessControlPolicy;
use crate::api::Escape;

/// Request message for PutBucketAcl. Either the canned `acl` or the full
/// `access_control_policy` is sent, never both.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBucketAclRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub acl: Option<String>,
    #[serde(skip_serializing)]
    pub access_control_policy: Option<AccessControlPolicy>,
    #[serde(skip_serializing)]
    pub expected_bucket_owner: Option<String>,
}

pub(crate) fn build_put(base_url: &str, client: &Client, req: &PutBucketAclRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    let mut builder = client.put(url).query(&[("acl", "")]);
    if let Some(canned) = &req.acl {
        builder = builder.header("x-amz-acl", canned);
    }
    if let Some(owner) = &req.expected_bucket_owner {
        builder = builder.header("x-amz-expected-bucket-owner", owner);
    }
    if let Some(policy) = &req.access_control_policy {
        builder = builder.json(policy);
    }
    builder
}

/// Request message for GetBucketAcl.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetBucketAclRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub expected_bucket_owner: Option<String>,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetBucketAclRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    let mut builder = client.get(url).query(&[("acl", "")]);
    if let Some(owner) = &req.expected_bucket_owner {
        builder = builder.header("x-amz-expected-bucket-owner", owner);
    }
    builder
}

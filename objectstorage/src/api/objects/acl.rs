use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::Escape;

/// Request message for PutObjectAcl (canned form only).
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectAclRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub key: String,
    #[serde(skip_serializing)]
    pub acl: String,
}

pub(crate) fn build_put(base_url: &str, client: &Client, req: &PutObjectAclRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    client
        .put(url)
        .query(&[("acl", "")])
        .header("x-amz-acl", &req.acl)
}

/// Request message for GetObjectAcl.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectAclRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub key: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetObjectAclRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    client.get(url).query(&[("acl", "")])
}

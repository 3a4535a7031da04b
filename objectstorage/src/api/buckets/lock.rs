use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::buckets::ObjectLockConfiguration;
use crate::api::Escape;

/// Request message for PutObjectLockConfiguration.
#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectLockConfigurationRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    pub object_lock_configuration: ObjectLockConfiguration,
}

pub(crate) fn build_put(
    base_url: &str,
    client: &Client,
    req: &PutObjectLockConfigurationRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client
        .put(url)
        .query(&[("object-lock", "")])
        .json(&req.object_lock_configuration)
}

/// Request message for GetObjectLockConfiguration.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectLockConfigurationRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
}

pub(crate) fn build_get(
    base_url: &str,
    client: &Client,
    req: &GetObjectLockConfigurationRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.bucket.escape());
    client.get(url).query(&[("object-lock", "")])
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::objects::ObjectLockLegalHold;
use crate::api::Escape;

/// Request message for PutObjectLegalHold.
#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectLegalHoldRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    #[serde(skip_serializing)]
    pub key: String,
    #[serde(skip_serializing)]
    pub version_id: Option<String>,
    pub legal_hold: ObjectLockLegalHold,
}

pub(crate) fn build(
    base_url: &str,
    client: &Client,
    req: &PutObjectLegalHoldRequest,
) -> RequestBuilder {
    let url = format!("{base_url}/{}/{}", req.bucket.escape(), req.key.escape());
    let mut builder = client.put(url).query(&[("legal-hold", "")]);
    if let Some(version_id) = &req.version_id {
        builder = builder.query(&[("versionId", version_id)]);
    }
    builder.json(&req.legal_hold)
}

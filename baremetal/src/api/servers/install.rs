use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use serde_json::Value;

/// Request message for InstallServer. The partitioning schema is passed
/// through as opaque JSON; the service validates it.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct InstallServerRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
    pub os_id: String,
    pub hostname: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_key_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitioning_schema: Option<Value>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &InstallServerRequest) -> RequestBuilder {
    client
        .post(format!("{base_url}/servers/{}/install", req.server_id))
        .json(req)
}

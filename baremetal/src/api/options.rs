use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use time::OffsetDateTime;

/// Request message for AddServerOption.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct AddOptionRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
    #[serde(skip_serializing)]
    pub option_id: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

pub(crate) fn build_add(base_url: &str, client: &Client, req: &AddOptionRequest) -> RequestBuilder {
    client
        .post(format!(
            "{base_url}/servers/{}/options/{}",
            req.server_id, req.option_id
        ))
        .json(req)
}

/// Request message for DeleteServerOption.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DeleteOptionRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
    #[serde(skip_serializing)]
    pub option_id: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteOptionRequest,
) -> RequestBuilder {
    client.delete(format!(
        "{base_url}/servers/{}/options/{}",
        req.server_id, req.option_id
    ))
}

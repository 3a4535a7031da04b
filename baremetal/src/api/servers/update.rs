use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

/// Request message for UpdateServer. Only metadata can change in place;
/// everything else goes through install or option calls.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct UpdateServerRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &UpdateServerRequest) -> RequestBuilder {
    client
        .patch(format!("{base_url}/servers/{}", req.server_id))
        .json(req)
}

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

/// Request message for CreateServer. Installation is a separate call.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct CreateServerRequest {
    pub offer_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &CreateServerRequest) -> RequestBuilder {
    client.post(format!("{base_url}/servers")).json(req)
}

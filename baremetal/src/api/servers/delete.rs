use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

/// Request message for DeleteServer.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DeleteServerRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &DeleteServerRequest) -> RequestBuilder {
    client.delete(format!("{base_url}/servers/{}", req.server_id))
}

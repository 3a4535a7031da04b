use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

/// Request message for GetServer.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetServerRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &GetServerRequest) -> RequestBuilder {
    client.get(format!("{base_url}/servers/{}", req.server_id))
}

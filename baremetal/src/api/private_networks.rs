use std::collections::HashMap;

use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use time::OffsetDateTime;

/// The attachment state machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Attaching,
    Attached,
    Error,
    Detaching,
    Locked,
    #[serde(other)]
    Unknown,
}

impl AttachmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentStatus::Attaching => "attaching",
            AttachmentStatus::Attached => "attached",
            AttachmentStatus::Error => "error",
            AttachmentStatus::Detaching => "detaching",
            AttachmentStatus::Locked => "locked",
            AttachmentStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttachmentStatus::Attached | AttachmentStatus::Error | AttachmentStatus::Locked
        )
    }
}

/// One server-to-private-network attachment.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct ServerPrivateNetwork {
    pub id: String,
    pub server_id: String,
    pub private_network_id: String,
    pub status: AttachmentStatus,
    #[serde(default)]
    pub vlan: Option<u32>,
    #[serde(default)]
    pub ipam_ip_ids: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Request message for SetServerPrivateNetworks. Replaces the whole set;
/// attachments absent from the map are detached.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct SetServerPrivateNetworksRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
    pub per_private_network_ipam_ip_ids: HashMap<String, Vec<String>>,
}

#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct SetServerPrivateNetworksResponse {
    #[serde(default)]
    pub server_private_networks: Vec<ServerPrivateNetwork>,
}

pub(crate) fn build_set(
    base_url: &str,
    client: &Client,
    req: &SetServerPrivateNetworksRequest,
) -> RequestBuilder {
    client
        .put(format!(
            "{base_url}/servers/{}/private-networks",
            req.server_id
        ))
        .json(req)
}

/// Request message for ListServerPrivateNetworks.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct ListServerPrivateNetworksRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
}

#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct ListServerPrivateNetworksResponse {
    #[serde(default)]
    pub server_private_networks: Vec<ServerPrivateNetwork>,
    #[serde(default)]
    pub total_count: u64,
}

pub(crate) fn build_list(
    base_url: &str,
    client: &Client,
    req: &ListServerPrivateNetworksRequest,
) -> RequestBuilder {
    client.get(format!(
        "{base_url}/servers/{}/private-networks",
        req.server_id
    ))
}

/// Request message for DeleteServerPrivateNetwork.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DeleteServerPrivateNetworkRequest {
    #[serde(skip_serializing)]
    pub server_id: String,
    #[serde(skip_serializing)]
    pub private_network_id: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteServerPrivateNetworkRequest,
) -> RequestBuilder {
    client.delete(format!(
        "{base_url}/servers/{}/private-networks/{}",
        req.server_id, req.private_network_id
    ))
}

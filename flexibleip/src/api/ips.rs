use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use time::OffsetDateTime;

use crate::api::macs::VirtualMac;

/// The flexible IP state machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpStatus {
    Ready,
    Updating,
    Attaching,
    Detaching,
    Error,
    Locked,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl IpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpStatus::Ready => "ready",
            IpStatus::Updating => "updating",
            IpStatus::Attaching => "attaching",
            IpStatus::Detaching => "detaching",
            IpStatus::Error => "error",
            IpStatus::Locked => "locked",
            IpStatus::Deleting => "deleting",
            IpStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IpStatus::Ready | IpStatus::Error | IpStatus::Locked)
    }
}

/// A flexible IP as reported by the service.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct FlexibleIp {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// CIDR notation, `51.15.0.1/32` or `2001:db8::1/64`.
    pub ip_address: String,
    #[serde(default)]
    pub reverse: String,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub mac_address: Option<VirtualMac>,
    pub status: IpStatus,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    pub zone: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Request message for CreateFlexibleIp.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct CreateFlexibleIpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
    pub is_ipv6: bool,
}

pub(crate) fn build_create(
    base_url: &str,
    client: &Client,
    req: &CreateFlexibleIpRequest,
) -> RequestBuilder {
    client.post(format!("{base_url}/fips")).json(req)
}

/// Request message for GetFlexibleIp.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetFlexibleIpRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetFlexibleIpRequest) -> RequestBuilder {
    client.get(format!("{base_url}/fips/{}", req.fip_id))
}

/// Request message for UpdateFlexibleIp. Reverse, tags and description
/// travel in one call.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct UpdateFlexibleIpRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
}

pub(crate) fn build_update(
    base_url: &str,
    client: &Client,
    req: &UpdateFlexibleIpRequest,
) -> RequestBuilder {
    client
        .patch(format!("{base_url}/fips/{}", req.fip_id))
        .json(req)
}

/// Request message for DeleteFlexibleIp.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DeleteFlexibleIpRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteFlexibleIpRequest,
) -> RequestBuilder {
    client.delete(format!("{base_url}/fips/{}", req.fip_id))
}

/// Request message for AttachFlexibleIps.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct AttachFlexibleIpsRequest {
    pub fips_ids: Vec<String>,
    pub server_id: String,
}

pub(crate) fn build_attach(
    base_url: &str,
    client: &Client,
    req: &AttachFlexibleIpsRequest,
) -> RequestBuilder {
    client.post(format!("{base_url}/fips/attach")).json(req)
}

/// Request message for DetachFlexibleIps.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DetachFlexibleIpsRequest {
    pub fips_ids: Vec<String>,
}

pub(crate) fn build_detach(
    base_url: &str,
    client: &Client,
    req: &DetachFlexibleIpsRequest,
) -> RequestBuilder {
    client.post(format!("{base_url}/fips/detach")).json(req)
}

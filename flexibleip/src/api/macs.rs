use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use time::OffsetDateTime;

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacStatus {
    Ready,
    Updating,
    Used,
    Error,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl MacStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MacStatus::Ready => "ready",
            MacStatus::Updating => "updating",
            MacStatus::Used => "used",
            MacStatus::Error => "error",
            MacStatus::Deleting => "deleting",
            MacStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MacStatus::Ready | MacStatus::Used | MacStatus::Error)
    }
}

/// A virtual MAC carried by a flexible IP.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct VirtualMac {
    pub id: String,
    pub mac_address: String,
    /// Hypervisor flavor the MAC is generated for, such as `kvm`.
    pub mac_type: String,
    pub status: MacStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Request message for GenerateVirtualMac.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GenerateVirtualMacRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
    pub mac_type: String,
}

pub(crate) fn build_generate(
    base_url: &str,
    client: &Client,
    req: &GenerateVirtualMacRequest,
) -> RequestBuilder {
    client
        .post(format!("{base_url}/fips/{}/mac", req.fip_id))
        .json(req)
}

/// Request message for DeleteVirtualMac.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DeleteVirtualMacRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteVirtualMacRequest,
) -> RequestBuilder {
    client.delete(format!("{base_url}/fips/{}/mac", req.fip_id))
}

/// Request message for MoveVirtualMac. The MAC leaves the source IP and
/// lands on the destination.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct MoveVirtualMacRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
    pub dst_fip_id: String,
}

pub(crate) fn build_move(
    base_url: &str,
    client: &Client,
    req: &MoveVirtualMacRequest,
) -> RequestBuilder {
    client
        .post(format!("{base_url}/fips/{}/mac/move", req.fip_id))
        .json(req)
}

/// Request message for DuplicateVirtualMac. The source IP keeps its MAC;
/// the destination gets a copy.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DuplicateVirtualMacRequest {
    #[serde(skip_serializing)]
    pub fip_id: String,
    pub duplicate_to_fip_id: String,
}

pub(crate) fn build_duplicate(
    base_url: &str,
    client: &Client,
    req: &DuplicateVirtualMacRequest,
) -> RequestBuilder {
    client
        .post(format!("{base_url}/fips/{}/mac/duplicate", req.fip_id))
        .json(req)
}

use time::OffsetDateTime;

pub mod create;
pub mod delete;
pub mod get;
pub mod install;
pub mod update;

/// The server provisioning state machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Delivering,
    Ready,
    Stopped,
    Error,
    Locked,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Delivering => "delivering",
            ServerStatus::Ready => "ready",
            ServerStatus::Stopped => "stopped",
            ServerStatus::Error => "error",
            ServerStatus::Locked => "locked",
            ServerStatus::Deleting => "deleting",
            ServerStatus::Unknown => "unknown",
        }
    }

    /// Delivery is finished, for better or worse.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ServerStatus::Delivering | ServerStatus::Unknown)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    ToInstall,
    Installing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl InstallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStatus::ToInstall => "to_install",
            InstallStatus::Installing => "installing",
            InstallStatus::Completed => "completed",
            InstallStatus::Error => "error",
            InstallStatus::Unknown => "unknown",
        }
    }
}

/// The installation recorded on a server.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct ServerInstall {
    pub os_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ssh_key_ids: Vec<String>,
    pub status: InstallStatus,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub service_user: Option<String>,
}

/// An option subscribed on a server.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct ServerOption {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpVersion {
    #[serde(rename = "IPv4", alias = "ipv4")]
    V4,
    #[serde(rename = "IPv6", alias = "ipv6")]
    V6,
}

/// A public IP attached to a server.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct ServerIp {
    pub id: String,
    pub address: String,
    pub version: IpVersion,
    #[serde(default)]
    pub reverse: String,
}

/// A server as reported by the service.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub project_id: String,
    pub offer_id: String,
    #[serde(default)]
    pub offer_name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ips: Vec<ServerIp>,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub install: Option<ServerInstall>,
    #[serde(default)]
    pub options: Vec<ServerOption>,
    pub zone: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

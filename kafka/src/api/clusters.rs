use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use time::OffsetDateTime;

/// The cluster state machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Creating,
    Ready,
    Configuring,
    Deleting,
    Error,
    Locked,
    #[serde(other)]
    Unknown,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Creating => "creating",
            ClusterStatus::Ready => "ready",
            ClusterStatus::Configuring => "configuring",
            ClusterStatus::Deleting => "deleting",
            ClusterStatus::Error => "error",
            ClusterStatus::Locked => "locked",
            ClusterStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClusterStatus::Ready | ClusterStatus::Error | ClusterStatus::Locked
        )
    }
}

#[derive(Clone, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
pub struct Volume {
    #[serde(rename = "type")]
    pub volume_type: String,
    pub size_bytes: u64,
}

/// Private-network details of an endpoint.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct EndpointPrivateNetwork {
    pub private_network_id: String,
}

/// Public details of an endpoint. Empty on the wire.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct EndpointPublic {}

/// One endpoint spec sent on create. Exactly one of the two variants is
/// populated.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct EndpointSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network: Option<EndpointPrivateNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<EndpointPublic>,
}

/// An endpoint as reported by the service.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub dns_records: Vec<String>,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub private_network: Option<EndpointPrivateNetwork>,
    #[serde(default)]
    pub public: Option<EndpointPublic>,
}

/// A managed Kafka cluster.
#[derive(Clone, PartialEq, Debug, serde::Deserialize, serde::Serialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub status: ClusterStatus,
    pub version: String,
    pub node_amount: u32,
    pub node_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    pub region: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Request message for CreateCluster.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct CreateClusterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub name: String,
    pub version: String,
    pub node_amount: u32,
    pub node_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub volume: Option<Volume>,
    pub endpoints: Vec<EndpointSpec>,
}

pub(crate) fn build_create(
    base_url: &str,
    client: &Client,
    req: &CreateClusterRequest,
) -> RequestBuilder {
    client.post(format!("{base_url}/clusters")).json(req)
}

/// Request message for GetCluster.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetClusterRequest {
    #[serde(skip_serializing)]
    pub cluster_id: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetClusterRequest) -> RequestBuilder {
    client.get(format!("{base_url}/clusters/{}", req.cluster_id))
}

/// Request message for UpdateCluster. Only name and tags are mutable.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct UpdateClusterRequest {
    #[serde(skip_serializing)]
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

pub(crate) fn build_update(
    base_url: &str,
    client: &Client,
    req: &UpdateClusterRequest,
) -> RequestBuilder {
    client
        .patch(format!("{base_url}/clusters/{}", req.cluster_id))
        .json(req)
}

/// Request message for DeleteCluster.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct DeleteClusterRequest {
    #[serde(skip_serializing)]
    pub cluster_id: String,
}

pub(crate) fn build_delete(
    base_url: &str,
    client: &Client,
    req: &DeleteClusterRequest,
) -> RequestBuilder {
    client.delete(format!("{base_url}/clusters/{}", req.cluster_id))
}

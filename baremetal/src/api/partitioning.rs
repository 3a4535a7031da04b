use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use serde_json::Value;

/// One partition on a disk. Numbers are contiguous per disk, starting at 1.
#[derive(Clone, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
pub struct SchemaPartition {
    pub label: String,
    pub number: u32,
    pub size: u64,
    #[serde(default)]
    pub use_all_available_space: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
pub struct SchemaDisk {
    pub device: String,
    pub partitions: Vec<SchemaPartition>,
}

#[derive(Clone, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
pub struct SchemaRaid {
    pub name: String,
    pub level: String,
    pub devices: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, serde::Deserialize, serde::Serialize)]
pub struct SchemaFilesystem {
    pub device: String,
    pub format: String,
    pub mountpoint: String,
}

/// A full partitioning schema as produced by the catalog and consumed by
/// the install call.
#[derive(Clone, PartialEq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct PartitionSchema {
    #[serde(default)]
    pub disks: Vec<SchemaDisk>,
    #[serde(default)]
    pub raids: Vec<SchemaRaid>,
    #[serde(default)]
    pub filesystems: Vec<SchemaFilesystem>,
    /// ZFS pools are passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zfs: Option<Value>,
}

/// Request message for GetDefaultPartitioningSchema.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetDefaultPartitioningSchemaRequest {
    pub offer_id: String,
    pub os_id: String,
}

pub(crate) fn build_default(
    base_url: &str,
    client: &Client,
    req: &GetDefaultPartitioningSchemaRequest,
) -> RequestBuilder {
    client
        .get(format!("{base_url}/partitioning-schemas/default"))
        .query(&[("offer_id", &req.offer_id), ("os_id", &req.os_id)])
}

/// Request message for ValidatePartitioningSchema.
#[derive(Clone, PartialEq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct ValidatePartitioningSchemaRequest {
    pub offer_id: String,
    pub os_id: String,
    pub partitioning_schema: PartitionSchema,
}

pub(crate) fn build_validate(
    base_url: &str,
    client: &Client,
    req: &ValidatePartitioningSchemaRequest,
) -> RequestBuilder {
    client
        .post(format!("{base_url}/partitioning-schemas/validate"))
        .json(req)
}

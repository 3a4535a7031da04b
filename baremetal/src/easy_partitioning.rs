//! The easy-partitioning data source.
//!
//! Starts from the catalog's default two-disk NVMe layout for an
//! (offer, OS) pair and applies three knobs: drop the swap partitions, add
//! an extra ext4 partition, and pick its mountpoint. The transformed schema
//! is validated by the catalog before it is emitted, so a server install
//! can consume `json_partition` verbatim.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_locality::Zone;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, ResourceData, ResourceHandler, Schema, Timeouts,
    Validator,
};
use serde_json::json;

use crate::api::client::{BaremetalClient, ClientConfig};
use crate::api::offers::GetOfferRequest;
use crate::api::os::GetOsRequest;
use crate::api::partitioning::{
    GetDefaultPartitioningSchemaRequest, PartitionSchema, SchemaFilesystem, SchemaPartition,
    SchemaRaid, ValidatePartitioningSchemaRequest,
};

const MOUNTPOINTS: &[&str] = &["/data", "/home"];

const LABEL_UEFI: &str = "uefi";
const LABEL_SWAP: &str = "swap";
const LABEL_ROOT: &str = "root";

const RAID_LEVEL_1: &str = "raid_level_1";
const EXT4: &str = "ext4";

/// Fixed root size when an extra partition takes the remaining space.
const ROOT_SIZE: u64 = 20_000_000_000;

pub struct EasyPartitioningDataSource {
    config: ClientConfig,
}

impl EasyPartitioningDataSource {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    async fn generate(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let zone = data
            .get_string("zone")
            .ok_or_else(|| Diagnostic::error("zone is not configured").with_attribute("zone"))?;
        let zone = Zone::from_str(&zone)?;
        let client = BaremetalClient::new(&self.config, &zone);

        let offer_id = data
            .get_string("offer_id")
            .map(|v| scw_locality::id::strip(&v).to_string())
            .ok_or_else(|| Diagnostic::error("offer_id is required").with_attribute("offer_id"))?;
        let os_id = data
            .get_string("os_id")
            .map(|v| scw_locality::id::strip(&v).to_string())
            .ok_or_else(|| Diagnostic::error("os_id is required").with_attribute("os_id"))?;

        let os = client
            .get_os(&GetOsRequest { os_id: os_id.clone() }, ctx.cancel.clone())
            .await?;
        if !os.custom_partitioning_supported {
            return Err(Diagnostic::error(format!(
                "os {} {} does not support custom partitioning",
                os.name, os.version
            ))
            .with_attribute("os_id"));
        }
        let offer = client
            .get_offer(
                &GetOfferRequest {
                    offer_id: offer_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await?;
        if offer.incompatible_os_ids.contains(&os_id) {
            return Err(Diagnostic::error(format!(
                "os {} {} is not compatible with offer {}",
                os.name, os.version, offer.name
            ))
            .with_attribute("os_id"));
        }

        let default_schema = client
            .get_default_partitioning_schema(
                &GetDefaultPartitioningSchemaRequest {
                    offer_id: offer_id.clone(),
                    os_id: os_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await?;

        let swap = data.get_bool("swap", true);
        let extra_partition = data.get_bool("extra_partition", true);
        let mountpoint = data
            .get_string("ext_4_mountpoint")
            .unwrap_or_else(|| "/data".to_string());
        let schema = customize_schema(default_schema, swap, extra_partition, &mountpoint);

        client
            .validate_partitioning_schema(
                &ValidatePartitioningSchemaRequest {
                    offer_id: offer_id.clone(),
                    os_id: os_id.clone(),
                    partitioning_schema: schema.clone(),
                },
                ctx.cancel.clone(),
            )
            .await?;

        let rendered = serde_json::to_string(&schema)
            .map_err(|e| Diagnostic::error(format!("could not serialize schema: {e}")))?;
        data.set("json_partition", rendered);
        data.set("zone", zone.as_str());
        data.set_id(format!("{offer_id}-{os_id}"));
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for EasyPartitioningDataSource {
    fn schema(&self) -> Schema {
        Schema {
            resource: "baremetal_easy_partitioning",
            attributes: vec![
                Attribute::string("offer_id").required().force_new(),
                Attribute::string("os_id").required().force_new(),
                Attribute::bool("swap").optional().default_value(json!(true)),
                Attribute::bool("extra_partition")
                    .optional()
                    .default_value(json!(true)),
                Attribute::string("ext_4_mountpoint")
                    .optional()
                    .default_value(json!("/data"))
                    .validator(Validator::OneOf(MOUNTPOINTS)),
                Attribute::string("json_partition").computed(),
                Attribute::string("zone").optional().computed().force_new(),
            ],
            timeouts: Timeouts::uniform(Duration::from_secs(5 * 60)),
        }
    }

    // Data sources only read; create and update refresh the same way.
    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        match self.generate(ctx, data).await {
            Ok(()) => Diagnostics::new(),
            Err(d) => d.into(),
        }
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        self.read(ctx, data).await
    }

    async fn delete(&self, _ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        data.clear_id();
        Diagnostics::new()
    }
}

/// Applies the three knobs to the catalog's default schema.
pub fn customize_schema(
    mut schema: PartitionSchema,
    swap: bool,
    extra_partition: bool,
    mountpoint: &str,
) -> PartitionSchema {
    if !swap {
        remove_swap(&mut schema);
    }
    if extra_partition {
        add_extra_partition(&mut schema, mountpoint);
    }
    if !swap || extra_partition {
        resize_root(&mut schema, extra_partition);
    }
    schema
}

/// Drops the swap partitions and renumbers what follows them, then rewrites
/// the RAID entries for the shifted device names. The first disk keeps its
/// UEFI partition, so its members sit one partition higher than the second
/// disk's.
fn remove_swap(schema: &mut PartitionSchema) {
    for disk in &mut schema.disks {
        disk.partitions.retain(|p| p.label != LABEL_SWAP);
        for partition in &mut disk.partitions {
            if partition.label != LABEL_UEFI {
                partition.number -= 1;
            }
        }
    }
    schema.raids = vec![
        SchemaRaid {
            name: "/dev/md0".to_string(),
            level: RAID_LEVEL_1.to_string(),
            devices: vec![
                "/dev/nvme0n1p2".to_string(),
                "/dev/nvme1n1p1".to_string(),
            ],
        },
        SchemaRaid {
            name: "/dev/md1".to_string(),
            level: RAID_LEVEL_1.to_string(),
            devices: vec![
                "/dev/nvme0n1p3".to_string(),
                "/dev/nvme1n1p2".to_string(),
            ],
        },
    ];
}

/// Appends one partition per disk taking the remaining space, a RAID-1 over
/// them and an ext4 filesystem at `mountpoint`.
fn add_extra_partition(schema: &mut PartitionSchema, mountpoint: &str) {
    let label = mountpoint.trim_start_matches('/').to_string();
    let mut devices = Vec::new();
    for disk in &mut schema.disks {
        let number = disk.partitions.len() as u32 + 1;
        disk.partitions.push(SchemaPartition {
            label: label.clone(),
            number,
            size: 0,
            use_all_available_space: true,
        });
        devices.push(format!("{}p{}", disk.device, disk.partitions.len()));
    }
    schema.raids.push(SchemaRaid {
        name: "/dev/md2".to_string(),
        level: RAID_LEVEL_1.to_string(),
        devices,
    });
    schema.filesystems.push(SchemaFilesystem {
        device: "/dev/md2".to_string(),
        format: EXT4.to_string(),
        mountpoint: mountpoint.to_string(),
    });
}

/// Root either takes the remaining space or a fixed size when the extra
/// partition claims the rest.
fn resize_root(schema: &mut PartitionSchema, extra_partition: bool) {
    for disk in &mut schema.disks {
        for partition in &mut disk.partitions {
            if partition.label == LABEL_ROOT {
                if extra_partition {
                    partition.size = ROOT_SIZE;
                    partition.use_all_available_space = false;
                } else {
                    partition.size = 0;
                    partition.use_all_available_space = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::partitioning::SchemaDisk;

    /// The default layout the catalog hands back for a two-NVMe offer.
    fn default_schema() -> PartitionSchema {
        let partition = |label: &str, number: u32, size: u64| SchemaPartition {
            label: label.to_string(),
            number,
            size,
            use_all_available_space: false,
        };
        PartitionSchema {
            disks: vec![
                SchemaDisk {
                    device: "/dev/nvme0n1".to_string(),
                    partitions: vec![
                        partition(LABEL_UEFI, 1, 536_870_912),
                        partition(LABEL_SWAP, 2, 4_294_967_296),
                        partition("boot", 3, 1_073_741_824),
                        partition(LABEL_ROOT, 4, 959_656_755_200),
                    ],
                },
                SchemaDisk {
                    device: "/dev/nvme1n1".to_string(),
                    partitions: vec![
                        partition(LABEL_SWAP, 1, 4_294_967_296),
                        partition("boot", 2, 1_073_741_824),
                        partition(LABEL_ROOT, 3, 959_656_755_200),
                    ],
                },
            ],
            raids: vec![
                SchemaRaid {
                    name: "/dev/md0".to_string(),
                    level: RAID_LEVEL_1.to_string(),
                    devices: vec![
                        "/dev/nvme0n1p3".to_string(),
                        "/dev/nvme1n1p2".to_string(),
                    ],
                },
                SchemaRaid {
                    name: "/dev/md1".to_string(),
                    level: RAID_LEVEL_1.to_string(),
                    devices: vec![
                        "/dev/nvme0n1p4".to_string(),
                        "/dev/nvme1n1p3".to_string(),
                    ],
                },
            ],
            filesystems: vec![
                SchemaFilesystem {
                    device: "/dev/md1".to_string(),
                    format: EXT4.to_string(),
                    mountpoint: "/".to_string(),
                },
            ],
            zfs: None,
        }
    }

    fn assert_contiguous_numbering(schema: &PartitionSchema) {
        for disk in &schema.disks {
            let mut numbers: Vec<u32> = disk.partitions.iter().map(|p| p.number).collect();
            numbers.sort_unstable();
            let expected: Vec<u32> = (1..=disk.partitions.len() as u32).collect();
            assert_eq!(numbers, expected, "disk {}", disk.device);
        }
    }

    fn assert_raids_reference_existing_partitions(schema: &PartitionSchema) {
        let devices: Vec<String> = schema
            .disks
            .iter()
            .flat_map(|disk| {
                disk.partitions
                    .iter()
                    .map(move |p| format!("{}p{}", disk.device, p.number))
            })
            .collect();
        for raid in &schema.raids {
            for device in &raid.devices {
                assert!(devices.contains(device), "{} missing for {}", device, raid.name);
            }
        }
    }

    #[test]
    fn every_knob_combination_stays_well_formed() {
        for swap in [true, false] {
            for extra in [true, false] {
                for mountpoint in MOUNTPOINTS {
                    let schema = customize_schema(default_schema(), swap, extra, mountpoint);
                    assert_contiguous_numbering(&schema);
                    assert_raids_reference_existing_partitions(&schema);
                    let has_swap = schema
                        .disks
                        .iter()
                        .any(|d| d.partitions.iter().any(|p| p.label == LABEL_SWAP));
                    assert_eq!(has_swap, swap);
                }
            }
        }
    }

    #[test]
    fn swap_off_with_extra_data_partition() {
        let schema = customize_schema(default_schema(), false, true, "/data");

        let disk0 = &schema.disks[0];
        let labels: Vec<&str> = disk0.partitions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, [LABEL_UEFI, "boot", LABEL_ROOT, "data"]);

        let root = disk0.partitions.iter().find(|p| p.label == LABEL_ROOT).unwrap();
        assert_eq!(root.size, ROOT_SIZE);
        assert!(!root.use_all_available_space);

        let data = disk0.partitions.iter().find(|p| p.label == "data").unwrap();
        assert_eq!(data.size, 0);
        assert!(data.use_all_available_space);

        let md2 = schema.raids.iter().find(|r| r.name == "/dev/md2").unwrap();
        assert_eq!(md2.devices, ["/dev/nvme0n1p4", "/dev/nvme1n1p3"]);
        assert_eq!(md2.level, RAID_LEVEL_1);

        let fs = schema
            .filesystems
            .iter()
            .find(|f| f.device == "/dev/md2")
            .unwrap();
        assert_eq!(fs.format, EXT4);
        assert_eq!(fs.mountpoint, "/data");
    }

    #[test]
    fn swap_off_without_extra_gives_root_the_rest() {
        let schema = customize_schema(default_schema(), false, false, "/data");
        let root = schema.disks[0]
            .partitions
            .iter()
            .find(|p| p.label == LABEL_ROOT)
            .unwrap();
        assert_eq!(root.size, 0);
        assert!(root.use_all_available_space);
        assert!(schema.raids.iter().all(|r| r.name != "/dev/md2"));
        assert_eq!(
            schema.raids[0].devices,
            ["/dev/nvme0n1p2", "/dev/nvme1n1p1"]
        );
    }

    #[test]
    fn defaults_leave_the_catalog_schema_mostly_alone() {
        // swap on + extra partition is the default knob position
        let schema = customize_schema(default_schema(), true, true, "/home");
        let disk0 = &schema.disks[0];
        assert_eq!(disk0.partitions.len(), 5);
        assert_eq!(disk0.partitions[4].label, "home");
        assert_eq!(disk0.partitions[4].number, 5);
        let md2 = schema.raids.iter().find(|r| r.name == "/dev/md2").unwrap();
        assert_eq!(md2.devices, ["/dev/nvme0n1p5", "/dev/nvme1n1p4"]);
        let root = disk0.partitions.iter().find(|p| p.label == LABEL_ROOT).unwrap();
        assert_eq!(root.size, ROOT_SIZE);
    }
}

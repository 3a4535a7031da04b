//! The flexible IP resource handler.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_gax::wait::{wait_for, wait_for_or_gone, WaitConfig, WaitDecision, WaitError};
use scw_gax::CancellationToken;
use scw_locality::Zone;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, ResourceData, ResourceHandler, Schema, Timeouts,
    Validator,
};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;

use crate::api::client::{ClientConfig, FlexibleIpClient};
use crate::api::ips::{
    AttachFlexibleIpsRequest, CreateFlexibleIpRequest, DeleteFlexibleIpRequest,
    DetachFlexibleIpsRequest, FlexibleIp, GetFlexibleIpRequest, UpdateFlexibleIpRequest,
};
use crate::api::macs::{DeleteVirtualMacRequest, GenerateVirtualMacRequest};

const MAC_TYPES: &[&str] = &["kvm", "xen", "vmware"];

const READY_TIMEOUT: Duration = Duration::from_secs(60);

pub struct FlexibleIpHandler {
    config: ClientConfig,
}

/// What the server attachment has to do after a `server_id` change.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ServerTransition {
    None,
    Detach,
    Attach(String),
}

pub(crate) fn server_transition(data: &ResourceData) -> ServerTransition {
    if !data.has_change("server_id") {
        return ServerTransition::None;
    }
    match data.get_string("server_id").filter(|s| !s.is_empty()) {
        Some(server_id) => {
            ServerTransition::Attach(scw_locality::id::strip(&server_id).to_string())
        }
        None => ServerTransition::Detach,
    }
}

impl FlexibleIpHandler {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, data: &ResourceData) -> Result<(Zone, String), Diagnostic> {
        let id = data
            .id()
            .ok_or_else(|| Diagnostic::error("flexible IP has no recorded identifier"))?;
        let (zone, fip_id) = scw_locality::id::parse_zoned(id)?;
        Ok((zone, fip_id))
    }

    async fn do_create(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let zone = data
            .get_string("zone")
            .ok_or_else(|| Diagnostic::error("zone is not configured").with_attribute("zone"))?;
        let zone = Zone::from_str(&zone)?;
        let client = FlexibleIpClient::new(&self.config, &zone);

        let req = CreateFlexibleIpRequest {
            project_id: data
                .get_string("project_id")
                .or_else(|| self.config.default_project_id.clone()),
            description: data.get_string("description").unwrap_or_default(),
            tags: string_list(data.get("tags")),
            server_id: data
                .get_string("server_id")
                .filter(|s| !s.is_empty())
                .map(|s| scw_locality::id::strip(&s).to_string()),
            reverse: data.get_string("reverse").filter(|r| !r.is_empty()),
            is_ipv6: data.get_bool("is_ipv6", false),
        };
        let fip = client.create_flexible_ip(&req, ctx.cancel.clone()).await?;
        data.set_id(scw_locality::id::zoned(&zone, &fip.id));
        wait_ready(&client, &fip.id, ctx.cancel.clone()).await?;

        if let Some(mac_type) = desired_mac_type(data) {
            let req = GenerateVirtualMacRequest {
                fip_id: fip.id.clone(),
                mac_type,
            };
            client.generate_virtual_mac(&req, ctx.cancel.clone()).await?;
            wait_ready(&client, &fip.id, ctx.cancel.clone()).await?;
        }
        Ok(())
    }

    async fn do_update(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let (zone, fip_id) = self.resolve(data)?;
        let client = FlexibleIpClient::new(&self.config, &zone);

        if data.any_change(&["description", "tags", "reverse"]) {
            let req = UpdateFlexibleIpRequest {
                fip_id: fip_id.clone(),
                description: data.get_string("description"),
                tags: data.get("tags").map(|v| string_list(Some(v))),
                reverse: data.get_string("reverse"),
            };
            client.update_flexible_ip(&req, ctx.cancel.clone()).await?;
            wait_ready(&client, &fip_id, ctx.cancel.clone()).await?;
        }

        match server_transition(data) {
            ServerTransition::None => {}
            ServerTransition::Detach => {
                let req = DetachFlexibleIpsRequest {
                    fips_ids: vec![fip_id.clone()],
                };
                client.detach_flexible_ips(&req, ctx.cancel.clone()).await?;
                wait_ready(&client, &fip_id, ctx.cancel.clone()).await?;
            }
            ServerTransition::Attach(server_id) => {
                let req = AttachFlexibleIpsRequest {
                    fips_ids: vec![fip_id.clone()],
                    server_id,
                };
                client.attach_flexible_ips(&req, ctx.cancel.clone()).await?;
                wait_ready(&client, &fip_id, ctx.cancel.clone()).await?;
            }
        }

        if data.has_change("virtual_mac") {
            match desired_mac_type(data) {
                Some(mac_type) => {
                    let req = GenerateVirtualMacRequest {
                        fip_id: fip_id.clone(),
                        mac_type,
                    };
                    client.generate_virtual_mac(&req, ctx.cancel.clone()).await?;
                }
                None => {
                    let req = DeleteVirtualMacRequest {
                        fip_id: fip_id.clone(),
                    };
                    match client.delete_virtual_mac(&req, ctx.cancel.clone()).await {
                        Ok(()) => {}
                        Err(e) if e.is_not_found() => {}
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            wait_ready(&client, &fip_id, ctx.cancel.clone()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for FlexibleIpHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "flexible_ip",
            attributes: vec![
                Attribute::string("description").optional(),
                Attribute::bool("is_ipv6")
                    .optional()
                    .force_new()
                    .default_value(json!(false)),
                Attribute::string("reverse").optional().computed(),
                Attribute::string("server_id")
                    .optional()
                    .suppress(scw_schema::suppress::locality_stripped),
                Attribute::list("tags").optional(),
                Attribute::block(
                    "virtual_mac",
                    vec![
                        Attribute::string("type")
                            .optional()
                            .default_value(json!("kvm"))
                            .validator(Validator::OneOf(MAC_TYPES)),
                        Attribute::string("address").computed(),
                        Attribute::string("status").computed(),
                    ],
                ),
                Attribute::string("ip_address").computed(),
                Attribute::string("status").computed(),
                Attribute::string("created_at").computed(),
                Attribute::string("updated_at").computed(),
                Attribute::string("organization_id").computed(),
                Attribute::string("project_id")
                    .optional()
                    .computed()
                    .force_new(),
                Attribute::string("zone").optional().computed().force_new(),
            ],
            timeouts: Timeouts::uniform(READY_TIMEOUT),
        }
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if let Err(d) = self.do_create(ctx, data).await {
            return d.into();
        }
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (zone, fip_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = FlexibleIpClient::new(&self.config, &zone);
        let fip = match client
            .get_flexible_ip(
                &GetFlexibleIpRequest {
                    fip_id: fip_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(fip) => fip,
            Err(e) if e.is_not_found() => {
                tracing::warn!(fip_id, "flexible IP is gone, removing it from state");
                data.clear_id();
                return Diagnostics::new();
            }
            Err(e) => return Diagnostics::from_error(e),
        };

        data.set("description", &fip.description);
        data.set("tags", &fip.tags);
        data.set("ip_address", &fip.ip_address);
        data.set("reverse", &fip.reverse);
        data.set("is_ipv6", fip.ip_address.contains(':'));
        data.set("status", fip.status.as_str());
        data.set("organization_id", &fip.organization_id);
        data.set("project_id", &fip.project_id);
        data.set("zone", zone.as_str());
        match &fip.server_id {
            Some(server_id) => data.set("server_id", scw_locality::id::zoned(&zone, server_id)),
            None => data.set("server_id", Value::Null),
        }
        data.set("virtual_mac", flatten_virtual_mac(&fip));
        if let Some(t) = fip.created_at.and_then(|t| t.format(&Rfc3339).ok()) {
            data.set("created_at", t);
        }
        if let Some(t) = fip.updated_at.and_then(|t| t.format(&Rfc3339).ok()) {
            data.set("updated_at", t);
        }
        Diagnostics::new()
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if let Err(d) = self.do_update(ctx, data).await {
            return d.into();
        }
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (zone, fip_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = FlexibleIpClient::new(&self.config, &zone);
        match client
            .delete_flexible_ip(
                &DeleteFlexibleIpRequest {
                    fip_id: fip_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() || e.is_forbidden() => {}
            Err(e) => return Diagnostics::from_error(e),
        }

        let config = WaitConfig::with_timeout(READY_TIMEOUT);
        let gone = wait_for_or_gone(
            ctx.cancel.as_ref(),
            config,
            crate::api::Error::is_not_found,
            || async {
                let fip = client
                    .get_flexible_ip(
                        &GetFlexibleIpRequest {
                            fip_id: fip_id.clone(),
                        },
                        None,
                    )
                    .await?;
                Ok(WaitDecision::<()>::Pending(fip.status.as_str().to_string()))
            },
        )
        .await;
        if let Err(e) = gone {
            return Diagnostics::from_error(e);
        }
        data.clear_id();
        Diagnostics::new()
    }
}

fn desired_mac_type(data: &ResourceData) -> Option<String> {
    let block = match data.get("virtual_mac") {
        Some(Value::Array(items)) => items.first()?,
        Some(block @ Value::Object(_)) => block,
        _ => return None,
    };
    Some(
        block
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("kvm")
            .to_string(),
    )
}

fn flatten_virtual_mac(fip: &FlexibleIp) -> Value {
    match &fip.mac_address {
        Some(mac) => json!([{
            "type": mac.mac_type,
            "address": mac.mac_address,
            "status": mac.status.as_str(),
        }]),
        None => json!([]),
    }
}

async fn wait_ready(
    client: &FlexibleIpClient,
    fip_id: &str,
    cancel: Option<CancellationToken>,
) -> Result<FlexibleIp, Diagnostic> {
    let config = WaitConfig::with_timeout(READY_TIMEOUT);
    let fip = wait_for(cancel.as_ref(), config, || async {
        let fip = client
            .get_flexible_ip(
                &GetFlexibleIpRequest {
                    fip_id: fip_id.to_string(),
                },
                None,
            )
            .await?;
        Ok(if fip.status.is_terminal() {
            WaitDecision::Done(fip)
        } else {
            WaitDecision::Pending(fip.status.as_str().to_string())
        })
    })
    .await
    .map_err(|e: WaitError<crate::api::Error>| Diagnostic::error(e.to_string()))?;
    if fip.status == crate::api::ips::IpStatus::Error {
        return Err(Diagnostic::error(format!(
            "flexible IP {fip_id} entered error state"
        )));
    }
    Ok(fip)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::api::macs::{MacStatus, VirtualMac};

    #[ctor::ctor]
    fn init() {
        let _ = tracing_subscriber::fmt().try_init();
    }

    #[test]
    fn server_transitions() {
        let unchanged = ResourceData::new(
            None,
            json!({"server_id": "srv-1"}),
            json!({"server_id": "srv-1"}),
        );
        assert_eq!(server_transition(&unchanged), ServerTransition::None);

        let detach = ResourceData::new(
            None,
            json!({"server_id": "srv-1"}),
            json!({"server_id": ""}),
        );
        assert_eq!(server_transition(&detach), ServerTransition::Detach);

        let attach = ResourceData::new(
            None,
            json!({"server_id": "srv-1"}),
            json!({"server_id": "fr-par-1/srv-2"}),
        );
        assert_eq!(
            server_transition(&attach),
            ServerTransition::Attach("srv-2".to_string())
        );
    }

    #[test]
    fn virtual_mac_block_defaults_to_kvm() {
        let none = ResourceData::from_config(json!({}));
        assert_eq!(desired_mac_type(&none), None);

        let explicit = ResourceData::from_config(json!({
            "virtual_mac": [{"type": "vmware"}],
        }));
        assert_eq!(desired_mac_type(&explicit).as_deref(), Some("vmware"));

        let defaulted = ResourceData::from_config(json!({"virtual_mac": [{}]}));
        assert_eq!(desired_mac_type(&defaulted).as_deref(), Some("kvm"));
    }

    #[test]
    fn mac_flattening() {
        let fip = FlexibleIp {
            id: "fip-1".to_string(),
            description: String::new(),
            tags: Vec::new(),
            ip_address: "51.15.0.1/32".to_string(),
            reverse: String::new(),
            server_id: None,
            mac_address: Some(VirtualMac {
                id: "mac-1".to_string(),
                mac_address: "02:00:00:aa:bb:cc".to_string(),
                mac_type: "kvm".to_string(),
                status: MacStatus::Ready,
                created_at: None,
                updated_at: None,
            }),
            status: crate::api::ips::IpStatus::Ready,
            project_id: String::new(),
            organization_id: String::new(),
            zone: "fr-par-1".to_string(),
            created_at: None,
            updated_at: None,
        };
        let flattened = flatten_virtual_mac(&fip);
        assert_eq!(flattened[0]["address"], "02:00:00:aa:bb:cc");
        assert_eq!(flattened[0]["type"], "kvm");
        assert_eq!(flattened[0]["status"], "ready");
    }

    fn live_config() -> ClientConfig {
        ClientConfig {
            secret_key: std::env::var("SCW_SECRET_KEY").unwrap(),
            default_project_id: std::env::var("SCW_DEFAULT_PROJECT_ID").ok(),
            ..Default::default()
        }
    }

    // Needs live credentials; run with --ignored.
    #[tokio::test(flavor = "multi_thread")]
    #[serial_test::serial]
    #[ignore]
    async fn create_update_and_delete_round_trip() {
        let handler = FlexibleIpHandler::new(live_config());
        let ctx = Context::background();

        let config = json!({
            "zone": "fr-par-2",
            "description": "handler test ip",
            "tags": ["test"],
        });
        let mut data = ResourceData::from_config(config.clone());
        let diags = handler.create(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        assert!(data.get_string("ip_address").is_some());

        let mut updated = config;
        updated["description"] = json!("renamed");
        let mut data = ResourceData::new(
            data.id().map(str::to_string),
            data.state(),
            updated,
        );
        let diags = handler.update(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        assert_eq!(data.get_string("description").as_deref(), Some("renamed"));

        let diags = handler.delete(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        assert!(data.id().is_none());
    }
}

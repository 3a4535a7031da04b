//! The bare-metal server handler.
//!
//! A server is created in two phases: delivery of the machine, then an
//! installation call. Options and private networks are reconciled
//! separately, so Update never rebuilds the machine unless the plan forced
//! a replacement.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use scw_gax::wait::{wait_for, wait_for_or_gone, WaitConfig, WaitDecision, WaitError};
use scw_gax::CancellationToken;
use scw_locality::Zone;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, PlanError, ResourceData, ResourceDiff,
    ResourceHandler, Schema, Timeouts,
};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::api::client::{BaremetalClient, ClientConfig};
use crate::api::offers::{GetOfferRequest, ListOffersRequest, Offer, SubscriptionPeriod};
use crate::api::options::{AddOptionRequest, DeleteOptionRequest};
use crate::api::os::{GetOsRequest, Os};
use crate::api::private_networks::{
    AttachmentStatus, DeleteServerPrivateNetworkRequest, ListServerPrivateNetworksRequest,
    ServerPrivateNetwork, SetServerPrivateNetworksRequest,
};
use crate::api::servers::create::CreateServerRequest;
use crate::api::servers::delete::DeleteServerRequest;
use crate::api::servers::get::GetServerRequest;
use crate::api::servers::install::InstallServerRequest;
use crate::api::servers::update::UpdateServerRequest;
use crate::api::servers::{InstallStatus, IpVersion, Server, ServerOption, ServerStatus};

/// The catalog option that enables private-network attachment.
pub const OPTION_ID_PRIVATE_NETWORK: &str = "cd4158d7-2d65-49be-8803-c4b8ab6f760c";

const CREATE_TIMEOUT: Duration = Duration::from_secs(80 * 60);

pub struct ServerHandler {
    config: ClientConfig,
}

impl ServerHandler {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, data: &ResourceData) -> Result<(Zone, String), Diagnostic> {
        let id = data
            .id()
            .ok_or_else(|| Diagnostic::error("server has no recorded identifier"))?;
        let (zone, server_id) = scw_locality::id::parse_zoned(id)?;
        Ok((zone, server_id))
    }

    fn zone(&self, data: &ResourceData) -> Result<Zone, Diagnostic> {
        if let Some(id) = data.id() {
            let (zone, _) = scw_locality::id::parse_zoned(id)?;
            return Ok(zone);
        }
        let zone = data
            .get_string("zone")
            .ok_or_else(|| Diagnostic::error("zone is not configured").with_attribute("zone"))?;
        Ok(Zone::from_str(&zone)?)
    }

    async fn do_create(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostics> {
        let zone = self.zone(data).map_err(Diagnostics::from)?;
        let client = BaremetalClient::new(&self.config, &zone);

        let offer_ref = data
            .get_string("offer")
            .ok_or_else(|| Diagnostic::error("offer is required").with_attribute("offer"))
            .map_err(Diagnostics::from)?;
        let offer = resolve_offer(&client, &zone, &offer_ref, ctx.cancel.clone())
            .await
            .map_err(Diagnostics::from)?;

        let name = match data.get_string("name").filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => generate_name(),
        };
        let req = CreateServerRequest {
            offer_id: offer.id.clone(),
            name: name.clone(),
            project_id: data
                .get_string("project_id")
                .or_else(|| self.config.default_project_id.clone()),
            description: data.get_string("description").unwrap_or_default(),
            tags: string_list(data.get("tags")),
        };
        let server = client
            .create_server(&req, ctx.cancel.clone())
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        data.set_id(scw_locality::id::zoned(&zone, &server.id));
        data.set("name", &name);

        let server = wait_for_server(&client, &server.id, CREATE_TIMEOUT, ctx.cancel.clone())
            .await
            .map_err(Diagnostics::from)?;
        if server.status == ServerStatus::Error {
            return Err(Diagnostics::from(Diagnostic::error(format!(
                "server {} was delivered in error state",
                server.id
            ))));
        }

        if !data.get_bool("install_config_afterward", false) {
            self.install(&client, ctx, data, &server.id).await?;
        }

        for option in desired_options(data).map_err(Diagnostics::from)? {
            let req = AddOptionRequest {
                server_id: server.id.clone(),
                option_id: option.id.clone(),
                expires_at: option.expires_at,
            };
            client
                .add_option(&req, ctx.cancel.clone())
                .await
                .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        }

        let networks = desired_private_networks(data);
        if !networks.is_empty() {
            self.set_private_networks(&client, ctx, &server.id, networks)
                .await?;
        }
        Ok(())
    }

    /// Validates the install credentials against the OS requirements, then
    /// installs and waits for completion.
    async fn install(
        &self,
        client: &BaremetalClient,
        ctx: &Context,
        data: &ResourceData,
        server_id: &str,
    ) -> Result<(), Diagnostics> {
        let os_ref = data
            .get_string("os")
            .ok_or_else(|| Diagnostics::from(Diagnostic::error("os is required").with_attribute("os")))?;
        let os_id = scw_locality::id::strip(&os_ref).to_string();
        let os = client
            .get_os(&GetOsRequest { os_id: os_id.clone() }, ctx.cancel.clone())
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;

        let problems = validate_install_config(&os, data);
        if problems.has_error() {
            return Err(problems);
        }

        let hostname = data
            .get_string("hostname")
            .filter(|h| !h.is_empty())
            .or_else(|| data.get_string("name"))
            .unwrap_or_default();
        let partitioning_schema = match data.get_string("partitioning").filter(|p| !p.is_empty()) {
            Some(raw) => Some(serde_json::from_str::<Value>(&raw).map_err(|e| {
                Diagnostics::from(
                    Diagnostic::error(format!("partitioning is not valid JSON: {e}"))
                        .with_attribute("partitioning"),
                )
            })?),
            None => None,
        };
        let req = InstallServerRequest {
            server_id: server_id.to_string(),
            os_id,
            hostname,
            ssh_key_ids: string_list(data.get("ssh_key_ids"))
                .iter()
                .map(|k| scw_locality::id::strip(k).to_string())
                .collect(),
            user: data.get_string("user").filter(|v| !v.is_empty()),
            password: data.get_string("password").filter(|v| !v.is_empty()),
            service_user: data.get_string("service_user").filter(|v| !v.is_empty()),
            service_password: data
                .get_string("service_password")
                .filter(|v| !v.is_empty()),
            partitioning_schema,
        };
        client
            .install_server(&req, ctx.cancel.clone())
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;

        let server = wait_for_install(client, server_id, CREATE_TIMEOUT, ctx.cancel.clone())
            .await
            .map_err(Diagnostics::from)?;
        match server.install.as_ref().map(|i| i.status) {
            Some(InstallStatus::Completed) => Ok(()),
            status => Err(Diagnostics::from(Diagnostic::error(format!(
                "server {server_id} installation ended in state {}",
                status.map(|s| s.as_str()).unwrap_or("unknown")
            )))),
        }
    }

    async fn set_private_networks(
        &self,
        client: &BaremetalClient,
        ctx: &Context,
        server_id: &str,
        networks: HashMap<String, Vec<String>>,
    ) -> Result<(), Diagnostics> {
        let req = SetServerPrivateNetworksRequest {
            server_id: server_id.to_string(),
            per_private_network_ipam_ip_ids: networks,
        };
        client
            .set_server_private_networks(&req, ctx.cancel.clone())
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        wait_for_private_networks(client, server_id, ctx.cancel.clone())
            .await
            .map_err(Diagnostics::from)?;
        Ok(())
    }

    async fn reconcile_options(
        &self,
        client: &BaremetalClient,
        ctx: &Context,
        data: &ResourceData,
        server_id: &str,
    ) -> Result<(), Diagnostics> {
        let server = client
            .get_server(
                &GetServerRequest {
                    server_id: server_id.to_string(),
                },
                ctx.cancel.clone(),
            )
            .await
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        let desired = desired_options(data).map_err(Diagnostics::from)?;
        let plan = plan_options(&server.options, &desired);
        if plan.is_empty() {
            return Ok(());
        }

        for option_id in &plan.to_remove {
            let req = DeleteOptionRequest {
                server_id: server_id.to_string(),
                option_id: option_id.clone(),
            };
            match client.delete_option(&req, ctx.cancel.clone()).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(Diagnostics::from(Diagnostic::from(e))),
            }
        }
        // the add pass only starts once the removals have settled
        wait_for_options_gone(client, server_id, &plan.to_remove, ctx.cancel.clone())
            .await
            .map_err(Diagnostics::from)?;

        for option in &plan.to_add {
            let req = AddOptionRequest {
                server_id: server_id.to_string(),
                option_id: option.id.clone(),
                expires_at: option.expires_at,
            };
            client
                .add_option(&req, ctx.cancel.clone())
                .await
                .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        }
        Ok(())
    }

    async fn do_update(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostics> {
        let (zone, server_id) = self.resolve(data).map_err(Diagnostics::from)?;
        let client = BaremetalClient::new(&self.config, &zone);

        if data.any_change(&["name", "description", "tags"]) {
            let req = UpdateServerRequest {
                server_id: server_id.clone(),
                name: data.get_string("name"),
                description: data.get_string("description"),
                tags: data.get("tags").map(string_list_value),
            };
            client
                .update_server(&req, ctx.cancel.clone())
                .await
                .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        }

        if data.has_change("options") {
            self.reconcile_options(&client, ctx, data, &server_id)
                .await?;
        }

        if data.has_change("private_network") {
            self.set_private_networks(&client, ctx, &server_id, desired_private_networks(data))
                .await?;
        }

        let os_changed = data.has_change("os");
        let install_inputs_changed = data.any_change(&["ssh_key_ids", "user", "password"]);
        if os_changed || install_inputs_changed {
            if os_changed || data.get_bool("reinstall_on_config_changes", false) {
                self.install(&client, ctx, data, &server_id).await?;
            } else {
                let mut out = Diagnostics::new();
                out.push(Diagnostic::warning(
                    "changes to ssh_key_ids, user or password only apply after a reinstall; \
                     set reinstall_on_config_changes to apply them",
                ));
                return Err(out);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for ServerHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "baremetal_server",
            attributes: vec![
                Attribute::string("name").optional().computed(),
                Attribute::string("hostname").optional(),
                Attribute::string("offer").required(),
                Attribute::string("offer_id").computed(),
                Attribute::string("offer_name").computed(),
                Attribute::string("os")
                    .required()
                    .suppress(scw_schema::suppress::locality_stripped),
                Attribute::string("os_name").computed(),
                Attribute::list("ssh_key_ids").optional(),
                Attribute::string("user").optional().computed(),
                Attribute::string("password").optional(),
                Attribute::string("service_user").optional().computed(),
                Attribute::string("service_password").optional(),
                Attribute::bool("reinstall_on_config_changes")
                    .optional()
                    .default_value(json!(false)),
                Attribute::bool("install_config_afterward")
                    .optional()
                    .default_value(json!(false)),
                Attribute::string("partitioning").optional().force_new(),
                Attribute::string("description").optional(),
                Attribute::list("tags").optional(),
                Attribute::set("options")
                    .optional()
                    .hash_with(option_hash)
                    .elem_of(vec![
                        Attribute::string("id")
                            .required()
                            .suppress(scw_schema::suppress::locality_stripped),
                        Attribute::string("expires_at")
                            .optional()
                            .suppress(scw_schema::suppress::time_rfc3339),
                        Attribute::string("name").computed(),
                    ]),
                Attribute::set("private_network")
                    .optional()
                    .hash_with(private_network_hash)
                    .elem_of(vec![
                        Attribute::string("id")
                            .required()
                            .suppress(scw_schema::suppress::locality_stripped),
                        Attribute::list("ipam_ip_ids").optional().computed(),
                        Attribute::int("vlan").computed(),
                        Attribute::string("status").computed(),
                        Attribute::string("created_at").computed(),
                        Attribute::string("updated_at").computed(),
                    ]),
                Attribute::list("ips").computed(),
                Attribute::list("ipv4").computed(),
                Attribute::list("ipv6").computed(),
                Attribute::list("private_ip").computed(),
                Attribute::string("domain").computed(),
                Attribute::string("organization_id").computed(),
                Attribute::string("project_id")
                    .optional()
                    .computed()
                    .force_new(),
                Attribute::string("zone").optional().computed().force_new(),
            ],
            timeouts: Timeouts::uniform(CREATE_TIMEOUT),
        }
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if let Err(d) = self.do_create(ctx, data).await {
            return d;
        }
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (zone, server_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = BaremetalClient::new(&self.config, &zone);
        let server = match client
            .get_server(
                &GetServerRequest {
                    server_id: server_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(server) => server,
            Err(e) if e.is_not_found() => {
                tracing::warn!(server_id, "server is gone, removing it from state");
                data.clear_id();
                return Diagnostics::new();
            }
            Err(e) => return Diagnostics::from_error(e),
        };

        data.set("name", &server.name);
        data.set("description", &server.description);
        data.set("tags", &server.tags);
        data.set("offer_id", scw_locality::id::zoned(&zone, &server.offer_id));
        data.set("offer_name", &server.offer_name);
        data.set("organization_id", &server.organization_id);
        data.set("project_id", &server.project_id);
        data.set("zone", zone.as_str());
        data.set("domain", &server.domain);

        if let Some(install) = &server.install {
            data.set("os", scw_locality::id::zoned(&zone, &install.os_id));
            data.set(
                "ssh_key_ids",
                install
                    .ssh_key_ids
                    .iter()
                    .map(|k| scw_locality::id::zoned(&zone, k))
                    .collect::<Vec<_>>(),
            );
            if let Some(user) = &install.user {
                data.set("user", user);
            }
            if let Some(service_user) = &install.service_user {
                data.set("service_user", service_user);
            }
            match client
                .get_os(
                    &GetOsRequest {
                        os_id: install.os_id.clone(),
                    },
                    ctx.cancel.clone(),
                )
                .await
            {
                Ok(os) => data.set("os_name", format!("{} {}", os.name, os.version)),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Diagnostics::from_error(e),
            }
        }

        data.set("ips", flatten_ips(&server, None));
        data.set("ipv4", flatten_ips(&server, Some(IpVersion::V4)));
        data.set("ipv6", flatten_ips(&server, Some(IpVersion::V6)));
        data.set("options", flatten_options(&server.options));

        match client
            .list_server_private_networks(
                &ListServerPrivateNetworksRequest {
                    server_id: server_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(list) => {
                data.set(
                    "private_network",
                    flatten_private_networks(&list.server_private_networks),
                );
                data.set(
                    "private_ip",
                    list.server_private_networks
                        .iter()
                        .flat_map(|pn| pn.ipam_ip_ids.iter())
                        .map(|id| json!({ "id": id, "address": "" }))
                        .collect::<Vec<_>>(),
                );
            }
            Err(e) if e.is_not_found() => {
                data.set("private_network", json!([]));
                data.set("private_ip", json!([]));
            }
            Err(e) => return Diagnostics::from_error(e),
        }
        Diagnostics::new()
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        match self.do_update(ctx, data).await {
            Ok(()) => self.read(ctx, data).await,
            // a reinstall warning still refreshes state
            Err(d) if !d.has_error() => {
                let mut out = d;
                out.extend(self.read(ctx, data).await);
                out
            }
            Err(d) => d,
        }
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (zone, server_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = BaremetalClient::new(&self.config, &zone);

        let attached = match client
            .list_server_private_networks(
                &ListServerPrivateNetworksRequest {
                    server_id: server_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(list) => list.server_private_networks,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Diagnostics::from_error(e),
        };
        for attachment in &attached {
            let req = DeleteServerPrivateNetworkRequest {
                server_id: server_id.clone(),
                private_network_id: attachment.private_network_id.clone(),
            };
            match client
                .delete_server_private_network(&req, ctx.cancel.clone())
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Diagnostics::from_error(e),
            }
        }
        if !attached.is_empty() {
            if let Err(d) =
                wait_for_detachments(&client, &server_id, ctx.cancel.clone()).await
            {
                return d.into();
            }
        }

        match client
            .delete_server(
                &DeleteServerRequest {
                    server_id: server_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() || e.is_forbidden() => {}
            Err(e) => return Diagnostics::from_error(e),
        }

        let config = WaitConfig::with_timeout(CREATE_TIMEOUT);
        let gone = wait_for_or_gone(
            ctx.cancel.as_ref(),
            config,
            crate::api::Error::is_not_found,
            || async {
                let server = client
                    .get_server(
                        &GetServerRequest {
                            server_id: server_id.clone(),
                        },
                        None,
                    )
                    .await?;
                Ok(WaitDecision::<()>::Pending(
                    server.status.as_str().to_string(),
                ))
            },
        )
        .await;
        if let Err(e) = gone {
            return Diagnostics::from_error(e);
        }
        data.clear_id();
        Diagnostics::new()
    }

    async fn customize_diff(
        &self,
        ctx: &Context,
        diff: &mut ResourceDiff,
        _data: &ResourceData,
    ) -> Result<(), PlanError> {
        if let Some(Value::Array(networks)) = diff.new_value("private_network") {
            if !networks.is_empty()
                && !options_contain(diff.new_value("options"), OPTION_ID_PRIVATE_NETWORK)
            {
                return Err(PlanError::new("private network option needs to be enabled"));
            }
        }

        if diff.has_change("offer") && diff.id().is_some() {
            let (zone, _) = scw_locality::id::parse_zoned(diff.id().unwrap_or_default())
                .map_err(|e| PlanError::new(e.to_string()))?;
            let client = BaremetalClient::new(&self.config, &zone);
            let old_ref = diff.old_string("offer").unwrap_or_default();
            let new_ref = diff.new_string("offer").unwrap_or_default();
            let old_offer = resolve_offer(&client, &zone, &old_ref, ctx.cancel.clone())
                .await
                .map_err(|d| PlanError::new(d.summary))?;
            let new_offer = resolve_offer(&client, &zone, &new_ref, ctx.cancel.clone())
                .await
                .map_err(|d| PlanError::new(d.summary))?;
            if offer_change_requires_replacement(&old_offer, &new_offer)? {
                diff.force_new("offer");
            }
        }
        Ok(())
    }
}

/// Whether moving between two resolved offers needs a new machine.
/// Same name with a changed billing period stays in place, except that the
/// service refuses to leave a monthly commitment for hourly billing.
fn offer_change_requires_replacement(old: &Offer, new: &Offer) -> Result<bool, PlanError> {
    if old.name != new.name {
        return Ok(true);
    }
    if old.subscription_period == SubscriptionPeriod::Monthly
        && new.subscription_period == SubscriptionPeriod::Hourly
    {
        return Err(PlanError::new(
            "cannot change subscription period from monthly to hourly",
        ));
    }
    Ok(false)
}

fn options_contain(options: Option<&Value>, option_id: &str) -> bool {
    let Some(Value::Array(options)) = options else {
        return false;
    };
    options.iter().any(|o| {
        o.get("id")
            .and_then(Value::as_str)
            .map(|id| scw_locality::id::strip(id) == option_id)
            .unwrap_or(false)
    })
}

/// Identity of one `private_network` set element: the attachment plus its
/// IPAM ids, order-insensitively. The id is stripped of any locality prefix
/// so a bare config id and a zoned state id hash to the same element.
pub fn private_network_hash(element: &Value) -> u64 {
    let id = element.get("id").and_then(Value::as_str).unwrap_or("");
    let mut ipam_ids: Vec<&str> = element
        .get("ipam_ip_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    ipam_ids.sort_unstable();
    scw_schema::hash::hash_string(&format!(
        "{}-{}",
        scw_locality::id::strip(id),
        ipam_ids.join("-")
    ))
}

/// Identity of one `options` set element. A different expiry is a
/// different element, which the reconciler turns into remove-then-add.
pub fn option_hash(element: &Value) -> u64 {
    let id = element.get("id").and_then(Value::as_str).unwrap_or("");
    let expires_at = element
        .get("expires_at")
        .and_then(Value::as_str)
        .unwrap_or("");
    scw_schema::hash::hash_string(&format!(
        "{}-{expires_at}",
        scw_locality::id::strip(id)
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DesiredOption {
    pub id: String,
    pub expires_at: Option<OffsetDateTime>,
}

fn desired_options(data: &ResourceData) -> Result<Vec<DesiredOption>, Diagnostic> {
    let Some(Value::Array(items)) = data.get("options") else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| {
            let id = item
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Diagnostic::error("options entries need an id").with_attribute("options")
                })?;
            let expires_at = match item.get("expires_at").and_then(Value::as_str) {
                Some(raw) if !raw.is_empty() => {
                    Some(OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| {
                        Diagnostic::error(format!("options expires_at is not RFC 3339: {e}"))
                            .with_attribute("options")
                    })?)
                }
                _ => None,
            };
            Ok(DesiredOption {
                id: scw_locality::id::strip(id).to_string(),
                expires_at,
            })
        })
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct OptionPlan {
    pub to_add: Vec<DesiredOption>,
    pub to_remove: Vec<String>,
}

impl OptionPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Set-difference reconciliation. An option present on both sides with a
/// different expiry is replaced.
pub(crate) fn plan_options(current: &[ServerOption], desired: &[DesiredOption]) -> OptionPlan {
    let mut plan = OptionPlan::default();
    for option in current {
        match desired.iter().find(|d| d.id == option.id) {
            None => plan.to_remove.push(option.id.clone()),
            Some(d) if d.expires_at != option.expires_at => {
                plan.to_remove.push(option.id.clone());
                plan.to_add.push(d.clone());
            }
            Some(_) => {}
        }
    }
    for d in desired {
        if !current.iter().any(|c| c.id == d.id) {
            plan.to_add.push(d.clone());
        }
    }
    plan
}

fn desired_private_networks(data: &ResourceData) -> HashMap<String, Vec<String>> {
    let Some(Value::Array(items)) = data.get("private_network") else {
        return HashMap::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(Value::as_str)?;
            let ipam_ids = string_list(item.get("ipam_ip_ids"))
                .iter()
                .map(|id| scw_locality::id::strip(id).to_string())
                .collect();
            Some((scw_locality::id::strip(id).to_string(), ipam_ids))
        })
        .collect()
}

async fn resolve_offer(
    client: &BaremetalClient,
    zone: &Zone,
    offer: &str,
    cancel: Option<CancellationToken>,
) -> Result<Offer, Diagnostic> {
    let offer_ref = scw_locality::id::strip(offer);
    if scw_locality::is_uuid(offer_ref) {
        let req = GetOfferRequest {
            offer_id: offer_ref.to_string(),
        };
        return Ok(client.get_offer(&req, cancel).await?);
    }
    // an offer name can exist under both billing periods with distinct ids
    for period in [SubscriptionPeriod::Monthly, SubscriptionPeriod::Hourly] {
        let req = ListOffersRequest {
            subscription_period: Some(period),
            page_size: Some(100),
            ..Default::default()
        };
        let response = client.list_offers(&req, cancel.clone()).await?;
        if let Some(offer) = response.offers.into_iter().find(|o| o.name == offer_ref) {
            return Ok(offer);
        }
    }
    Err(Diagnostic::error(format!("offer {offer_ref} not found in zone {zone}")).with_attribute("offer"))
}

/// Every credential field the OS marks required without a default must be
/// configured before install.
fn validate_install_config(os: &Os, data: &ResourceData) -> Diagnostics {
    let mut out = Diagnostics::new();
    let fields = [
        ("user", &os.user),
        ("password", &os.password),
        ("service_user", &os.service_user),
        ("service_password", &os.service_password),
    ];
    for (attr, field) in fields {
        if field.needs_user_input() && data.get_string(attr).filter(|v| !v.is_empty()).is_none() {
            out.push(
                Diagnostic::error(format!("os {} requires {attr} to install", os.name))
                    .with_attribute(attr),
            );
        }
    }
    if os.ssh.needs_user_input() && string_list(data.get("ssh_key_ids")).is_empty() {
        out.push(
            Diagnostic::error(format!("os {} requires at least one ssh key", os.name))
                .with_attribute("ssh_key_ids"),
        );
    }
    out
}

fn generate_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("bm-{}", suffix.to_lowercase())
}

async fn wait_for_server(
    client: &BaremetalClient,
    server_id: &str,
    timeout: Duration,
    cancel: Option<CancellationToken>,
) -> Result<Server, Diagnostic> {
    let config = WaitConfig::with_timeout(timeout);
    wait_for(cancel.as_ref(), config, || async {
        let server = client
            .get_server(
                &GetServerRequest {
                    server_id: server_id.to_string(),
                },
                None,
            )
            .await?;
        Ok(if server.status.is_terminal() {
            WaitDecision::Done(server)
        } else {
            WaitDecision::Pending(server.status.as_str().to_string())
        })
    })
    .await
    .map_err(|e: WaitError<crate::api::Error>| Diagnostic::error(e.to_string()))
}

async fn wait_for_install(
    client: &BaremetalClient,
    server_id: &str,
    timeout: Duration,
    cancel: Option<CancellationToken>,
) -> Result<Server, Diagnostic> {
    let config = WaitConfig::with_timeout(timeout);
    wait_for(cancel.as_ref(), config, || async {
        let server = client
            .get_server(
                &GetServerRequest {
                    server_id: server_id.to_string(),
                },
                None,
            )
            .await?;
        let status = server
            .install
            .as_ref()
            .map(|i| i.status)
            .unwrap_or(InstallStatus::Unknown);
        Ok(match status {
            InstallStatus::Completed | InstallStatus::Error => WaitDecision::Done(server),
            other => WaitDecision::Pending(other.as_str().to_string()),
        })
    })
    .await
    .map_err(|e: WaitError<crate::api::Error>| Diagnostic::error(e.to_string()))
}

/// Waits until every attachment left the transitional states. The network
/// may converge after the server answers 404, so gone counts as settled.
async fn wait_for_private_networks(
    client: &BaremetalClient,
    server_id: &str,
    cancel: Option<CancellationToken>,
) -> Result<Vec<ServerPrivateNetwork>, Diagnostic> {
    let config = WaitConfig::with_timeout(CREATE_TIMEOUT);
    let attachments = wait_for_or_gone(
        cancel.as_ref(),
        config,
        crate::api::Error::is_not_found,
        || async {
            let list = client
                .list_server_private_networks(
                    &ListServerPrivateNetworksRequest {
                        server_id: server_id.to_string(),
                    },
                    None,
                )
                .await?;
            let pending = list
                .server_private_networks
                .iter()
                .find(|pn| !pn.status.is_terminal());
            Ok(match pending {
                Some(pn) => WaitDecision::Pending(pn.status.as_str().to_string()),
                None => WaitDecision::Done(list.server_private_networks),
            })
        },
    )
    .await
    .map_err(|e| Diagnostic::error(e.to_string()))?
    .unwrap_or_default();

    if let Some(failed) = attachments
        .iter()
        .find(|pn| pn.status == AttachmentStatus::Error)
    {
        return Err(Diagnostic::error(format!(
            "private network {} attachment failed",
            failed.private_network_id
        ))
        .with_attribute("private_network"));
    }
    Ok(attachments)
}

async fn wait_for_detachments(
    client: &BaremetalClient,
    server_id: &str,
    cancel: Option<CancellationToken>,
) -> Result<(), Diagnostic> {
    let config = WaitConfig::with_timeout(CREATE_TIMEOUT);
    wait_for_or_gone(
        cancel.as_ref(),
        config,
        crate::api::Error::is_not_found,
        || async {
            let list = client
                .list_server_private_networks(
                    &ListServerPrivateNetworksRequest {
                        server_id: server_id.to_string(),
                    },
                    None,
                )
                .await?;
            Ok(if list.server_private_networks.is_empty() {
                WaitDecision::Done(())
            } else {
                WaitDecision::Pending(format!(
                    "{} attachments remaining",
                    list.server_private_networks.len()
                ))
            })
        },
    )
    .await
    .map(|_| ())
    .map_err(|e| Diagnostic::error(e.to_string()))
}

async fn wait_for_options_gone(
    client: &BaremetalClient,
    server_id: &str,
    removed: &[String],
    cancel: Option<CancellationToken>,
) -> Result<(), Diagnostic> {
    if removed.is_empty() {
        return Ok(());
    }
    let config = WaitConfig::with_timeout(CREATE_TIMEOUT);
    wait_for_or_gone(
        cancel.as_ref(),
        config,
        crate::api::Error::is_not_found,
        || async {
            let server = client
                .get_server(
                    &GetServerRequest {
                        server_id: server_id.to_string(),
                    },
                    None,
                )
                .await?;
            let lingering = server
                .options
                .iter()
                .find(|o| removed.contains(&o.id));
            Ok(match lingering {
                Some(option) => WaitDecision::Pending(format!("option {} detaching", option.id)),
                None => WaitDecision::Done(()),
            })
        },
    )
    .await
    .map(|_| ())
    .map_err(|e| Diagnostic::error(e.to_string()))
}

fn flatten_ips(server: &Server, version: Option<IpVersion>) -> Vec<Value> {
    server
        .ips
        .iter()
        .filter(|ip| version.map(|v| ip.version == v).unwrap_or(true))
        .map(|ip| {
            json!({
                "id": ip.id,
                "version": match ip.version {
                    IpVersion::V4 => "IPv4",
                    IpVersion::V6 => "IPv6",
                },
                "address": ip.address,
                "reverse": ip.reverse,
            })
        })
        .collect()
}

fn flatten_options(options: &[ServerOption]) -> Vec<Value> {
    options
        .iter()
        .map(|o| {
            json!({
                "id": o.id,
                "name": o.name,
                "expires_at": o
                    .expires_at
                    .and_then(|t| t.format(&Rfc3339).ok()),
            })
        })
        .collect()
}

fn flatten_private_networks(attachments: &[ServerPrivateNetwork]) -> Vec<Value> {
    attachments
        .iter()
        .map(|pn| {
            json!({
                "id": pn.private_network_id,
                "ipam_ip_ids": pn.ipam_ip_ids,
                "vlan": pn.vlan,
                "status": pn.status.as_str(),
                "created_at": pn.created_at.and_then(|t| t.format(&Rfc3339).ok()),
                "updated_at": pn.updated_at.and_then(|t| t.format(&Rfc3339).ok()),
            })
        })
        .collect()
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

fn string_list_value(value: &Value) -> Vec<String> {
    string_list(Some(value))
}

#[cfg(test)]
mod test {
    use scw_schema::Severity;
    use serde_json::json;

    use super::*;

    #[ctor::ctor]
    fn init() {
        let _ = tracing_subscriber::fmt().try_init();
    }
    use crate::api::os::OsField;

    fn offer(name: &str, period: SubscriptionPeriod) -> Offer {
        Offer {
            id: format!("{name}-{}", period.as_str()),
            name: name.to_string(),
            subscription_period: period,
            incompatible_os_ids: Vec::new(),
            options: Vec::new(),
        }
    }

    #[test]
    fn offer_name_change_forces_replacement() {
        let old = offer("EM-A115X-SSD", SubscriptionPeriod::Hourly);
        let new = offer("EM-B112X-SSD", SubscriptionPeriod::Hourly);
        assert!(offer_change_requires_replacement(&old, &new).unwrap());
    }

    #[test]
    fn billing_period_change_stays_in_place() {
        let old = offer("EM-A115X-SSD", SubscriptionPeriod::Hourly);
        let new = offer("EM-A115X-SSD", SubscriptionPeriod::Monthly);
        assert!(!offer_change_requires_replacement(&old, &new).unwrap());
    }

    #[test]
    fn monthly_to_hourly_is_forbidden() {
        let old = offer("EM-A115X-SSD", SubscriptionPeriod::Monthly);
        let new = offer("EM-A115X-SSD", SubscriptionPeriod::Hourly);
        let err = offer_change_requires_replacement(&old, &new).unwrap_err();
        assert!(err.0.contains("monthly to hourly"));
    }

    #[test]
    fn private_network_hash_ignores_ipam_order() {
        let a = json!({"id": "pn-1", "ipam_ip_ids": ["ip-a", "ip-b"]});
        let b = json!({"id": "pn-1", "ipam_ip_ids": ["ip-b", "ip-a"]});
        assert_eq!(private_network_hash(&a), private_network_hash(&b));

        let c = json!({"id": "pn-1", "ipam_ip_ids": ["ip-a", "ip-b", "ip-c"]});
        assert_ne!(private_network_hash(&a), private_network_hash(&c));
        let d = json!({"id": "pn-1", "ipam_ip_ids": ["ip-a"]});
        assert_ne!(private_network_hash(&a), private_network_hash(&d));
    }

    #[test]
    fn private_network_hash_ignores_locality_prefix() {
        let bare = json!({"id": "pn-1", "ipam_ip_ids": ["ip-b", "ip-a"]});
        let zoned = json!({"id": "fr-par-1/pn-1", "ipam_ip_ids": ["ip-a", "ip-b"]});
        assert_eq!(private_network_hash(&bare), private_network_hash(&zoned));

        let other = json!({"id": "fr-par-1/pn-2", "ipam_ip_ids": ["ip-a", "ip-b"]});
        assert_ne!(private_network_hash(&bare), private_network_hash(&other));
    }

    fn current(entries: &[(&str, Option<&str>)]) -> Vec<ServerOption> {
        entries
            .iter()
            .map(|(id, expires)| ServerOption {
                id: id.to_string(),
                name: String::new(),
                expires_at: expires.map(|e| OffsetDateTime::parse(e, &Rfc3339).unwrap()),
            })
            .collect()
    }

    fn desired(entries: &[(&str, Option<&str>)]) -> Vec<DesiredOption> {
        entries
            .iter()
            .map(|(id, expires)| DesiredOption {
                id: id.to_string(),
                expires_at: expires.map(|e| OffsetDateTime::parse(e, &Rfc3339).unwrap()),
            })
            .collect()
    }

    #[test]
    fn option_plan_is_idempotent() {
        let state = [("opt-1", None), ("opt-2", Some("2026-09-01T00:00:00Z"))];
        let plan = plan_options(&current(&state), &desired(&state));
        assert!(plan.is_empty());
    }

    #[test]
    fn option_plan_adds_and_removes_by_id() {
        let plan = plan_options(
            &current(&[("opt-1", None), ("opt-2", None)]),
            &desired(&[("opt-2", None), ("opt-3", None)]),
        );
        assert_eq!(plan.to_remove, ["opt-1"]);
        assert_eq!(plan.to_add.len(), 1);
        assert_eq!(plan.to_add[0].id, "opt-3");
    }

    #[test]
    fn changed_expiry_is_a_replacement() {
        let plan = plan_options(
            &current(&[("opt-1", Some("2026-09-01T00:00:00Z"))]),
            &desired(&[("opt-1", Some("2027-09-01T00:00:00Z"))]),
        );
        assert_eq!(plan.to_remove, ["opt-1"]);
        assert_eq!(plan.to_add.len(), 1);
        assert_eq!(plan.to_add[0].id, "opt-1");
    }

    fn required_field() -> OsField {
        OsField {
            editable: true,
            required: true,
            default_value: None,
        }
    }

    #[test]
    fn install_validation_flags_missing_credentials() {
        let os = Os {
            id: "os-1".to_string(),
            name: "Ubuntu".to_string(),
            user: required_field(),
            password: required_field(),
            ssh: required_field(),
            ..Default::default()
        };
        let data = ResourceData::from_config(json!({"user": "ubuntu"}));
        let problems = validate_install_config(&os, &data);
        let attrs: Vec<_> = problems
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .filter_map(|d| d.attribute_path.as_deref())
            .collect();
        assert_eq!(attrs, ["password", "ssh_key_ids"]);
    }

    #[test]
    fn defaulted_fields_need_no_input() {
        let os = Os {
            id: "os-1".to_string(),
            name: "Ubuntu".to_string(),
            user: OsField {
                editable: true,
                required: true,
                default_value: Some("ubuntu".to_string()),
            },
            ..Default::default()
        };
        let data = ResourceData::from_config(json!({}));
        assert!(validate_install_config(&os, &data).is_empty());
    }

    #[test]
    fn generated_names_carry_the_prefix() {
        let name = generate_name();
        assert!(name.starts_with("bm-"));
        assert_eq!(name.len(), 11);
        assert!(name[3..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn private_network_needs_its_option() {
        let handler = ServerHandler::new(ClientConfig::default());
        let ctx = Context::background();
        let mut diff = ResourceDiff::new(
            None,
            json!({}),
            json!({
                "private_network": [{"id": "pn-1"}],
                "options": [{"id": "some-other-option"}],
            }),
        );
        let err = handler
            .customize_diff(&ctx, &mut diff, &ResourceData::default())
            .await
            .unwrap_err();
        assert!(err.0.contains("private network option"));

        let mut ok = ResourceDiff::new(
            None,
            json!({}),
            json!({
                "private_network": [{"id": "pn-1"}],
                "options": [{"id": OPTION_ID_PRIVATE_NETWORK}],
            }),
        );
        handler
            .customize_diff(&ctx, &mut ok, &ResourceData::default())
            .await
            .unwrap();
    }

    #[test]
    fn desired_options_strip_localities() {
        let data = ResourceData::from_config(json!({
            "options": [
                {"id": "fr-par-2/opt-1", "expires_at": "2026-09-01T00:00:00Z"},
                {"id": "opt-2"},
            ],
        }));
        let options = desired_options(&data).unwrap();
        assert_eq!(options[0].id, "opt-1");
        assert!(options[0].expires_at.is_some());
        assert_eq!(options[1].id, "opt-2");
        assert_eq!(options[1].expires_at, None);
    }

    fn live_config() -> ClientConfig {
        ClientConfig {
            secret_key: std::env::var("SCW_SECRET_KEY").unwrap(),
            default_project_id: std::env::var("SCW_DEFAULT_PROJECT_ID").ok(),
            ..Default::default()
        }
    }

    // Needs live credentials plus an SSH key; run with --ignored.
    #[tokio::test(flavor = "multi_thread")]
    #[serial_test::serial]
    #[ignore]
    async fn reinstall_applies_replaced_ssh_key() {
        let handler = ServerHandler::new(live_config());
        let ctx = Context::background();
        let key_1 = std::env::var("SCW_TEST_SSH_KEY_ID").unwrap();
        let key_2 = std::env::var("SCW_TEST_SSH_KEY_ID_2").unwrap();

        let config = json!({
            "zone": "fr-par-2",
            "offer": "EM-A115X-SSD",
            "os": std::env::var("SCW_TEST_OS_ID").unwrap(),
            "ssh_key_ids": [key_1],
        });
        let mut data = ResourceData::from_config(config.clone());
        let diags = handler.create(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        let id = data.id().unwrap().to_string();

        let mut updated = config;
        updated["ssh_key_ids"] = json!([key_2]);
        updated["reinstall_on_config_changes"] = json!(true);
        let mut data = ResourceData::new(Some(id.clone()), data.state(), updated);
        let diags = handler.update(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        let keys = data.get("ssh_key_ids").unwrap();
        assert_eq!(keys.as_array().unwrap().len(), 1);
        assert!(keys[0].as_str().unwrap().ends_with(&key_2));

        let diags = handler.delete(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
    }

    // Needs live credentials plus a private network; run with --ignored.
    #[tokio::test(flavor = "multi_thread")]
    #[serial_test::serial]
    #[ignore]
    async fn option_and_private_network_attach() {
        let handler = ServerHandler::new(live_config());
        let ctx = Context::background();
        let pn_id = std::env::var("SCW_TEST_PRIVATE_NETWORK_ID").unwrap();

        let config = json!({
            "zone": "fr-par-2",
            "offer": "EM-A115X-SSD",
            "os": std::env::var("SCW_TEST_OS_ID").unwrap(),
            "ssh_key_ids": [std::env::var("SCW_TEST_SSH_KEY_ID").unwrap()],
        });
        let mut data = ResourceData::from_config(config.clone());
        let diags = handler.create(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");

        let mut updated = config;
        updated["options"] = json!([{"id": OPTION_ID_PRIVATE_NETWORK}]);
        updated["private_network"] = json!([{"id": pn_id}]);
        let mut data = ResourceData::new(
            data.id().map(str::to_string),
            data.state(),
            updated,
        );
        let diags = handler.update(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        let networks = data.get("private_network").unwrap().as_array().unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0]["id"], json!(pn_id));
        let options = data.get("options").unwrap().as_array().unwrap();
        assert!(options
            .iter()
            .any(|o| o["id"] == json!(OPTION_ID_PRIVATE_NETWORK)));

        let diags = handler.delete(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
    }
}

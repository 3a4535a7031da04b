//! The Kafka cluster resource handler.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_gax::wait::{wait_for, wait_for_or_gone, WaitConfig, WaitDecision, WaitError};
use scw_gax::CancellationToken;
use scw_locality::Region;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, ResourceData, ResourceHandler, Schema, Timeouts,
    Validator,
};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;

use crate::api::client::{ClientConfig, KafkaClient};
use crate::api::clusters::{
    Cluster, ClusterStatus, CreateClusterRequest, DeleteClusterRequest, Endpoint,
    EndpointPrivateNetwork, EndpointPublic, EndpointSpec, GetClusterRequest, UpdateClusterRequest,
    Volume,
};

const VOLUME_TYPES: &[&str] = &["sbs_5k", "sbs_15k"];

const READY_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct ClusterHandler {
    config: ClientConfig,
}

impl ClusterHandler {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, data: &ResourceData) -> Result<(Region, String), Diagnostic> {
        let id = data
            .id()
            .ok_or_else(|| Diagnostic::error("cluster has no recorded identifier"))?;
        let (region, cluster_id) = scw_locality::id::parse_regional(id)?;
        Ok((region, cluster_id))
    }

    async fn do_create(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let region = data
            .get_string("region")
            .ok_or_else(|| Diagnostic::error("region is not configured").with_attribute("region"))?;
        let region = Region::from_str(&region)?;
        let client = KafkaClient::new(&self.config, &region);

        let volume_type = data
            .get_string("volume_type")
            .ok_or_else(|| {
                Diagnostic::error("volume_type is not configured").with_attribute("volume_type")
            })?;
        let size_in_gb = data.get_i64("volume_size_in_gb").unwrap_or(0);
        let req = CreateClusterRequest {
            project_id: data
                .get_string("project_id")
                .or_else(|| self.config.default_project_id.clone()),
            name: data.get_string("name").unwrap_or_default(),
            version: data.get_string("version").unwrap_or_default(),
            node_amount: data.get_i64("node_amount").unwrap_or(0) as u32,
            node_type: data.get_string("node_type").unwrap_or_default(),
            tags: string_list(data.get("tags")),
            user_name: data.get_string("user_name").filter(|s| !s.is_empty()),
            password: data.get_string("password").filter(|s| !s.is_empty()),
            volume: Some(Volume {
                volume_type,
                size_bytes: gb_to_bytes(size_in_gb),
            }),
            endpoints: desired_endpoints(data),
        };
        let cluster = client.create_cluster(&req, ctx.cancel.clone()).await?;
        data.set_id(scw_locality::id::regional(&region, &cluster.id));
        wait_ready(&client, &cluster.id, ctx.cancel.clone()).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for ClusterHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "kafka_cluster",
            attributes: vec![
                Attribute::string("name").required(),
                Attribute::string("version").required().force_new(),
                Attribute::int("node_amount").required().force_new(),
                Attribute::string("node_type").required().force_new(),
                Attribute::string("volume_type")
                    .required()
                    .force_new()
                    .validator(Validator::OneOf(VOLUME_TYPES)),
                Attribute::int("volume_size_in_gb").required().force_new(),
                Attribute::string("user_name").optional().force_new(),
                Attribute::string("password").optional().force_new(),
                Attribute::list("tags").optional(),
                Attribute::block(
                    "private_network",
                    vec![
                        Attribute::string("pn_id")
                            .required()
                            .force_new()
                            .suppress(scw_schema::suppress::locality_stripped),
                        Attribute::string("id").computed(),
                        Attribute::list("dns_records").computed(),
                        Attribute::int("port").computed(),
                    ],
                ),
                Attribute::block(
                    "public_network",
                    vec![
                        Attribute::string("id").computed(),
                        Attribute::list("dns_records").computed(),
                        Attribute::int("port").computed(),
                    ],
                ),
                Attribute::string("status").computed(),
                Attribute::string("created_at").computed(),
                Attribute::string("updated_at").computed(),
                Attribute::string("organization_id").computed(),
                Attribute::string("project_id")
                    .optional()
                    .computed()
                    .force_new(),
                Attribute::string("region").optional().computed().force_new(),
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
        let (region, cluster_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = KafkaClient::new(&self.config, &region);
        let cluster = match client
            .get_cluster(
                &GetClusterRequest {
                    cluster_id: cluster_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(cluster) => cluster,
            Err(e) if e.is_not_found() => {
                tracing::warn!(cluster_id, "cluster is gone, removing it from state");
                data.clear_id();
                return Diagnostics::new();
            }
            Err(e) => return Diagnostics::from_error(e),
        };

        data.set("name", &cluster.name);
        data.set("version", &cluster.version);
        data.set("node_amount", cluster.node_amount);
        data.set("node_type", &cluster.node_type);
        data.set("tags", &cluster.tags);
        data.set("status", cluster.status.as_str());
        data.set("organization_id", &cluster.organization_id);
        data.set("project_id", &cluster.project_id);
        data.set("region", region.as_str());
        if let Some(volume) = &cluster.volume {
            data.set("volume_type", &volume.volume_type);
            data.set("volume_size_in_gb", bytes_to_gb(volume.size_bytes));
        }
        let (private, public) = flatten_endpoints(&region, &cluster.endpoints);
        data.set("private_network", private);
        data.set("public_network", public);
        if let Some(t) = cluster.created_at.and_then(|t| t.format(&Rfc3339).ok()) {
            data.set("created_at", t);
        }
        if let Some(t) = cluster.updated_at.and_then(|t| t.format(&Rfc3339).ok()) {
            data.set("updated_at", t);
        }
        Diagnostics::new()
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (region, cluster_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = KafkaClient::new(&self.config, &region);
        if data.any_change(&["name", "tags"]) {
            let req = UpdateClusterRequest {
                cluster_id: cluster_id.clone(),
                name: data.get_string("name"),
                tags: data.get("tags").map(|v| string_list(Some(v))),
            };
            if let Err(e) = client.update_cluster(&req, ctx.cancel.clone()).await {
                return Diagnostics::from_error(e);
            }
            if let Err(d) = wait_ready(&client, &cluster_id, ctx.cancel.clone()).await {
                return d.into();
            }
        }
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (region, cluster_id) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = KafkaClient::new(&self.config, &region);
        match client
            .delete_cluster(
                &DeleteClusterRequest {
                    cluster_id: cluster_id.clone(),
                },
                ctx.cancel.clone(),
            )
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Diagnostics::from_error(e),
        }

        let config = WaitConfig::new(POLL_INTERVAL, READY_TIMEOUT);
        let gone = wait_for_or_gone(
            ctx.cancel.as_ref(),
            config,
            crate::api::Error::is_not_found,
            || async {
                let cluster = client
                    .get_cluster(
                        &GetClusterRequest {
                            cluster_id: cluster_id.clone(),
                        },
                        None,
                    )
                    .await?;
                Ok(WaitDecision::<()>::Pending(
                    cluster.status.as_str().to_string(),
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
}

fn gb_to_bytes(size_in_gb: i64) -> u64 {
    size_in_gb.max(0) as u64 * 1_000_000_000
}

fn bytes_to_gb(size_bytes: u64) -> u64 {
    size_bytes / 1_000_000_000
}

/// One private-network attachment when configured, otherwise one public
/// endpoint. The service rejects the public spec today; it is still sent
/// so clusters pick it up once the backend supports it.
pub(crate) fn desired_endpoints(data: &ResourceData) -> Vec<EndpointSpec> {
    let pn_id = match data.get("private_network") {
        Some(Value::Array(items)) => items
            .first()
            .and_then(|b| b.get("pn_id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    };
    match pn_id {
        Some(pn_id) => vec![EndpointSpec {
            private_network: Some(EndpointPrivateNetwork {
                private_network_id: scw_locality::id::strip(&pn_id).to_string(),
            }),
            public: None,
        }],
        None => vec![EndpointSpec {
            private_network: None,
            public: Some(EndpointPublic {}),
        }],
    }
}

fn flatten_endpoints(region: &Region, endpoints: &[Endpoint]) -> (Value, Value) {
    let mut private = Vec::new();
    let mut public = Vec::new();
    for endpoint in endpoints {
        match &endpoint.private_network {
            Some(pn) => private.push(json!({
                "pn_id": scw_locality::id::regional(region, &pn.private_network_id),
                "id": endpoint.id,
                "dns_records": endpoint.dns_records,
                "port": endpoint.port,
            })),
            None => public.push(json!({
                "id": endpoint.id,
                "dns_records": endpoint.dns_records,
                "port": endpoint.port,
            })),
        }
    }
    (Value::Array(private), Value::Array(public))
}

async fn wait_ready(
    client: &KafkaClient,
    cluster_id: &str,
    cancel: Option<CancellationToken>,
) -> Result<Cluster, Diagnostic> {
    let config = WaitConfig::new(POLL_INTERVAL, READY_TIMEOUT);
    let cluster = wait_for(cancel.as_ref(), config, || async {
        let cluster = client
            .get_cluster(
                &GetClusterRequest {
                    cluster_id: cluster_id.to_string(),
                },
                None,
            )
            .await?;
        Ok(if cluster.status.is_terminal() {
            WaitDecision::Done(cluster)
        } else {
            WaitDecision::Pending(cluster.status.as_str().to_string())
        })
    })
    .await
    .map_err(|e: WaitError<crate::api::Error>| Diagnostic::error(e.to_string()))?;
    if cluster.status == ClusterStatus::Error {
        return Err(Diagnostic::error(format!(
            "cluster {cluster_id} entered error state"
        )));
    }
    Ok(cluster)
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

    #[ctor::ctor]
    fn init() {
        let _ = tracing_subscriber::fmt().try_init();
    }

    #[test]
    fn volume_size_is_decimal_gigabytes() {
        assert_eq!(gb_to_bytes(100), 100_000_000_000);
        assert_eq!(gb_to_bytes(0), 0);
        assert_eq!(bytes_to_gb(125_000_000_000), 125);
    }

    #[test]
    fn private_network_wins_over_public() {
        let data = ResourceData::from_config(json!({
            "private_network": [{"pn_id": "fr-par/11111111-aaaa-bbbb-cccc-222222222222"}],
        }));
        let endpoints = desired_endpoints(&data);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(
            endpoints[0]
                .private_network
                .as_ref()
                .map(|pn| pn.private_network_id.as_str()),
            Some("11111111-aaaa-bbbb-cccc-222222222222")
        );
        assert!(endpoints[0].public.is_none());
    }

    #[test]
    fn public_endpoint_is_requested_without_a_private_network() {
        let data = ResourceData::from_config(json!({"name": "cluster"}));
        let endpoints = desired_endpoints(&data);
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints[0].private_network.is_none());
        assert!(endpoints[0].public.is_some());
    }

    #[test]
    fn endpoints_split_by_kind() {
        let region = Region::from_str("fr-par").unwrap();
        let endpoints = vec![
            Endpoint {
                id: "ep-1".to_string(),
                dns_records: vec!["broker.priv".to_string()],
                port: 9092,
                private_network: Some(EndpointPrivateNetwork {
                    private_network_id: "pn-1".to_string(),
                }),
                public: None,
            },
            Endpoint {
                id: "ep-2".to_string(),
                dns_records: vec!["broker.pub".to_string()],
                port: 9092,
                private_network: None,
                public: Some(EndpointPublic {}),
            },
        ];
        let (private, public) = flatten_endpoints(&region, &endpoints);
        assert_eq!(private[0]["pn_id"], "fr-par/pn-1");
        assert_eq!(private[0]["port"], 9092);
        assert_eq!(public[0]["id"], "ep-2");
        assert_eq!(public.as_array().map(Vec::len), Some(1));
    }

    fn live_config() -> ClientConfig {
        ClientConfig {
            secret_key: std::env::var("SCW_SECRET_KEY").unwrap(),
            default_project_id: std::env::var("SCW_DEFAULT_PROJECT_ID").ok(),
            ..Default::default()
        }
    }

    // Needs live credentials and a provisioned private network; run with
    // --ignored. Cluster provisioning takes tens of minutes.
    #[tokio::test(flavor = "multi_thread")]
    #[serial_test::serial]
    #[ignore]
    async fn cluster_lifecycle_round_trip() {
        let handler = ClusterHandler::new(live_config());
        let ctx = Context::background();

        let config = json!({
            "region": "fr-par",
            "name": "handler-test-cluster",
            "version": "3.7",
            "node_amount": 3,
            "node_type": "KAFKA-DEV-S",
            "volume_type": "sbs_5k",
            "volume_size_in_gb": 20,
            "private_network": [{"pn_id": std::env::var("SCW_TEST_PRIVATE_NETWORK_ID").unwrap()}],
        });
        let mut data = ResourceData::from_config(config.clone());
        let diags = handler.create(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        assert_eq!(data.get_string("status").as_deref(), Some("ready"));

        let mut updated = config;
        updated["name"] = json!("handler-test-cluster-renamed");
        let mut data = ResourceData::new(data.id().map(str::to_string), data.state(), updated);
        let diags = handler.update(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        assert_eq!(
            data.get_string("name").as_deref(),
            Some("handler-test-cluster-renamed")
        );

        let diags = handler.delete(&ctx, &mut data).await;
        assert!(!diags.has_error(), "{diags:?}");
        assert!(data.id().is_none());
    }
}

use std::future::Future;

use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use scw_gax::CancellationToken;
use scw_locality::Zone;
use tokio::select;

use crate::api::offers::{GetOfferRequest, ListOffersRequest, ListOffersResponse, Offer};
use crate::api::options::{AddOptionRequest, DeleteOptionRequest};
use crate::api::os::{GetOsRequest, Os};
use crate::api::partitioning::{
    GetDefaultPartitioningSchemaRequest, PartitionSchema, ValidatePartitioningSchemaRequest,
};
use crate::api::private_networks::{
    DeleteServerPrivateNetworkRequest, ListServerPrivateNetworksRequest,
    ListServerPrivateNetworksResponse, SetServerPrivateNetworksRequest,
    SetServerPrivateNetworksResponse,
};
use crate::api::servers::create::CreateServerRequest;
use crate::api::servers::delete::DeleteServerRequest;
use crate::api::servers::get::GetServerRequest;
use crate::api::servers::install::InstallServerRequest;
use crate::api::servers::update::UpdateServerRequest;
use crate::api::servers::Server;
use crate::api::{map_error, offers, options, os, partitioning, private_networks, servers, Error};

/// Configuration shared by every client the handlers build. Constructing a
/// per-zone client from it is cheap and done per call.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub http: Option<reqwest::Client>,
    /// Endpoint template; `{zone}` is substituted per client.
    pub endpoint: String,
    pub secret_key: String,
    pub default_project_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http: None,
            endpoint: "https://api.scaleway.com/baremetal/v1/zones/{zone}".to_string(),
            secret_key: String::new(),
            default_project_id: None,
        }
    }
}

#[derive(Clone)]
pub struct BaremetalClient {
    http: ClientWithMiddleware,
    base_url: String,
    secret_key: String,
}

impl BaremetalClient {
    pub fn new(config: &ClientConfig, zone: &Zone) -> Self {
        let http =
            reqwest_middleware::ClientBuilder::new(config.http.clone().unwrap_or_default()).build();
        Self {
            http,
            base_url: config.endpoint.replace("{zone}", zone.as_str()),
            secret_key: config.secret_key.clone(),
        }
    }

    pub async fn list_offers(
        &self,
        req: &ListOffersRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ListOffersResponse, Error> {
        let action = async {
            let builder = offers::build_list(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_offer(
        &self,
        req: &GetOfferRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Offer, Error> {
        let action = async {
            let builder = offers::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_os(
        &self,
        req: &GetOsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Os, Error> {
        let action = async {
            let builder = os::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn create_server(
        &self,
        req: &CreateServerRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Server, Error> {
        let action = async {
            let builder = servers::create::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_server(
        &self,
        req: &GetServerRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Server, Error> {
        let action = async {
            let builder = servers::get::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn update_server(
        &self,
        req: &UpdateServerRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Server, Error> {
        let action = async {
            let builder = servers::update::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_server(
        &self,
        req: &DeleteServerRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = servers::delete::build(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn install_server(
        &self,
        req: &InstallServerRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Server, Error> {
        let action = async {
            let builder = servers::install::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn add_option(
        &self,
        req: &AddOptionRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Server, Error> {
        let action = async {
            let builder = options::build_add(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_option(
        &self,
        req: &DeleteOptionRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Server, Error> {
        let action = async {
            let builder = options::build_delete(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn set_server_private_networks(
        &self,
        req: &SetServerPrivateNetworksRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<SetServerPrivateNetworksResponse, Error> {
        let action = async {
            let builder = private_networks::build_set(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn list_server_private_networks(
        &self,
        req: &ListServerPrivateNetworksRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ListServerPrivateNetworksResponse, Error> {
        let action = async {
            let builder = private_networks::build_list(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_server_private_network(
        &self,
        req: &DeleteServerPrivateNetworkRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = private_networks::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_default_partitioning_schema(
        &self,
        req: &GetDefaultPartitioningSchemaRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<PartitionSchema, Error> {
        let action = async {
            let builder = partitioning::build_default(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn validate_partitioning_schema(
        &self,
        req: &ValidatePartitioningSchemaRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = partitioning::build_validate(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(reqwest::header::USER_AGENT, "scw-baremetal")
            .header("X-Auth-Token", &self.secret_key)
    }

    async fn send<T: for<'de> serde::Deserialize<'de>>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, Error> {
        let response = self.with_headers(builder).send().await?;
        if response.status().is_success() {
            let text = response.text().await?;
            tracing::debug!("{}", text);
            serde_json::from_str(&text).map_err(|e| {
                Error::HttpMiddleware(anyhow::anyhow!("malformed response body: {e}"))
            })
        } else {
            Err(map_error(response).await)
        }
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), Error> {
        let response = self.with_headers(builder).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(map_error(response).await)
        }
    }
}

async fn invoke<S>(
    cancel: Option<CancellationToken>,
    action: impl Future<Output = Result<S, Error>>,
) -> Result<S, Error> {
    match cancel {
        Some(cancel) => {
            select! {
                _ = cancel.cancelled() => Err(Error::Cancelled),
                v = action => v
            }
        }
        None => action.await,
    }
}

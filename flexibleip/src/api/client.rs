use std::future::Future;

use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use scw_gax::CancellationToken;
use scw_locality::Zone;
use tokio::select;

use crate::api::ips::{
    AttachFlexibleIpsRequest, CreateFlexibleIpRequest, DeleteFlexibleIpRequest,
    DetachFlexibleIpsRequest, FlexibleIp, GetFlexibleIpRequest, UpdateFlexibleIpRequest,
};
use crate::api::macs::{
    DeleteVirtualMacRequest, DuplicateVirtualMacRequest, GenerateVirtualMacRequest,
    MoveVirtualMacRequest,
};
use crate::api::{ips, macs, map_error, Error};

/// Configuration shared by every client the handler builds.
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
            endpoint: "https://api.scaleway.com/flexible-ip/v1alpha1/zones/{zone}".to_string(),
            secret_key: String::new(),
            default_project_id: None,
        }
    }
}

#[derive(Clone)]
pub struct FlexibleIpClient {
    http: ClientWithMiddleware,
    base_url: String,
    secret_key: String,
}

impl FlexibleIpClient {
    pub fn new(config: &ClientConfig, zone: &Zone) -> Self {
        let http =
            reqwest_middleware::ClientBuilder::new(config.http.clone().unwrap_or_default()).build();
        Self {
            http,
            base_url: config.endpoint.replace("{zone}", zone.as_str()),
            secret_key: config.secret_key.clone(),
        }
    }

    pub async fn create_flexible_ip(
        &self,
        req: &CreateFlexibleIpRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FlexibleIp, Error> {
        let action = async {
            let builder = ips::build_create(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_flexible_ip(
        &self,
        req: &GetFlexibleIpRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FlexibleIp, Error> {
        let action = async {
            let builder = ips::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn update_flexible_ip(
        &self,
        req: &UpdateFlexibleIpRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FlexibleIp, Error> {
        let action = async {
            let builder = ips::build_update(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_flexible_ip(
        &self,
        req: &DeleteFlexibleIpRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = ips::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn attach_flexible_ips(
        &self,
        req: &AttachFlexibleIpsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = ips::build_attach(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn detach_flexible_ips(
        &self,
        req: &DetachFlexibleIpsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = ips::build_detach(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn generate_virtual_mac(
        &self,
        req: &GenerateVirtualMacRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FlexibleIp, Error> {
        let action = async {
            let builder = macs::build_generate(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_virtual_mac(
        &self,
        req: &DeleteVirtualMacRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = macs::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn move_virtual_mac(
        &self,
        req: &MoveVirtualMacRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FlexibleIp, Error> {
        let action = async {
            let builder = macs::build_move(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn duplicate_virtual_mac(
        &self,
        req: &DuplicateVirtualMacRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FlexibleIp, Error> {
        let action = async {
            let builder = macs::build_duplicate(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(reqwest::header::USER_AGENT, "scw-flexibleip")
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

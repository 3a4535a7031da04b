use std::future::Future;

use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use scw_gax::CancellationToken;
use scw_locality::Region;
use tokio::select;

use crate::api::clusters::{
    Cluster, CreateClusterRequest, DeleteClusterRequest, GetClusterRequest, UpdateClusterRequest,
};
use crate::api::{clusters, map_error, Error};

/// Configuration shared by every client the handler builds.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub http: Option<reqwest::Client>,
    /// Endpoint template; `{region}` is substituted per client.
    pub endpoint: String,
    pub secret_key: String,
    pub default_project_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http: None,
            endpoint: "https://api.scaleway.com/kafka/v1alpha1/regions/{region}".to_string(),
            secret_key: String::new(),
            default_project_id: None,
        }
    }
}

#[derive(Clone)]
pub struct KafkaClient {
    http: ClientWithMiddleware,
    base_url: String,
    secret_key: String,
}

impl KafkaClient {
    pub fn new(config: &ClientConfig, region: &Region) -> Self {
        let http =
            reqwest_middleware::ClientBuilder::new(config.http.clone().unwrap_or_default()).build();
        Self {
            http,
            base_url: config.endpoint.replace("{region}", region.as_str()),
            secret_key: config.secret_key.clone(),
        }
    }

    pub async fn create_cluster(
        &self,
        req: &CreateClusterRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Cluster, Error> {
        let action = async {
            let builder = clusters::build_create(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_cluster(
        &self,
        req: &GetClusterRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Cluster, Error> {
        let action = async {
            let builder = clusters::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn update_cluster(
        &self,
        req: &UpdateClusterRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Cluster, Error> {
        let action = async {
            let builder = clusters::build_update(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_cluster(
        &self,
        req: &DeleteClusterRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = clusters::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(reqwest::header::USER_AGENT, "scw-kafka")
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

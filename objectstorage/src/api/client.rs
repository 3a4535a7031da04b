use std::future::Future;

use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use scw_gax::CancellationToken;
use scw_locality::Region;
use serde_json::Value;
use tokio::select;

use crate::api::buckets::acl::{GetBucketAclRequest, PutBucketAclRequest};
use crate::api::buckets::cors::{
    CorsConfiguration, DeleteBucketCorsRequest, GetBucketCorsRequest, PutBucketCorsRequest,
};
use crate::api::buckets::create::CreateBucketRequest;
use crate::api::buckets::delete::DeleteBucketRequest;
use crate::api::buckets::get::GetBucketRequest;
use crate::api::buckets::lifecycle::{
    DeleteBucketLifecycleRequest, GetBucketLifecycleRequest, LifecycleConfiguration,
    PutBucketLifecycleRequest,
};
use crate::api::buckets::lock::{GetObjectLockConfigurationRequest, PutObjectLockConfigurationRequest};
use crate::api::buckets::policy::{
    DeleteBucketPolicyRequest, GetBucketPolicyRequest, PutBucketPolicyRequest,
};
use crate::api::buckets::tagging::{
    DeleteBucketTaggingRequest, GetBucketTaggingRequest, PutBucketTaggingRequest, Tagging,
};
use crate::api::buckets::versioning::{GetBucketVersioningRequest, PutBucketVersioningRequest};
use crate::api::buckets::website::{
    DeleteBucketWebsiteRequest, GetBucketWebsiteRequest, PutBucketWebsiteRequest,
};
use crate::api::buckets::{
    self, AccessControlPolicy, Bucket, ObjectLockConfiguration, VersioningConfiguration,
    WebsiteConfiguration,
};
use crate::api::objects::acl::{GetObjectAclRequest, PutObjectAclRequest};
use crate::api::objects::copy::CopyObjectRequest;
use crate::api::objects::delete::DeleteObjectRequest;
use crate::api::objects::head::HeadObjectRequest;
use crate::api::objects::legal_hold::PutObjectLegalHoldRequest;
use crate::api::objects::list_versions::ListObjectVersionsRequest;
use crate::api::objects::put::PutObjectRequest;
use crate::api::objects::tagging::{GetObjectTaggingRequest, PutObjectTaggingRequest};
use crate::api::objects::{self, CopyObjectResult, HeadObjectResult, ListObjectVersionsResponse};
use crate::api::{map_error, Error};

/// Configuration shared by every client the handlers build. Constructing a
/// per-region client from it is cheap and done per call.
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
            endpoint: "https://s3.{region}.scw.cloud".to_string(),
            secret_key: String::new(),
            default_project_id: None,
        }
    }
}

#[derive(Clone)]
pub struct ObjectStorageClient {
    http: ClientWithMiddleware,
    base_url: String,
    secret_key: String,
}

impl ObjectStorageClient {
    pub fn new(config: &ClientConfig, region: &Region) -> Self {
        let http =
            reqwest_middleware::ClientBuilder::new(config.http.clone().unwrap_or_default()).build();
        Self {
            http,
            base_url: config.endpoint.replace("{region}", region.as_str()),
            secret_key: config.secret_key.clone(),
        }
    }

    pub async fn create_bucket(
        &self,
        req: &CreateBucketRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::create::build(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket(
        &self,
        req: &GetBucketRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Bucket, Error> {
        let action = async {
            let builder = buckets::get::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_bucket(
        &self,
        req: &DeleteBucketRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::delete::build(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_acl(
        &self,
        req: &PutBucketAclRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::acl::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_acl(
        &self,
        req: &GetBucketAclRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<AccessControlPolicy, Error> {
        let action = async {
            let builder = buckets::acl::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_policy(
        &self,
        req: &PutBucketPolicyRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::policy::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_policy(
        &self,
        req: &GetBucketPolicyRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Value, Error> {
        let action = async {
            let builder = buckets::policy::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_bucket_policy(
        &self,
        req: &DeleteBucketPolicyRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::policy::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_versioning(
        &self,
        req: &PutBucketVersioningRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::versioning::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_versioning(
        &self,
        req: &GetBucketVersioningRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<VersioningConfiguration, Error> {
        let action = async {
            let builder = buckets::versioning::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_tagging(
        &self,
        req: &PutBucketTaggingRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::tagging::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_tagging(
        &self,
        req: &GetBucketTaggingRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Tagging, Error> {
        let action = async {
            let builder = buckets::tagging::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_bucket_tagging(
        &self,
        req: &DeleteBucketTaggingRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::tagging::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_cors(
        &self,
        req: &PutBucketCorsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::cors::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_cors(
        &self,
        req: &GetBucketCorsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<CorsConfiguration, Error> {
        let action = async {
            let builder = buckets::cors::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_bucket_cors(
        &self,
        req: &DeleteBucketCorsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::cors::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_lifecycle(
        &self,
        req: &PutBucketLifecycleRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::lifecycle::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_lifecycle(
        &self,
        req: &GetBucketLifecycleRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<LifecycleConfiguration, Error> {
        let action = async {
            let builder = buckets::lifecycle::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_bucket_lifecycle(
        &self,
        req: &DeleteBucketLifecycleRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::lifecycle::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_bucket_website(
        &self,
        req: &PutBucketWebsiteRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::website::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_bucket_website(
        &self,
        req: &GetBucketWebsiteRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<WebsiteConfiguration, Error> {
        let action = async {
            let builder = buckets::website::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_bucket_website(
        &self,
        req: &DeleteBucketWebsiteRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::website::build_delete(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_object_lock_configuration(
        &self,
        req: &PutObjectLockConfigurationRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = buckets::lock::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_object_lock_configuration(
        &self,
        req: &GetObjectLockConfigurationRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ObjectLockConfiguration, Error> {
        let action = async {
            let builder = buckets::lock::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_object(
        &self,
        req: &PutObjectRequest,
        body: Vec<u8>,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = objects::put::build(&self.base_url, &self.http, req, body);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn head_object(
        &self,
        req: &HeadObjectRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<HeadObjectResult, Error> {
        let action = async {
            let builder = objects::head::build(&self.base_url, &self.http, req);
            self.send_head(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn copy_object(
        &self,
        req: &CopyObjectRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<CopyObjectResult, Error> {
        let action = async {
            let builder = objects::copy::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn delete_object(
        &self,
        req: &DeleteObjectRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = objects::delete::build(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn list_object_versions(
        &self,
        req: &ListObjectVersionsRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ListObjectVersionsResponse, Error> {
        let action = async {
            let builder = objects::list_versions::build(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_object_tagging(
        &self,
        req: &PutObjectTaggingRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = objects::tagging::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_object_tagging(
        &self,
        req: &GetObjectTaggingRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Tagging, Error> {
        let action = async {
            let builder = objects::tagging::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_object_acl(
        &self,
        req: &PutObjectAclRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = objects::acl::build_put(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn get_object_acl(
        &self,
        req: &GetObjectAclRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<AccessControlPolicy, Error> {
        let action = async {
            let builder = objects::acl::build_get(&self.base_url, &self.http, req);
            self.send(builder).await
        };
        invoke(cancel, action).await
    }

    pub async fn put_object_legal_hold(
        &self,
        req: &PutObjectLegalHoldRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<(), Error> {
        let action = async {
            let builder = objects::legal_hold::build(&self.base_url, &self.http, req);
            self.send_empty(builder).await
        };
        invoke(cancel, action).await
    }

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(reqwest::header::USER_AGENT, "scw-objectstorage")
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

    /// HEAD responses carry everything in headers; assemble the result
    /// without touching the (empty) body.
    async fn send_head(&self, builder: RequestBuilder) -> Result<HeadObjectResult, Error> {
        let response = self.with_headers(builder).send().await?;
        if !response.status().is_success() {
            return Err(map_error(response).await);
        }
        let headers = response.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let mut metadata = std::collections::HashMap::new();
        for (name, value) in headers {
            let name = name.as_str();
            if let Some(meta_key) = name.strip_prefix("x-amz-meta-") {
                if let Ok(value) = value.to_str() {
                    metadata.insert(meta_key.to_ascii_lowercase(), value.to_string());
                }
            }
        }
        Ok(HeadObjectResult {
            content_type: header("content-type"),
            content_length: header("content-length").and_then(|v| v.parse().ok()),
            metadata,
            storage_class: header("x-amz-storage-class"),
            legal_hold_status: header("x-amz-object-lock-legal-hold"),
        })
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

//! The bucket-policy sub-resource handler. Policies are JSON documents
//! compared by semantic equivalence, never byte equality.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_locality::Region;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, ResourceData, ResourceHandler, Schema, Timeouts,
};
use serde_json::Value;

use crate::api::buckets::policy::{
    DeleteBucketPolicyRequest, GetBucketPolicyRequest, PutBucketPolicyRequest,
};
use crate::api::client::{ClientConfig, ObjectStorageClient};

pub struct BucketPolicyHandler {
    config: ClientConfig,
}

impl BucketPolicyHandler {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, data: &ResourceData) -> Result<(Region, String), Diagnostic> {
        if let Some(id) = data.id() {
            let (region, bucket) = scw_locality::id::parse_regional(id)?;
            return Ok((region, bucket));
        }
        let region = data
            .get_string("region")
            .ok_or_else(|| Diagnostic::error("region is not configured").with_attribute("region"))?;
        let region = Region::from_str(&region)?;
        let bucket = data
            .get_string("bucket")
            .map(|b| scw_locality::id::strip(&b).to_string())
            .ok_or_else(|| Diagnostic::error("bucket is required").with_attribute("bucket"))?;
        Ok((region, bucket))
    }

    async fn apply(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let (region, bucket) = self.resolve(data)?;
        let policy = data
            .get_string("policy")
            .ok_or_else(|| Diagnostic::error("policy is required").with_attribute("policy"))?;
        let policy: Value = serde_json::from_str(&policy).map_err(|e| {
            Diagnostic::error(format!("policy is not valid JSON: {e}")).with_attribute("policy")
        })?;
        let client = ObjectStorageClient::new(&self.config, &region);
        let req = PutBucketPolicyRequest {
            bucket: bucket.clone(),
            policy,
        };
        client.put_bucket_policy(&req, ctx.cancel.clone()).await?;
        data.set_id(scw_locality::id::regional(&region, &bucket));
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for BucketPolicyHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "bucket_policy",
            attributes: vec![
                Attribute::string("bucket")
                    .required()
                    .force_new()
                    .suppress(scw_schema::suppress::locality_stripped),
                Attribute::string("policy")
                    .required()
                    .suppress(scw_schema::suppress::policy),
                Attribute::string("region").optional().computed().force_new(),
                Attribute::string("project_id")
                    .optional()
                    .computed()
                    .force_new(),
            ],
            timeouts: Timeouts::uniform(Duration::from_secs(10 * 60)),
        }
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if let Err(d) = self.apply(ctx, data).await {
            return d.into();
        }
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (region, bucket) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = ObjectStorageClient::new(&self.config, &region);
        let req = GetBucketPolicyRequest {
            bucket: bucket.clone(),
        };
        match client.get_bucket_policy(&req, ctx.cancel.clone()).await {
            Ok(policy) => {
                data.set("bucket", &bucket);
                data.set("region", region.to_string());
                data.set("policy", policy.to_string());
                Diagnostics::new()
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(bucket, "bucket policy is gone, removing it from state");
                data.clear_id();
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error(e),
        }
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if data.has_change("policy") {
            if let Err(d) = self.apply(ctx, data).await {
                return d.into();
            }
        }
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let (region, bucket) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = ObjectStorageClient::new(&self.config, &region);
        let req = DeleteBucketPolicyRequest { bucket };
        match client.delete_bucket_policy(&req, ctx.cancel.clone()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Diagnostics::from_error(e),
        }
        data.clear_id();
        Diagnostics::new()
    }
}

#[cfg(test)]
mod test {
    use scw_schema::suppress::eq_policy;

    #[test]
    fn reordered_policy_fields_are_equivalent() {
        let a = r#"{"Version":"2023-04-17","Statement":[{"Effect":"Allow","Action":["s3:*"]}]}"#;
        let b = r#"{
            "Statement": [{"Action": ["s3:*"], "Effect": "Allow"}],
            "Version": "2023-04-17"
        }"#;
        assert!(eq_policy(a, b));
        let c = r#"{"Version":"2023-04-17","Statement":[{"Effect":"Deny","Action":["s3:*"]}]}"#;
        assert!(!eq_policy(a, c));
    }
}

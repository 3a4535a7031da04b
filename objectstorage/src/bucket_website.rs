//! The bucket website-configuration sub-resource handler.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_locality::Region;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, ResourceData, ResourceHandler, Schema, Timeouts,
};
use serde_json::{json, Value};

use crate::api::buckets::website::{
    DeleteBucketWebsiteRequest, GetBucketWebsiteRequest, PutBucketWebsiteRequest,
};
use crate::api::buckets::{WebsiteConfiguration, WebsiteErrorDocument, WebsiteIndexDocument};
use crate::api::client::{ClientConfig, ObjectStorageClient};

pub struct BucketWebsiteHandler {
    config: ClientConfig,
}

impl BucketWebsiteHandler {
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
        let configuration = expand_website(data)?;
        let client = ObjectStorageClient::new(&self.config, &region);
        let req = PutBucketWebsiteRequest {
            bucket: bucket.clone(),
            website_configuration: configuration,
        };
        client.put_bucket_website(&req, ctx.cancel.clone()).await?;
        data.set_id(scw_locality::id::regional(&region, &bucket));
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for BucketWebsiteHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "bucket_website_configuration",
            attributes: vec![
                Attribute::string("bucket")
                    .required()
                    .force_new()
                    .suppress(scw_schema::suppress::locality_stripped),
                Attribute::block(
                    "index_document",
                    vec![Attribute::string("suffix").required()],
                ),
                Attribute::block("error_document", vec![Attribute::string("key").required()]),
                Attribute::string("website_endpoint").computed(),
                Attribute::string("website_domain").computed(),
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
        let req = GetBucketWebsiteRequest {
            bucket: bucket.clone(),
        };
        match client.get_bucket_website(&req, ctx.cancel.clone()).await {
            Ok(configuration) => {
                data.set("bucket", &bucket);
                data.set("region", region.to_string());
                if let Some(index) = &configuration.index_document {
                    data.set("index_document", json!([{ "suffix": index.suffix }]));
                }
                if let Some(error) = &configuration.error_document {
                    data.set("error_document", json!([{ "key": error.key }]));
                }
                data.set("website_endpoint", website_endpoint(&region, &bucket));
                data.set("website_domain", website_domain(&region));
                Diagnostics::new()
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(bucket, "website configuration is gone, removing it from state");
                data.clear_id();
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error(e),
        }
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if data.any_change(&["index_document", "error_document"]) {
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
        let req = DeleteBucketWebsiteRequest { bucket };
        match client.delete_bucket_website(&req, ctx.cancel.clone()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Diagnostics::from_error(e),
        }
        data.clear_id();
        Diagnostics::new()
    }
}

fn expand_website(data: &ResourceData) -> Result<WebsiteConfiguration, Diagnostic> {
    let first = |value: Option<&Value>| -> Option<Value> {
        match value {
            Some(Value::Array(items)) => items.first().cloned(),
            Some(object @ Value::Object(_)) => Some(object.clone()),
            _ => None,
        }
    };
    let index_document = first(data.get("index_document"))
        .and_then(|b| b.get("suffix").and_then(Value::as_str).map(str::to_string))
        .map(|suffix| WebsiteIndexDocument { suffix });
    if index_document.is_none() {
        return Err(
            Diagnostic::error("index_document.suffix is required").with_attribute("index_document")
        );
    }
    let error_document = first(data.get("error_document"))
        .and_then(|b| b.get("key").and_then(Value::as_str).map(str::to_string))
        .map(|key| WebsiteErrorDocument { key });
    Ok(WebsiteConfiguration {
        index_document,
        error_document,
    })
}

fn website_endpoint(region: &Region, bucket: &str) -> String {
    format!("https://{bucket}.s3-website.{region}.scw.cloud")
}

fn website_domain(region: &Region) -> String {
    format!("s3-website.{region}.scw.cloud")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expand_requires_an_index_document() {
        let data = ResourceData::from_config(json!({}));
        assert!(expand_website(&data).is_err());

        let data = ResourceData::from_config(json!({
            "index_document": [{"suffix": "index.html"}],
            "error_document": [{"key": "error.html"}],
        }));
        let configuration = expand_website(&data).unwrap();
        assert_eq!(configuration.index_document.unwrap().suffix, "index.html");
        assert_eq!(configuration.error_document.unwrap().key, "error.html");
    }

    #[test]
    fn endpoints_are_derived_from_region_and_bucket() {
        let region: Region = "nl-ams".parse().unwrap();
        assert_eq!(
            website_endpoint(&region, "my-site"),
            "https://my-site.s3-website.nl-ams.scw.cloud"
        );
        assert_eq!(website_domain(&region), "s3-website.nl-ams.scw.cloud");
    }
}

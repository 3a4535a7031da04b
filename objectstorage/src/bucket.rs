//! The bucket resource handler.
//!
//! Each bucket sub-configuration (ACL, versioning, tags, CORS, lifecycle) is
//! reconciled independently, so a failure to read one of them never blocks
//! the rest of the state from being populated.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use scw_locality::Region;
use scw_schema::hash::hash_string;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, PlanError, ResourceData, ResourceDiff,
    ResourceHandler, Schema, Timeouts, Validator,
};
use serde_json::{json, Value};

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
use crate::api::buckets::tagging::{
    DeleteBucketTaggingRequest, GetBucketTaggingRequest, PutBucketTaggingRequest, Tagging,
};
use crate::api::buckets::versioning::{GetBucketVersioningRequest, PutBucketVersioningRequest};
use crate::api::buckets::{
    acl, tags_from_map, tags_to_map, AbortIncompleteMultipartUpload, CorsRule,
    LifecycleExpiration, LifecycleFilter, LifecycleFilterAnd, LifecycleRule, LifecycleTransition,
    RuleStatus, VersioningConfiguration, VersioningStatus,
};
use crate::api::client::{ClientConfig, ObjectStorageClient};
use crate::bucket_empty;

const TRANSITION_STORAGE_CLASSES: &[&str] = &["STANDARD", "GLACIER", "ONEZONE_IA"];
const LIFECYCLE_ID_PREFIX: &str = "tf-scw-bucket-lifecycle-";

pub struct BucketHandler {
    config: ClientConfig,
}

impl BucketHandler {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Region and bucket name, from the identifier when present, from the
    /// configuration otherwise.
    fn resolve(&self, data: &ResourceData) -> Result<(Region, String), Diagnostic> {
        if let Some(id) = data.id() {
            let (region, name) = scw_locality::id::parse_regional(id)?;
            return Ok((region, name));
        }
        let region = data
            .get_string("region")
            .ok_or_else(|| Diagnostic::error("region is not configured").with_attribute("region"))?;
        let region = Region::from_str(&region)?;
        let name = data
            .get_string("name")
            .ok_or_else(|| Diagnostic::error("bucket name is required").with_attribute("name"))?;
        Ok((region, name))
    }

    fn client(&self, region: &Region) -> ObjectStorageClient {
        ObjectStorageClient::new(&self.config, region)
    }

    async fn do_create(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let (region, name) = self.resolve(data)?;
        let client = self.client(&region);
        let req = CreateBucketRequest {
            name: name.clone(),
            project_id: data
                .get_string("project_id")
                .or_else(|| self.config.default_project_id.clone()),
            object_lock_enabled_for_bucket: data.get_bool("object_lock_enabled", false),
        };
        // one retry on 503 / conflicting operation in progress
        let retry = scw_gax::retry::RetrySetting {
            take: 1,
            ..Default::default()
        };
        scw_gax::retry::invoke(ctx.cancel.clone(), Some(retry), || {
            client.create_bucket(&req, ctx.cancel.clone())
        })
        .await?;
        data.set_id(scw_locality::id::regional(&region, &name));

        if let Some(canned) = data.get_desired("acl").and_then(Value::as_str) {
            let req = acl::PutBucketAclRequest {
                bucket: name.clone(),
                acl: Some(canned.to_string()),
                ..Default::default()
            };
            client.put_bucket_acl(&req, ctx.cancel.clone()).await?;
        }
        Ok(())
    }

    /// Shared by Create and Update: pushes each changed sub-configuration.
    async fn reconcile(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let (region, name) = self.resolve(data)?;
        let client = self.client(&region);
        let cancel = ctx.cancel.clone();

        if data.has_change("acl") {
            if let Some(canned) = data.get_string("acl") {
                let req = acl::PutBucketAclRequest {
                    bucket: name.clone(),
                    acl: Some(canned),
                    ..Default::default()
                };
                client.put_bucket_acl(&req, cancel.clone()).await?;
            }
        }

        if !data.get_bool("object_lock_enabled", false) && data.has_change("versioning") {
            let status = if versioning_enabled(data.get("versioning")) {
                VersioningStatus::Enabled
            } else {
                VersioningStatus::Suspended
            };
            let req = PutBucketVersioningRequest {
                bucket: name.clone(),
                versioning_configuration: VersioningConfiguration {
                    status: Some(status),
                },
            };
            client.put_bucket_versioning(&req, cancel.clone()).await?;
        }

        if data.has_change("tags") {
            let tags: HashMap<String, String> = data.typed("tags").unwrap_or_default();
            if tags.is_empty() {
                let req = DeleteBucketTaggingRequest {
                    bucket: name.clone(),
                };
                client.delete_bucket_tagging(&req, cancel.clone()).await?;
            } else {
                let req = PutBucketTaggingRequest {
                    bucket: name.clone(),
                    tagging: Tagging {
                        tag_set: tags_from_map(&tags),
                    },
                };
                client.put_bucket_tagging(&req, cancel.clone()).await?;
            }
        }

        if data.has_change("cors_rule") {
            let rules = expand_cors(data.get("cors_rule"));
            if rules.is_empty() {
                let req = DeleteBucketCorsRequest {
                    bucket: name.clone(),
                };
                client.delete_bucket_cors(&req, cancel.clone()).await?;
            } else {
                let req = PutBucketCorsRequest {
                    bucket: name.clone(),
                    cors_configuration: CorsConfiguration { cors_rules: rules },
                };
                client.put_bucket_cors(&req, cancel.clone()).await?;
            }
        }

        if data.has_change("lifecycle_rule") {
            let rules = expand_lifecycle(data.get("lifecycle_rule"))?;
            if rules.is_empty() {
                let req = DeleteBucketLifecycleRequest {
                    bucket: name.clone(),
                };
                client.delete_bucket_lifecycle(&req, cancel.clone()).await?;
            } else {
                let req = PutBucketLifecycleRequest {
                    bucket: name.clone(),
                    lifecycle_configuration: LifecycleConfiguration { rules },
                };
                client.put_bucket_lifecycle(&req, cancel.clone()).await?;
            }
        }
        Ok(())
    }

    async fn do_delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let (region, name) = self.resolve(data)?;
        let client = self.client(&region);
        let req = DeleteBucketRequest {
            bucket: name.clone(),
        };
        match client.delete_bucket(&req, ctx.cancel.clone()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) if e.is_bucket_not_empty() => {
                if !data.get_bool("force_destroy", false) {
                    return Err(Diagnostic::error(
                        "bucket is not empty, set force_destroy to delete it anyway",
                    )
                    .with_attribute("force_destroy"));
                }
                bucket_empty::empty_bucket(&client, &name, ctx.cancel.clone())
                    .await
                    .map_err(|e| Diagnostic::error(e.to_string()))?;
                match client.delete_bucket(&req, ctx.cancel.clone()).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }
        data.clear_id();
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for BucketHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "bucket",
            attributes: vec![
                Attribute::string("name")
                    .required()
                    .force_new()
                    .validator(Validator::StringLen { min: 1, max: 63 }),
                Attribute::bool("object_lock_enabled")
                    .optional()
                    .force_new()
                    .default_value(json!(false)),
                Attribute::string("acl")
                    .optional()
                    .deprecated("use the bucket ACL resource instead")
                    .default_value(json!("private")),
                Attribute::map("tags").optional(),
                Attribute::string("endpoint").computed(),
                Attribute::string("api_endpoint").computed(),
                Attribute::list("cors_rule").optional().elem_of(vec![
                    Attribute::list("allowed_headers").optional(),
                    Attribute::list("allowed_methods").required(),
                    Attribute::list("allowed_origins").required(),
                    Attribute::list("expose_headers").optional(),
                    Attribute::int("max_age_seconds").optional(),
                ]),
                Attribute::bool("force_destroy")
                    .optional()
                    .default_value(json!(false)),
                Attribute::list("lifecycle_rule").optional().elem_of(vec![
                    Attribute::string("id").optional().computed(),
                    Attribute::string("prefix").optional(),
                    Attribute::map("tags").optional(),
                    Attribute::bool("enabled").required(),
                    Attribute::int("abort_incomplete_multipart_upload_days").optional(),
                    Attribute::block("expiration", vec![Attribute::int("days").required()]),
                    Attribute::set("transition")
                        .optional()
                        .hash_with(transition_hash)
                        .elem_of(vec![
                            Attribute::int("days").optional(),
                            Attribute::string("storage_class")
                                .required()
                                .validator(Validator::OneOf(TRANSITION_STORAGE_CLASSES)),
                        ]),
                ]),
                Attribute::string("region").optional().computed().force_new(),
                Attribute::string("project_id")
                    .optional()
                    .computed()
                    .force_new(),
                Attribute::block(
                    "versioning",
                    vec![Attribute::bool("enabled")
                        .optional()
                        .default_value(json!(false))],
                ),
            ],
            timeouts: Timeouts::uniform(Duration::from_secs(10 * 60)),
        }
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if let Err(d) = self.do_create(ctx, data).await {
            return d.into();
        }
        if let Err(d) = self.reconcile(ctx, data).await {
            return d.into();
        }
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let (region, name) = match self.resolve(data) {
            Ok(v) => v,
            Err(d) => return d.into(),
        };
        let client = self.client(&region);
        let cancel = ctx.cancel.clone();

        let bucket = match client
            .get_bucket(
                &GetBucketRequest {
                    bucket: name.clone(),
                },
                cancel.clone(),
            )
            .await
        {
            Ok(bucket) => bucket,
            Err(e) if e.is_not_found() => {
                tracing::warn!(bucket = %name, "bucket is gone, removing it from state");
                data.clear_id();
                return diags;
            }
            Err(e) => return Diagnostics::from_error(e),
        };
        data.set("name", &name);
        data.set("region", region.to_string());
        data.set("endpoint", bucket_endpoint(&region, &name));
        data.set("api_endpoint", api_endpoint(&region));
        data.set("object_lock_enabled", bucket.object_lock_enabled);
        if !bucket.project_id.is_empty() {
            data.set("project_id", &bucket.project_id);
        }

        // 403 on a sub-configuration becomes a warning carrying the
        // attribute path; the rest of the state is still populated.
        match client
            .get_bucket_tagging(
                &GetBucketTaggingRequest {
                    bucket: name.clone(),
                },
                cancel.clone(),
            )
            .await
        {
            Ok(tagging) => data.set("tags", tags_to_map(&tagging.tag_set)),
            Err(e) if e.is_not_found() => data.set("tags", HashMap::<String, String>::new()),
            Err(e) if e.is_forbidden() => diags.push(
                Diagnostic::warning(format!("couldn't read bucket tags: {e}"))
                    .with_attribute("tags"),
            ),
            Err(e) => {
                diags.push(e.into());
                return diags;
            }
        }

        match client
            .get_bucket_cors(
                &GetBucketCorsRequest {
                    bucket: name.clone(),
                },
                cancel.clone(),
            )
            .await
        {
            Ok(cors) => data.set("cors_rule", flatten_cors(&cors.cors_rules)),
            Err(e) if e.is_not_found() => data.set("cors_rule", Value::Array(Vec::new())),
            Err(e) if e.is_forbidden() => diags.push(
                Diagnostic::warning(format!("couldn't read bucket CORS rules: {e}"))
                    .with_attribute("cors_rule"),
            ),
            Err(e) => {
                diags.push(e.into());
                return diags;
            }
        }

        match client
            .get_bucket_lifecycle(
                &GetBucketLifecycleRequest {
                    bucket: name.clone(),
                },
                cancel.clone(),
            )
            .await
        {
            Ok(lifecycle) => data.set("lifecycle_rule", flatten_lifecycle(&lifecycle.rules)),
            Err(e) if e.is_not_found() => data.set("lifecycle_rule", Value::Array(Vec::new())),
            Err(e) if e.is_forbidden() => diags.push(
                Diagnostic::warning(format!("couldn't read bucket lifecycle rules: {e}"))
                    .with_attribute("lifecycle_rule"),
            ),
            Err(e) => {
                diags.push(e.into());
                return diags;
            }
        }

        match client
            .get_bucket_versioning(
                &GetBucketVersioningRequest {
                    bucket: name.clone(),
                },
                cancel.clone(),
            )
            .await
        {
            Ok(versioning) => {
                let enabled = versioning.status == Some(VersioningStatus::Enabled);
                data.set("versioning", json!([{ "enabled": enabled }]));
            }
            Err(e) if e.is_not_found() => {
                data.set("versioning", json!([{ "enabled": false }]));
            }
            Err(e) if e.is_forbidden() => diags.push(
                Diagnostic::warning(format!("couldn't read bucket versioning: {e}"))
                    .with_attribute("versioning"),
            ),
            Err(e) => {
                diags.push(e.into());
                return diags;
            }
        }

        diags
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if let Err(d) = self.reconcile(ctx, data).await {
            return d.into();
        }
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        match self.do_delete(ctx, data).await {
            Ok(()) => Diagnostics::new(),
            Err(d) => d.into(),
        }
    }

    async fn customize_diff(
        &self,
        _ctx: &Context,
        diff: &mut ResourceDiff,
        _data: &ResourceData,
    ) -> Result<(), PlanError> {
        let lock_enabled = diff
            .new_value("object_lock_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if lock_enabled && !versioning_enabled(diff.new_value("versioning")) {
            return Err(PlanError::new(
                "versioning must be enabled when object lock is enabled",
            ));
        }
        Ok(())
    }
}

/// Stable identity of one lifecycle transition, insensitive to ordering
/// inside the set.
pub fn transition_hash(element: &Value) -> u64 {
    let days = element.get("days").and_then(Value::as_i64).unwrap_or(0);
    let class = element
        .get("storage_class")
        .and_then(Value::as_str)
        .unwrap_or("");
    hash_string(&format!("{days}-{class}-"))
}

fn bucket_endpoint(region: &Region, name: &str) -> String {
    format!("https://{name}.s3.{region}.scw.cloud")
}

fn api_endpoint(region: &Region) -> String {
    format!("https://s3.{region}.scw.cloud")
}

/// A block attribute arrives either as a single object or as a
/// list-of-one; accept both.
fn first_block(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Array(items) => items.first(),
        object @ Value::Object(_) => Some(object),
        _ => None,
    }
}

fn versioning_enabled(value: Option<&Value>) -> bool {
    first_block(value)
        .and_then(|b| b.get("enabled"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn expand_cors(value: Option<&Value>) -> Vec<CorsRule> {
    let Some(Value::Array(rules)) = value else {
        return Vec::new();
    };
    rules
        .iter()
        .map(|rule| {
            let strings = |key: &str| -> Vec<String> {
                rule.get(key)
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default()
            };
            CorsRule {
                allowed_headers: strings("allowed_headers"),
                allowed_methods: strings("allowed_methods"),
                allowed_origins: strings("allowed_origins"),
                expose_headers: strings("expose_headers"),
                max_age_seconds: rule.get("max_age_seconds").and_then(Value::as_i64),
            }
        })
        .collect()
}

fn flatten_cors(rules: &[CorsRule]) -> Value {
    Value::Array(
        rules
            .iter()
            .map(|rule| {
                json!({
                    "allowed_headers": rule.allowed_headers,
                    "allowed_methods": rule.allowed_methods,
                    "allowed_origins": rule.allowed_origins,
                    "expose_headers": rule.expose_headers,
                    "max_age_seconds": rule.max_age_seconds,
                })
            })
            .collect(),
    )
}

/// Maps configured lifecycle rules to the API form, choosing the filter
/// shape from the prefix/tags combination and generating ids where the
/// user supplied none.
fn expand_lifecycle(value: Option<&Value>) -> Result<Vec<LifecycleRule>, Diagnostic> {
    let Some(Value::Array(rules)) = value else {
        return Ok(Vec::new());
    };
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            expand_lifecycle_rule(rule)
                .map_err(|e| Diagnostic::error(e).with_attribute(format!("lifecycle_rule.{i}")))
        })
        .collect()
}

fn expand_lifecycle_rule(rule: &Value) -> Result<LifecycleRule, String> {
    let prefix = rule
        .get("prefix")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let tags: HashMap<String, String> = rule
        .get("tags")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let tags = tags_from_map(&tags);

    let filter = if tags.len() >= 2 || (tags.len() == 1 && !prefix.is_empty()) {
        LifecycleFilter {
            and: Some(LifecycleFilterAnd {
                prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
                tags,
            }),
            ..Default::default()
        }
    } else if tags.len() == 1 {
        LifecycleFilter {
            tag: tags.into_iter().next(),
            ..Default::default()
        }
    } else if !prefix.is_empty() {
        LifecycleFilter {
            prefix: Some(prefix.to_string()),
            ..Default::default()
        }
    } else {
        LifecycleFilter::default()
    };

    let id = match rule.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_lifecycle_id(),
    };
    let enabled = rule
        .get("enabled")
        .and_then(Value::as_bool)
        .ok_or("enabled is required")?;

    let expiration = first_block(rule.get("expiration"))
        .and_then(|b| b.get("days"))
        .and_then(Value::as_i64)
        .map(|days| LifecycleExpiration { days });

    let transitions = rule
        .get("transition")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|t| {
                    Ok(LifecycleTransition {
                        days: t.get("days").and_then(Value::as_i64).unwrap_or(0),
                        storage_class: t
                            .get("storage_class")
                            .and_then(Value::as_str)
                            .ok_or("transition storage_class is required")?
                            .to_string(),
                    })
                })
                .collect::<Result<Vec<_>, String>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(LifecycleRule {
        id,
        status: if enabled {
            RuleStatus::Enabled
        } else {
            RuleStatus::Disabled
        },
        filter,
        abort_incomplete_multipart_upload: rule
            .get("abort_incomplete_multipart_upload_days")
            .and_then(Value::as_i64)
            .filter(|days| *days > 0)
            .map(|days| AbortIncompleteMultipartUpload {
                days_after_initiation: days,
            }),
        expiration,
        transitions,
    })
}

fn generate_lifecycle_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{LIFECYCLE_ID_PREFIX}{}", suffix.to_ascii_lowercase())
}

fn flatten_lifecycle(rules: &[LifecycleRule]) -> Value {
    Value::Array(rules.iter().map(flatten_lifecycle_rule).collect())
}

fn flatten_lifecycle_rule(rule: &LifecycleRule) -> Value {
    let (prefix, tags) = match (&rule.filter.and, &rule.filter.tag, &rule.filter.prefix) {
        (Some(and), _, _) => (and.prefix.clone().unwrap_or_default(), and.tags.clone()),
        (None, Some(tag), _) => (String::new(), vec![tag.clone()]),
        (None, None, Some(prefix)) => (prefix.clone(), Vec::new()),
        (None, None, None) => (String::new(), Vec::new()),
    };
    json!({
        "id": rule.id,
        "prefix": prefix,
        "tags": tags_to_map(&tags),
        "enabled": rule.status == RuleStatus::Enabled,
        "abort_incomplete_multipart_upload_days": rule
            .abort_incomplete_multipart_upload
            .as_ref()
            .map(|a| a.days_after_initiation)
            .unwrap_or(0),
        "expiration": rule
            .expiration
            .as_ref()
            .map(|e| json!([{ "days": e.days }]))
            .unwrap_or_else(|| json!([])),
        "transition": rule
            .transitions
            .iter()
            .map(|t| json!({ "days": t.days, "storage_class": t.storage_class }))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[ctor::ctor]
    fn init() {
        let _ = tracing_subscriber::fmt().try_init();
    }

    #[test]
    fn transition_hash_ignores_field_order() {
        let a = json!({"days": 30, "storage_class": "GLACIER"});
        let b = json!({"storage_class": "GLACIER", "days": 30});
        assert_eq!(transition_hash(&a), transition_hash(&b));
        let c = json!({"days": 31, "storage_class": "GLACIER"});
        assert_ne!(transition_hash(&a), transition_hash(&c));
    }

    #[test]
    fn lifecycle_filter_uses_and_for_multiple_tags() {
        let rule = json!({
            "enabled": true,
            "prefix": "logs/",
            "tags": {"team": "core", "env": "prod"},
        });
        let expanded = expand_lifecycle_rule(&rule).unwrap();
        let and = expanded.filter.and.unwrap();
        assert_eq!(and.prefix.as_deref(), Some("logs/"));
        assert_eq!(and.tags.len(), 2);
        // sorted by key for stable output
        assert_eq!(and.tags[0].key, "env");
        assert!(expanded.filter.tag.is_none());
        assert!(expanded.filter.prefix.is_none());
    }

    #[test]
    fn lifecycle_filter_single_tag_with_prefix_is_an_and() {
        let rule = json!({
            "enabled": true,
            "prefix": "logs/",
            "tags": {"team": "core"},
        });
        let expanded = expand_lifecycle_rule(&rule).unwrap();
        assert!(expanded.filter.and.is_some());
    }

    #[test]
    fn lifecycle_filter_single_tag_without_prefix() {
        let rule = json!({
            "enabled": true,
            "tags": {"team": "core"},
        });
        let expanded = expand_lifecycle_rule(&rule).unwrap();
        let tag = expanded.filter.tag.unwrap();
        assert_eq!(tag.key, "team");
        assert!(expanded.filter.and.is_none());
    }

    #[test]
    fn lifecycle_filter_prefix_only_and_empty() {
        let prefix_only = expand_lifecycle_rule(&json!({
            "enabled": true,
            "prefix": "logs/",
        }))
        .unwrap();
        assert_eq!(prefix_only.filter.prefix.as_deref(), Some("logs/"));

        let empty = expand_lifecycle_rule(&json!({"enabled": false})).unwrap();
        assert_eq!(empty.filter, LifecycleFilter::default());
        assert_eq!(empty.status, RuleStatus::Disabled);
    }

    #[test]
    fn lifecycle_id_generated_when_missing() {
        let rule = json!({"enabled": true});
        let expanded = expand_lifecycle_rule(&rule).unwrap();
        assert!(expanded.id.starts_with(LIFECYCLE_ID_PREFIX));

        let named = expand_lifecycle_rule(&json!({"enabled": true, "id": "keep-me"})).unwrap();
        assert_eq!(named.id, "keep-me");
    }

    #[test]
    fn lifecycle_round_trip_preserves_semantics() {
        let configured = json!([{
            "id": "rule-1",
            "enabled": true,
            "prefix": "tmp/",
            "abort_incomplete_multipart_upload_days": 7,
            "expiration": [{"days": 30}],
            "transition": [{"days": 10, "storage_class": "GLACIER"}],
        }]);
        let expanded = expand_lifecycle(Some(&configured)).unwrap();
        let flattened = flatten_lifecycle(&expanded);
        let rule = &flattened.as_array().unwrap()[0];
        assert_eq!(rule["id"], "rule-1");
        assert_eq!(rule["prefix"], "tmp/");
        assert_eq!(rule["enabled"], true);
        assert_eq!(rule["abort_incomplete_multipart_upload_days"], 7);
        assert_eq!(rule["expiration"][0]["days"], 30);
        assert_eq!(rule["transition"][0]["storage_class"], "GLACIER");
    }

    #[test]
    fn cors_expand_and_flatten() {
        let configured = json!([{
            "allowed_methods": ["GET", "PUT"],
            "allowed_origins": ["https://example.com"],
            "max_age_seconds": 3600,
        }]);
        let expanded = expand_cors(Some(&configured));
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].allowed_methods, ["GET", "PUT"]);
        assert_eq!(expanded[0].max_age_seconds, Some(3600));
        let flattened = flatten_cors(&expanded);
        assert_eq!(flattened[0]["allowed_origins"][0], "https://example.com");
    }

    #[tokio::test]
    async fn object_lock_requires_versioning() {
        let handler = BucketHandler::new(ClientConfig::default());
        let ctx = Context::background();
        let mut diff = ResourceDiff::new(
            None,
            json!({}),
            json!({"object_lock_enabled": true, "versioning": [{"enabled": false}]}),
        );
        let err = handler
            .customize_diff(&ctx, &mut diff, &ResourceData::default())
            .await
            .unwrap_err();
        assert!(err.0.contains("versioning must be enabled"));

        let mut ok = ResourceDiff::new(
            None,
            json!({}),
            json!({"object_lock_enabled": true, "versioning": [{"enabled": true}]}),
        );
        handler
            .customize_diff(&ctx, &mut ok, &ResourceData::default())
            .await
            .unwrap();
    }

    #[test]
    fn versioning_block_accepts_both_shapes() {
        assert!(versioning_enabled(Some(&json!([{"enabled": true}]))));
        assert!(versioning_enabled(Some(&json!({"enabled": true}))));
        assert!(!versioning_enabled(Some(&json!([]))));
        assert!(!versioning_enabled(None));
    }

    fn live_config() -> ClientConfig {
        ClientConfig {
            secret_key: std::env::var("SCW_SECRET_KEY").unwrap(),
            default_project_id: std::env::var("SCW_DEFAULT_PROJECT_ID").ok(),
            ..Default::default()
        }
    }

    fn unique_bucket_name(prefix: &str) -> String {
        format!("{prefix}-{}", generate_lifecycle_id().split_off(LIFECYCLE_ID_PREFIX.len()))
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial_test::serial]
    #[ignore] // needs live credentials
    async fn force_destroy_evicts_versions_and_markers() {
        let handler = BucketHandler::new(live_config());
        let name = unique_bucket_name("force-destroy");
        let ctx = scw_schema::Context::background();
        let mut data = ResourceData::from_config(json!({
            "name": name,
            "region": "fr-par",
            "force_destroy": true,
            "versioning": [{"enabled": true}],
        }));
        assert!(!handler.create(&ctx, &mut data).await.has_error());

        let object = crate::object::ObjectHandler::new(live_config());
        for i in 0..17 {
            let mut obj = ResourceData::from_config(json!({
                "bucket": name,
                "region": "fr-par",
                "key": format!("payload-{}", i % 5),
                "content": format!("version {i}"),
            }));
            assert!(!object.create(&ctx, &mut obj).await.has_error());
        }
        for i in 0..3 {
            let mut obj = ResourceData::new(
                Some(format!("fr-par/{name}/payload-{i}")),
                json!({}),
                json!({}),
            );
            assert!(!object.delete(&ctx, &mut obj).await.has_error());
        }

        assert!(!handler.delete(&ctx, &mut data).await.has_error());
        assert_eq!(data.id(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial_test::serial]
    #[ignore] // needs live credentials
    async fn policy_round_trip_produces_no_diff() {
        let handler = BucketHandler::new(live_config());
        let name = unique_bucket_name("policy");
        let ctx = scw_schema::Context::background();
        let mut data = ResourceData::from_config(json!({"name": name, "region": "fr-par"}));
        assert!(!handler.create(&ctx, &mut data).await.has_error());

        let configured = format!(
            r#"{{"Version": "2023-04-17",
                 "Statement": [{{"Effect": "Allow", "Action": ["s3:GetObject"],
                                 "Principal": {{"SCW": "*"}},
                                 "Resource": ["{name}/*"]}}]}}"#
        );
        let policy = crate::bucket_policy::BucketPolicyHandler::new(live_config());
        let mut policy_data = ResourceData::from_config(json!({
            "bucket": name,
            "region": "fr-par",
            "policy": configured,
        }));
        assert!(!policy.create(&ctx, &mut policy_data).await.has_error());

        let recorded = policy_data.get_prior("policy").unwrap().as_str().unwrap();
        assert!(scw_schema::suppress::eq_policy(&configured, recorded));

        policy.delete(&ctx, &mut policy_data).await;
        data.set("force_destroy", true);
        handler.delete(&ctx, &mut data).await;
    }
}

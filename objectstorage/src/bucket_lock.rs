//! The bucket object-lock-configuration sub-resource handler.
//!
//! The API has no delete for this configuration; removing the resource
//! writes back a configuration without a default-retention rule.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_locality::Region;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, PlanError, ResourceData, ResourceDiff,
    ResourceHandler, Schema, Timeouts, Validator,
};
use serde_json::{json, Value};

use crate::api::buckets::lock::{
    GetObjectLockConfigurationRequest, PutObjectLockConfigurationRequest,
};
use crate::api::buckets::{DefaultRetention, ObjectLockConfiguration, ObjectLockRule};
use crate::api::client::{ClientConfig, ObjectStorageClient};

const RETENTION_MODES: &[&str] = &["GOVERNANCE", "COMPLIANCE"];

pub struct BucketLockHandler {
    config: ClientConfig,
}

impl BucketLockHandler {
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
        let rule = expand_rule(data.get("rule"))?;
        let client = ObjectStorageClient::new(&self.config, &region);
        let req = PutObjectLockConfigurationRequest {
            bucket: bucket.clone(),
            object_lock_configuration: ObjectLockConfiguration {
                object_lock_enabled: "Enabled".to_string(),
                rule: Some(rule),
            },
        };
        client
            .put_object_lock_configuration(&req, ctx.cancel.clone())
            .await?;
        data.set_id(scw_locality::id::regional(&region, &bucket));
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for BucketLockHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "bucket_lock_configuration",
            attributes: vec![
                Attribute::string("bucket")
                    .required()
                    .force_new()
                    .suppress(scw_schema::suppress::locality_stripped),
                Attribute::block(
                    "rule",
                    vec![Attribute::block(
                        "default_retention",
                        vec![
                            Attribute::string("mode")
                                .required()
                                .validator(Validator::OneOf(RETENTION_MODES)),
                            Attribute::int("days").optional(),
                            Attribute::int("years").optional(),
                        ],
                    )],
                ),
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
        let req = GetObjectLockConfigurationRequest {
            bucket: bucket.clone(),
        };
        match client
            .get_object_lock_configuration(&req, ctx.cancel.clone())
            .await
        {
            Ok(configuration) => {
                data.set("bucket", &bucket);
                data.set("region", region.to_string());
                match &configuration.rule {
                    Some(rule) => data.set("rule", flatten_rule(rule)),
                    None => data.set("rule", json!([])),
                }
                Diagnostics::new()
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(bucket, "object lock configuration is gone, removing it from state");
                data.clear_id();
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error(e),
        }
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if data.has_change("rule") {
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
        let req = PutObjectLockConfigurationRequest {
            bucket,
            object_lock_configuration: ObjectLockConfiguration {
                object_lock_enabled: "Enabled".to_string(),
                rule: None,
            },
        };
        match client
            .put_object_lock_configuration(&req, ctx.cancel.clone())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Diagnostics::from_error(e),
        }
        data.clear_id();
        Diagnostics::new()
    }

    async fn customize_diff(
        &self,
        _ctx: &Context,
        diff: &mut ResourceDiff,
        _data: &ResourceData,
    ) -> Result<(), PlanError> {
        if let Some(rule) = diff.new_value("rule") {
            let (days, years) = retention_fields(rule);
            if days.is_some() && years.is_some() {
                return Err(PlanError::new(
                    "default retention days and years are mutually exclusive",
                ));
            }
        }
        Ok(())
    }
}

fn first(value: Option<&Value>) -> Option<Value> {
    match value {
        Some(Value::Array(items)) => items.first().cloned(),
        Some(object @ Value::Object(_)) => Some(object.clone()),
        _ => None,
    }
}

/// The configured days and years of a pending rule block.
fn retention_fields(rule: &Value) -> (Option<i64>, Option<i64>) {
    let Some(retention) = first(Some(rule)).and_then(|r| first(r.get("default_retention"))) else {
        return (None, None);
    };
    (
        retention.get("days").and_then(Value::as_i64),
        retention.get("years").and_then(Value::as_i64),
    )
}

fn expand_rule(value: Option<&Value>) -> Result<ObjectLockRule, Diagnostic> {
    let rule = first(value).ok_or_else(|| {
        Diagnostic::error("rule.default_retention is required").with_attribute("rule")
    })?;
    let retention = first(rule.get("default_retention")).ok_or_else(|| {
        Diagnostic::error("rule.default_retention is required").with_attribute("rule")
    })?;
    let mode = retention
        .get("mode")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Diagnostic::error("default retention mode is required").with_attribute("rule")
        })?;
    let days = retention.get("days").and_then(Value::as_i64);
    let years = retention.get("years").and_then(Value::as_i64);
    if days.is_some() && years.is_some() {
        return Err(
            Diagnostic::error("default retention days and years are mutually exclusive")
                .with_attribute("rule"),
        );
    }
    if days.is_none() && years.is_none() {
        return Err(
            Diagnostic::error("default retention needs either days or years")
                .with_attribute("rule"),
        );
    }
    Ok(ObjectLockRule {
        default_retention: DefaultRetention {
            mode: mode.to_string(),
            days,
            years,
        },
    })
}

fn flatten_rule(rule: &ObjectLockRule) -> Value {
    json!([{
        "default_retention": [{
            "mode": rule.default_retention.mode,
            "days": rule.default_retention.days,
            "years": rule.default_retention.years,
        }],
    }])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn days_and_years_are_mutually_exclusive() {
        let rule = json!([{
            "default_retention": [{"mode": "GOVERNANCE", "days": 1, "years": 1}],
        }]);
        let err = expand_rule(Some(&rule)).unwrap_err();
        assert!(err.summary.contains("mutually exclusive"));
    }

    #[test]
    fn one_of_days_or_years_is_required() {
        let rule = json!([{
            "default_retention": [{"mode": "COMPLIANCE"}],
        }]);
        assert!(expand_rule(Some(&rule)).is_err());

        let rule = json!([{
            "default_retention": [{"mode": "COMPLIANCE", "years": 2}],
        }]);
        let expanded = expand_rule(Some(&rule)).unwrap();
        assert_eq!(expanded.default_retention.years, Some(2));
        assert_eq!(expanded.default_retention.days, None);
    }

    #[test]
    fn flatten_round_trips() {
        let rule = ObjectLockRule {
            default_retention: DefaultRetention {
                mode: "GOVERNANCE".to_string(),
                days: Some(7),
                years: None,
            },
        };
        let expanded = expand_rule(Some(&flatten_rule(&rule))).unwrap();
        assert_eq!(expanded, rule);
    }
}

//! The bucket-ACL sub-resource handler.
//!
//! Two forms exist: a canned ACL name, or a full access-control policy of
//! grants plus owner. The canned form is never read back from the API:
//! the service reports it only as expanded grants, so re-reading would
//! always drift.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use scw_locality::id::AclId;
use scw_locality::Region;
use scw_schema::{
    Attribute, Context, Diagnostic, Diagnostics, ResourceData, ResourceHandler, Schema, Timeouts,
    Validator,
};
use serde_json::{json, Value};

use crate::api::buckets::acl::{GetBucketAclRequest, PutBucketAclRequest};
use crate::api::buckets::{AccessControlPolicy, Grant, Grantee, Owner};
use crate::api::client::{ClientConfig, ObjectStorageClient};

const CANNED_ACLS: &[&str] = &[
    "private",
    "public-read",
    "public-read-write",
    "authenticated-read",
];

pub struct BucketAclHandler {
    config: ClientConfig,
}

impl BucketAclHandler {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, data: &ResourceData) -> Result<AclId, Diagnostic> {
        if let Some(id) = data.id() {
            return Ok(AclId::from_str(id)?);
        }
        let region = data
            .get_string("region")
            .ok_or_else(|| Diagnostic::error("region is not configured").with_attribute("region"))?;
        let region = Region::from_str(&region)?;
        let bucket = data
            .get_string("bucket")
            .map(|b| scw_locality::id::strip(&b).to_string())
            .ok_or_else(|| Diagnostic::error("bucket is required").with_attribute("bucket"))?;
        Ok(AclId {
            region,
            bucket,
            canned_acl: data.get_string("acl").filter(|a| !a.is_empty()),
            expected_owner: data.get_string("expected_bucket_owner"),
        })
    }

    async fn apply(&self, ctx: &Context, data: &mut ResourceData) -> Result<(), Diagnostic> {
        let id = self.resolve(data)?;
        let client = ObjectStorageClient::new(&self.config, &id.region);
        let policy = match &id.canned_acl {
            Some(_) => None,
            None => Some(expand_access_control_policy(
                data.get("access_control_policy"),
            )?),
        };
        let req = PutBucketAclRequest {
            bucket: id.bucket.clone(),
            acl: id.canned_acl.clone(),
            access_control_policy: policy,
            expected_bucket_owner: id.expected_owner.clone(),
        };
        client.put_bucket_acl(&req, ctx.cancel.clone()).await?;
        data.set_id(id.to_string());
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for BucketAclHandler {
    fn schema(&self) -> Schema {
        Schema {
            resource: "bucket_acl",
            attributes: vec![
                Attribute::string("bucket")
                    .required()
                    .force_new()
                    .suppress(scw_schema::suppress::locality_stripped),
                Attribute::string("acl")
                    .optional()
                    .validator(Validator::OneOf(CANNED_ACLS)),
                Attribute::block(
                    "access_control_policy",
                    vec![
                        Attribute::set("grant")
                            .optional()
                            .elem_of(vec![
                                Attribute::block(
                                    "grantee",
                                    vec![
                                        Attribute::string("id").optional(),
                                        Attribute::string("type").required(),
                                        Attribute::string("uri").optional(),
                                    ],
                                ),
                                Attribute::string("permission").required(),
                            ]),
                        Attribute::block(
                            "owner",
                            vec![
                                Attribute::string("id").required(),
                                Attribute::string("display_name").optional(),
                            ],
                        ),
                    ],
                ),
                Attribute::string("expected_bucket_owner").optional().force_new(),
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
        let id = match self.resolve(data) {
            Ok(id) => id,
            Err(d) => return d.into(),
        };
        data.set("bucket", &id.bucket);
        data.set("region", id.region.to_string());
        if let Some(owner) = &id.expected_owner {
            data.set("expected_bucket_owner", owner);
        }

        // the canned form has no faithful inverse in the API's grant list,
        // so it is taken from the identifier and never re-read
        if let Some(canned) = &id.canned_acl {
            data.set("acl", canned);
            return Diagnostics::new();
        }

        let client = ObjectStorageClient::new(&self.config, &id.region);
        let req = GetBucketAclRequest {
            bucket: id.bucket.clone(),
            expected_bucket_owner: id.expected_owner.clone(),
        };
        match client.get_bucket_acl(&req, ctx.cancel.clone()).await {
            Ok(acl) => {
                data.set(
                    "access_control_policy",
                    flatten_access_control_policy(&acl),
                );
                Diagnostics::new()
            }
            Err(e) if e.is_not_found() => {
                data.clear_id();
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error(e),
        }
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        if data.any_change(&["acl", "access_control_policy"]) {
            if let Err(d) = self.apply(ctx, data).await {
                return d.into();
            }
        }
        self.read(ctx, data).await
    }

    /// There is nothing to delete remotely; the bucket keeps whatever ACL
    /// it last had.
    async fn delete(&self, _ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        data.clear_id();
        Diagnostics::new()
    }
}

fn expand_access_control_policy(
    value: Option<&Value>,
) -> Result<AccessControlPolicy, Diagnostic> {
    let block = match value {
        Some(Value::Array(items)) => items.first(),
        Some(object @ Value::Object(_)) => Some(object),
        _ => None,
    };
    let block = block.ok_or_else(|| {
        Diagnostic::error("either acl or access_control_policy must be configured")
            .with_attribute("access_control_policy")
    })?;

    let grants = block
        .get("grant")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|grant| {
                    let grantee = grant.get("grantee").map(|g| match g {
                        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
                        other => other.clone(),
                    });
                    let grantee = grantee.unwrap_or(Value::Null);
                    Ok(Grant {
                        grantee: Grantee {
                            grantee_type: grantee
                                .get("type")
                                .and_then(Value::as_str)
                                .ok_or("grantee type is required")?
                                .to_string(),
                            id: grantee
                                .get("id")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            uri: grantee
                                .get("uri")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        },
                        permission: grant
                            .get("permission")
                            .and_then(Value::as_str)
                            .ok_or("grant permission is required")?
                            .to_string(),
                    })
                })
                .collect::<Result<Vec<_>, &str>>()
        })
        .transpose()
        .map_err(|e| Diagnostic::error(e).with_attribute("access_control_policy"))?
        .unwrap_or_default();

    let owner = block
        .get("owner")
        .map(|o| match o {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        })
        .unwrap_or(Value::Null);

    Ok(AccessControlPolicy {
        grants,
        owner: Owner {
            id: owner
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            display_name: owner
                .get("display_name")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
    })
}

fn flatten_access_control_policy(acl: &AccessControlPolicy) -> Value {
    json!([{
        "grant": acl
            .grants
            .iter()
            .map(|grant| {
                json!({
                    "grantee": [{
                        "id": grant.grantee.id,
                        "type": grant.grantee.grantee_type,
                        "uri": grant.grantee.uri,
                    }],
                    "permission": grant.permission,
                })
            })
            .collect::<Vec<_>>(),
        "owner": [{
            "id": acl.owner.id,
            "display_name": acl.owner.display_name,
        }],
    }])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expand_reads_nested_grant_blocks() {
        let configured = json!([{
            "grant": [{
                "grantee": [{"id": "owner-1", "type": "CanonicalUser"}],
                "permission": "FULL_CONTROL",
            }],
            "owner": [{"id": "owner-1"}],
        }]);
        let policy = expand_access_control_policy(Some(&configured)).unwrap();
        assert_eq!(policy.grants.len(), 1);
        assert_eq!(policy.grants[0].grantee.grantee_type, "CanonicalUser");
        assert_eq!(policy.owner.id, "owner-1");
    }

    #[test]
    fn expand_requires_some_policy() {
        let err = expand_access_control_policy(None).unwrap_err();
        assert_eq!(
            err.attribute_path.as_deref(),
            Some("access_control_policy")
        );
    }

    #[test]
    fn flatten_round_trips_expand() {
        let policy = AccessControlPolicy {
            grants: vec![Grant {
                grantee: Grantee {
                    grantee_type: "Group".to_string(),
                    id: None,
                    uri: Some("http://acs.amazonaws.com/groups/global/AllUsers".to_string()),
                },
                permission: "READ".to_string(),
            }],
            owner: Owner {
                id: "owner-1".to_string(),
                display_name: None,
            },
        };
        let flattened = flatten_access_control_policy(&policy);
        let round = expand_access_control_policy(Some(&flattened)).unwrap();
        assert_eq!(round, policy);
    }
}

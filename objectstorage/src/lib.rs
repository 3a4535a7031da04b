//! Object storage resource handlers.
//!
//! The `api` module is the typed HTTP surface; the modules at the crate
//! root are the resource handlers the orchestrator drives: the bucket, its
//! sub-resources (ACL, policy, website, lock configuration) and objects,
//! plus the concurrent bucket-emptying pass used by forced destroys.

pub mod api;
pub mod bucket;
pub mod bucket_acl;
pub mod bucket_empty;
pub mod bucket_lock;
pub mod bucket_policy;
pub mod bucket_website;
pub mod object;

pub use api::client::{ClientConfig, ObjectStorageClient};

use scw_schema::Diagnostic;

impl From<api::Error> for Diagnostic {
    fn from(error: api::Error) -> Self {
        Diagnostic::error(error.to_string())
    }
}

//! Flexible IP resource handler.
//!
//! The `api` module is the typed HTTP surface for the flexible IP
//! service; `flexible_ip` is the resource handler, including virtual
//! MAC management.

pub mod api;
pub mod flexible_ip;

pub use api::client::{ClientConfig, FlexibleIpClient};

use scw_schema::Diagnostic;

impl From<api::Error> for Diagnostic {
    fn from(error: api::Error) -> Self {
        Diagnostic::error(error.to_string())
    }
}

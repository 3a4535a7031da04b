//! Bare-metal resource handlers.
//!
//! The `api` module is the typed HTTP surface for the bare-metal service;
//! `server` is the server resource handler and `easy_partitioning` the
//! data source that derives install-ready partitioning schemas.

pub mod api;
pub mod easy_partitioning;
pub mod server;

pub use api::client::{BaremetalClient, ClientConfig};

use scw_schema::Diagnostic;

impl From<api::Error> for Diagnostic {
    fn from(error: api::Error) -> Self {
        Diagnostic::error(error.to_string())
    }
}

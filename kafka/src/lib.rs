//! Managed Kafka cluster resource handler.
//!
//! The `api` module is the typed HTTP surface for the Kafka service;
//! `cluster` is the cluster resource handler.

pub mod api;
pub mod cluster;

pub use api::client::{ClientConfig, KafkaClient};

use scw_schema::Diagnostic;

impl From<api::Error> for Diagnostic {
    fn from(error: api::Error) -> Self {
        Diagnostic::error(error.to_string())
    }
}

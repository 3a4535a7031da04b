//! The resource handler contract.
//!
//! The host orchestrator owns the plan/apply loop and hands each handler an
//! untyped attribute tree. This crate is the typed side of that boundary:
//! attribute descriptors with validators and diff suppressors, the
//! diagnostics channel back to the orchestrator, the [`ResourceData`]
//! adapter over the state tree, and the plan-time [`ResourceDiff`].

pub mod attr;
pub mod data;
pub mod diag;
pub mod diff;
pub mod handler;
pub mod hash;
pub mod suppress;

pub use attr::{AttrType, Attribute, Schema, Timeouts, Validator};
pub use data::ResourceData;
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use diff::{PlanError, ResourceDiff};
pub use handler::ResourceHandler;

use scw_gax::CancellationToken;

/// Per-invocation context threaded into every handler operation.
#[derive(Clone, Default)]
pub struct Context {
    pub cancel: Option<CancellationToken>,
}

impl Context {
    pub fn background() -> Self {
        Self { cancel: None }
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }
}

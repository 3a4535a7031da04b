use async_trait::async_trait;

use crate::attr::Schema;
use crate::data::ResourceData;
use crate::diag::Diagnostics;
use crate::diff::{PlanError, ResourceDiff};
use crate::Context;

/// One managed resource type. The orchestrator owns the plan/apply loop and
/// calls these operations with the untyped state tree; implementations talk
/// to the service APIs and report through [`Diagnostics`].
///
/// Operations must be idempotent against interrupted runs: `read` clears the
/// id when the remote resource is gone, and `create` records the id before
/// entering any long wait so a timeout still leaves a trackable resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn schema(&self) -> Schema;

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics;

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics;

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics;

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics;

    /// Plan-time hook. Escalates in-place changes to replacements and
    /// rejects invalid combinations before anything is applied; may consult
    /// the remote catalog. Returning an error aborts planning.
    async fn customize_diff(
        &self,
        _ctx: &Context,
        _diff: &mut ResourceDiff,
        _data: &ResourceData,
    ) -> Result<(), PlanError> {
        Ok(())
    }
}

//! The template composition pipeline.
//!
//! Transformations run in a fixed order over one exclusively-owned
//! [`Template`]: the cache injector first, so the boot payload the compute
//! transformer copies into every launch specification already carries the
//! cache endpoint references; the spot-fleet rewrite second. After both, the
//! graph must hold no dangling references - a non-empty set means a
//! transformation broke referential integrity and the template must not be
//! submitted.

use anyhow::Result;
use tracing::debug;

use crate::compute::apply_spot_fleet;
use crate::context::RegionContext;
use crate::core::StackformError;
use crate::services::cache::add_caches;
use crate::template::Template;

/// Apply the full transformation sequence to a baseline template.
pub fn compose(ctx: &RegionContext, template: &mut Template) -> Result<()> {
    debug!(app = %ctx.app_name, environment = %ctx.environment, "Composing template.");

    add_caches(ctx, template)?;
    apply_spot_fleet(ctx, template)?;

    let dangling = template.dangling_refs();
    if !dangling.is_empty() {
        return Err(StackformError::DanglingReferences { refs: dangling }.into());
    }
    Ok(())
}

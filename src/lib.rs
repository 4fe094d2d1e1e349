//! Stackform - composable infrastructure template transformations.
//!
//! Stackform composes declarative infrastructure templates (CloudFormation-style
//! resource graphs) by applying a sequence of structural transformations before a
//! template is handed to the provisioning service: rewriting a fixed-capacity
//! autoscaling subgraph into a weighted spot-market fleet, injecting managed
//! cache resources whose endpoints are discoverable from instance boot
//! configuration, and reconstructing network topology from a parent deployment's
//! already-materialized stack outputs.
//!
//! # Architecture Overview
//!
//! Stackform operates on a shared in-memory document model and applies
//! transformations in a fixed order:
//! - [`template::Template`] holds the resource graph (resources, parameters,
//!   outputs) that every transformation mutates in place
//! - [`services::cache::add_caches`] runs first, so the boot payload the
//!   compute transformer copies into launch specifications already carries the
//!   cache endpoint references
//! - [`compute::apply_spot_fleet`] runs second, replacing the autoscaling
//!   subgraph with a spot fleet and repointing outputs
//! - [`topology::TopologyResolver`] runs independently of the template
//!   pipeline, earlier, to determine what topology a child deployment inherits
//!
//! [`pipeline::compose`] ties the template transformations together and checks
//! graph integrity before hand-off.
//!
//! # Core Modules
//!
//! - [`template`] - resource graph model, reference integrity, and the boot
//!   payload fragment builder
//! - [`compute`] - autoscaling-to-spot-fleet rewrite
//! - [`services`] - managed backing-service injection (cache variant)
//! - [`topology`] - parent-stack topology classification and inheritance
//! - [`context`] - per-deployment-unit configuration consumed by the
//!   transformers
//! - [`core`] - error types shared across the crate
//!
//! # Error Handling
//!
//! Operations return [`anyhow::Result`] and surface typed
//! [`core::StackformError`] values at failure sites. Contract violations
//! (missing pieces of the canonical baseline subgraph) are fatal and propagate
//! to the caller; per-item validation failures are logged and skipped; a
//! parent stack that does not exist is "nothing to inherit", not an error.
//!
//! # Concurrency
//!
//! All transformations are synchronous, single-threaded, and perform no I/O.
//! A [`template::Template`] must be exclusively owned by one composition
//! pipeline; independent deployment units get independent instances.

pub mod compute;
pub mod constants;
pub mod context;
pub mod core;
pub mod pipeline;
pub mod services;
pub mod template;
pub mod topology;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use context::{CacheConfig, RegionContext, SpotConfig};
pub use crate::core::StackformError;
pub use pipeline::compose;
pub use template::Template;
pub use topology::{RegionTopology, StackDetail, StackLookup, TopologyResolver};

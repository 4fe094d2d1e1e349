//! Per-deployment-unit configuration consumed by the transformers.
//!
//! These structs are the deserialized form of the deployment's configuration
//! document: what compute strategy to apply, which backing services to
//! inject, and the naming/identity facts the transformers bake into emitted
//! resources. Loading the document from disk or network belongs to the
//! surrounding system; this crate only consumes the parsed values.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Configuration for one application in one region.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionContext {
    /// Application name.
    pub app_name: String,

    /// Environment (deployment grouping) the application belongs to.
    pub environment: String,

    /// Baseline instance type, used as the single capability when no spot
    /// weights are configured.
    pub instance_type: String,

    /// IAM role the spot fleet service assumes to manage instances.
    pub spot_fleet_role: String,

    /// Spot-market strategy; absent means "keep the autoscaling group".
    #[serde(default)]
    pub spot: Option<SpotConfig>,

    /// Named cache requests. BTreeMap keeps request processing order
    /// deterministic.
    #[serde(default)]
    pub caches: BTreeMap<String, CacheConfig>,
}

impl RegionContext {
    /// Full deployment name, stamped into the `Name` tag of fleet instances.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.app_name, self.environment)
    }
}

/// Spot-market fleet configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotConfig {
    /// Bid ceiling per instance-hour. Defaults to "1.00".
    pub price: Option<String>,

    /// Instance type to capacity weight. Empty means a single capability:
    /// the region's baseline instance type at weight 1. Order is the
    /// launch-specification fan-out order.
    pub weights: Map<String, Value>,

    /// Explicit allocation strategy, overriding the weight-count default.
    pub strategy: Option<String>,
}

/// One managed cache request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Replica count; accepts a number or a numeric string, as operators
    /// write both. Validated (non-negative integer) at injection time, so a
    /// bad value skips this request rather than failing the parse.
    pub replicas: Value,

    /// Explicit automatic-failover override. Defaults to enabled when
    /// replicas > 0.
    pub automatic_failover: Option<bool>,

    /// Explicit cache node class; normalized to carry the provider's
    /// `cache.` prefix.
    pub instance_type: Option<String>,

    /// Engine version override.
    pub version: Option<String>,
}

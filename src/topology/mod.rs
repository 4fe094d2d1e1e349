//! Parent-stack topology resolution.
//!
//! A child deployment can inherit its network topology (subnets, route
//! tables, address pools, availability zones) from a parent deployment whose
//! stack is already materialized. The resolver fetches the parent's realized
//! parameters and outputs through the [`StackLookup`] collaborator,
//! classifies output names against known topology roles, and merges the
//! result into the caller's [`RegionTopology`].
//!
//! A parent stack that does not exist is not an error: it means "no
//! inherited topology; caller must provision its own", and the model is left
//! untouched. Any other lookup failure propagates unchanged. Because the
//! merge only overwrites fields the parent actually exported, the resolver
//! can be applied repeatedly while a parent chain is walked, each ancestor
//! filling in what closer ancestors left blank.

mod classify;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::StackformError;

pub(crate) use classify::classify;

/// Realized parameters and outputs of a materialized stack, as flat ordered
/// key-value pairs.
#[derive(Debug, Clone, Default)]
pub struct StackDetail {
    /// Stack parameters in declaration order.
    pub parameters: Vec<(String, String)>,
    /// Stack outputs.
    pub outputs: Vec<(String, String)>,
}

/// The lookup collaborator: resolves and describes materialized stacks.
///
/// Both operations distinguish "the stack does not exist"
/// ([`StackformError::StackNotFound`]) from other faults. Retry policy, if
/// any, belongs to the implementation.
pub trait StackLookup {
    /// Resolve the physical stack identifier for a logical stack name.
    fn stack_id(&self, name: &str) -> Result<String>;

    /// Fetch the realized parameters and outputs of a stack.
    fn stack_detail(&self, stack_id: &str) -> Result<StackDetail>;
}

/// Network topology of one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionTopology {
    /// Availability zones, in parameter order.
    pub availability_zones: Vec<String>,
    /// Subnets for private instances, in suffix order.
    pub private_instance_subnets: Vec<String>,
    /// Subnets for internal load balancers.
    pub private_elb_subnets: Vec<String>,
    /// Subnets for public instances.
    pub public_instance_subnets: Vec<String>,
    /// Subnets for public load balancers.
    pub public_elb_subnets: Vec<String>,
    /// VPC identifier.
    pub vpc_id: Option<String>,
    /// Route table for public subnets.
    pub public_route_table: Option<String>,
    /// Route table for private subnets.
    pub private_route_table: Option<String>,
    /// NAT gateway addresses, in suffix order.
    pub nat_addresses: Vec<String>,
    /// Network CIDR block.
    pub cidr: Option<String>,
}

impl RegionTopology {
    /// Overlay topology inherited from a parent: fields the parent exported
    /// replace ours, everything else keeps its prior value.
    pub fn merge(&mut self, inherited: RegionTopology) {
        merge_list(&mut self.availability_zones, inherited.availability_zones);
        merge_list(
            &mut self.private_instance_subnets,
            inherited.private_instance_subnets,
        );
        merge_list(&mut self.private_elb_subnets, inherited.private_elb_subnets);
        merge_list(
            &mut self.public_instance_subnets,
            inherited.public_instance_subnets,
        );
        merge_list(&mut self.public_elb_subnets, inherited.public_elb_subnets);
        merge_field(&mut self.vpc_id, inherited.vpc_id);
        merge_field(&mut self.public_route_table, inherited.public_route_table);
        merge_field(&mut self.private_route_table, inherited.private_route_table);
        merge_list(&mut self.nat_addresses, inherited.nat_addresses);
        merge_field(&mut self.cidr, inherited.cidr);
    }
}

fn merge_list(current: &mut Vec<String>, inherited: Vec<String>) {
    if !inherited.is_empty() {
        *current = inherited;
    }
}

fn merge_field(current: &mut Option<String>, inherited: Option<String>) {
    if inherited.is_some() {
        *current = inherited;
    }
}

/// Reconstructs a child region's topology from a parent deployment's stack.
pub struct TopologyResolver<'a, L: StackLookup> {
    lookup: &'a L,
}

impl<'a, L: StackLookup> TopologyResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Merge the named parent stack's topology into `topology` for `region`.
    ///
    /// Returns `Ok` without touching the model when the parent stack is not
    /// found; propagates any other lookup failure unchanged.
    pub fn resolve(
        &self,
        parent_stack: &str,
        region: &str,
        topology: &mut RegionTopology,
    ) -> Result<()> {
        let stack_id = match self.lookup.stack_id(parent_stack) {
            Ok(stack_id) => stack_id,
            Err(err) if is_not_found(&err) => {
                debug!(stack = %parent_stack, %region, "Parent stack not found; nothing to inherit.");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let detail = match self.lookup.stack_detail(&stack_id) {
            Ok(detail) => detail,
            Err(err) if is_not_found(&err) => {
                debug!(stack = %parent_stack, %region, "Parent stack vanished; nothing to inherit.");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        debug!(stack = %parent_stack, %region, outputs = detail.outputs.len(),
               "Inheriting topology from parent stack.");
        topology.merge(classify(&detail));
        Ok(())
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<StackformError>(),
        Some(StackformError::StackNotFound { .. })
    )
}

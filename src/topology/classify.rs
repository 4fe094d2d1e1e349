//! Table-driven classification of stack output and parameter names.
//!
//! Output names are matched against an ordered rule table mapping name
//! patterns to topology roles. Roles that collect multiple values
//! (subnets, NAT addresses) are distinguished by a numeric suffix and
//! assembled in suffix order. Names that match no rule are ignored - parent
//! stacks are free to export more than this crate understands.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{RegionTopology, StackDetail};

/// A topology role an output name can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputRole {
    PrivateSubnet,
    PublicSubnet,
    PrivateRouteTable,
    PublicRouteTable,
    NatAddress,
    VpcId,
    Cidr,
}

struct Rule {
    pattern: Regex,
    role: OutputRole,
}

/// Output-name rules, applied in order; the first match wins.
static OUTPUT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |pattern: &str, role: OutputRole| Rule {
        pattern: Regex::new(pattern).expect("invalid output rule pattern"),
        role,
    };
    vec![
        rule(r"^PrivateSubnet(\d+)$", OutputRole::PrivateSubnet),
        rule(r"^PublicSubnet(\d+)$", OutputRole::PublicSubnet),
        rule(r"^PrivateRouteTable$", OutputRole::PrivateRouteTable),
        rule(r"^PublicRouteTable$", OutputRole::PublicRouteTable),
        rule(r"^NATElasticIP(\d+)$", OutputRole::NatAddress),
        rule(r"^EnvironmentVpcId$", OutputRole::VpcId),
        rule(r"^CIDR$", OutputRole::Cidr),
    ]
});

/// Availability-zone numbering pattern over parameter names.
static AZ_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Az(\d+)$").expect("invalid AZ parameter pattern"));

/// Build the topology a stack exports from its realized detail.
///
/// Fields the stack does not export stay at their `Default`, which the
/// caller's merge interprets as "keep the prior value".
pub(crate) fn classify(detail: &StackDetail) -> RegionTopology {
    let mut topology = RegionTopology::default();
    let mut private_subnets: Vec<(u32, String)> = Vec::new();
    let mut public_subnets: Vec<(u32, String)> = Vec::new();
    let mut nat_addresses: Vec<(u32, String)> = Vec::new();

    for (name, value) in &detail.outputs {
        let Some((role, suffix)) = match_output(name) else {
            debug!(output = %name, "Ignoring unrecognized stack output.");
            continue;
        };
        match role {
            OutputRole::PrivateSubnet => private_subnets.push((suffix, value.clone())),
            OutputRole::PublicSubnet => public_subnets.push((suffix, value.clone())),
            OutputRole::PrivateRouteTable => topology.private_route_table = Some(value.clone()),
            OutputRole::PublicRouteTable => topology.public_route_table = Some(value.clone()),
            OutputRole::NatAddress => nat_addresses.push((suffix, value.clone())),
            OutputRole::VpcId => topology.vpc_id = Some(value.clone()),
            OutputRole::Cidr => topology.cidr = Some(value.clone()),
        }
    }

    // Private subnets serve both instances and internal load balancers;
    // likewise public subnets.
    let private = in_suffix_order(private_subnets);
    topology.private_instance_subnets = private.clone();
    topology.private_elb_subnets = private;
    let public = in_suffix_order(public_subnets);
    topology.public_instance_subnets = public.clone();
    topology.public_elb_subnets = public;
    topology.nat_addresses = in_suffix_order(nat_addresses);

    topology.availability_zones = detail
        .parameters
        .iter()
        .filter(|(name, _)| AZ_PARAMETER.is_match(name))
        .map(|(_, value)| value.clone())
        .collect();

    topology
}

/// Match an output name against the rule table; multi-valued roles carry
/// their numeric ordering suffix.
fn match_output(name: &str) -> Option<(OutputRole, u32)> {
    for rule in OUTPUT_RULES.iter() {
        if let Some(captures) = rule.pattern.captures(name) {
            let suffix = captures
                .get(1)
                .and_then(|digits| digits.as_str().parse().ok())
                .unwrap_or(0);
            return Some((rule.role, suffix));
        }
    }
    None
}

fn in_suffix_order(mut entries: Vec<(u32, String)>) -> Vec<String> {
    entries.sort_by_key(|(suffix, _)| *suffix);
    entries.into_iter().map(|(_, value)| value).collect()
}

//! Compute strategy transformer: autoscaling group to spot fleet.
//!
//! Given a template containing the canonical autoscaling subgraph (scaling
//! group, launch configuration, and the scaling policies/alarms tied to
//! them), [`apply_spot_fleet`] produces an equivalent spot-fleet subgraph and
//! removes the original. The surrounding graph keeps working: the fleet's
//! target capacity binds to the same parameter that governed the baseline
//! minimum instance count, and every output that referenced the scaling
//! group is repointed at the fleet.
//!
//! When the region carries no spot configuration the transformer is a no-op,
//! short-circuiting before it reads any autoscaling property - the common
//! case. Once a spot configuration is present, the canonical subgraph is
//! assumed well-formed; a missing resource or property is a contract
//! violation and propagates to the caller.

use anyhow::Result;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::constants::{
    INSTANCE_MIN_PARAM, LAUNCH_CONFIG, SCALING_GROUP, SCALING_GROUP_NAME_OUTPUT,
    SCALING_MANAGEMENT_RESOURCES, SPOT_FLEET, USER_DATA_PARAM,
};
use crate::context::{RegionContext, SpotConfig};
use crate::core::StackformError;
use crate::template::Template;

/// Default bid ceiling per instance-hour.
const DEFAULT_SPOT_PRICE: &str = "1.00";

/// Replace the autoscaling subgraph with a spot fleet.
///
/// No-op without a spot configuration. Otherwise: injects the deployment
/// name tag into the boot payload parameter, fans the launch configuration
/// out into one weighted specification per (instance type, subnet) pair,
/// emits the fleet resource, removes the original subgraph, and repoints
/// outputs that referenced it.
pub fn apply_spot_fleet(ctx: &RegionContext, template: &mut Template) -> Result<()> {
    let Some(spot) = &ctx.spot else {
        debug!(app = %ctx.app_name, "No spot configuration; keeping the autoscaling group.");
        return Ok(());
    };

    // The tag must land before launch properties are copied into per-spec
    // payloads below.
    inject_name_tag(ctx, template);

    let fleet = build_fleet_resource(ctx, spot, template)?;
    template.resources.insert(SPOT_FLEET.to_string(), fleet);

    remove_scaling_subgraph(template);
    redirect_scaling_outputs(template);
    Ok(())
}

/// Append a `"tags":{"Name": <full name>}` fragment to the boot payload
/// parameter's default, comma-separated from any existing content.
///
/// Skipped when the template requests no boot payload parameter.
fn inject_name_tag(ctx: &RegionContext, template: &mut Template) {
    let Some(param) = template
        .parameters
        .get_mut(USER_DATA_PARAM)
        .and_then(Value::as_object_mut)
    else {
        return;
    };

    let mut default = param
        .get("Default")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if !default.is_empty() {
        default.push(',');
    }
    default.push_str("\"tags\":");
    default.push_str(&json!({"Name": ctx.full_name()}).to_string());
    param.insert("Default".to_string(), Value::String(default));
}

/// Build the spot fleet resource from the launch configuration and scaling
/// group the baseline established.
fn build_fleet_resource(
    ctx: &RegionContext,
    spot: &SpotConfig,
    template: &Template,
) -> Result<Value> {
    // Shared launch properties, straight off the launch configuration.
    let user_data = template.expect_property(LAUNCH_CONFIG, "UserData")?;
    let block_mappings = template.expect_property(LAUNCH_CONFIG, "BlockDeviceMappings")?;
    let monitoring = json!({"Enabled": template.expect_property(LAUNCH_CONFIG, "InstanceMonitoring")?});
    let image_id = template.expect_property(LAUNCH_CONFIG, "ImageId")?;
    let instance_profile = instance_profile_arn(template)?;
    let security_groups = security_group_ids(template)?;

    let subnets = template
        .expect_property(SCALING_GROUP, "VPCZoneIdentifier")?
        .as_array()
        .ok_or_else(|| StackformError::PropertyShape {
            resource: SCALING_GROUP.to_string(),
            property: "VPCZoneIdentifier".to_string(),
            expected: "a subnet list",
        })?;

    // Instance weights can be configured; default is the baseline type at
    // weight 1.
    let default_weights;
    let weights = if spot.weights.is_empty() {
        default_weights = Map::from_iter([(ctx.instance_type.clone(), json!(1))]);
        &default_weights
    } else {
        &spot.weights
    };

    // Bidding on a single instance type prefers AZ saturation; heterogeneous
    // types prefer lowest price.
    let default_strategy = if weights.len() == 1 {
        "diversified"
    } else {
        "lowestPrice"
    };
    let strategy = spot.strategy.as_deref().unwrap_or(default_strategy);

    let mut launch_specs = Vec::with_capacity(weights.len() * subnets.len());
    for (instance_type, weight) in weights {
        for subnet in subnets {
            launch_specs.push(json!({
                "UserData": user_data,
                "BlockDeviceMappings": block_mappings,
                "IamInstanceProfile": &instance_profile,
                "InstanceType": instance_type,
                "ImageId": image_id,
                "Monitoring": &monitoring,
                "SecurityGroups": &security_groups,
                "WeightedCapacity": weight,
                "SubnetId": subnet,
            }));
        }
    }
    debug!(count = launch_specs.len(), "Generated spot fleet launch specifications.");

    Ok(json!({
        "Type": "AWS::EC2::SpotFleet",
        "Properties": {
            "SpotFleetRequestConfigData": {
                "AllocationStrategy": strategy,
                "IamFleetRole": ctx.spot_fleet_role,
                "SpotPrice": spot.price.as_deref().unwrap_or(DEFAULT_SPOT_PRICE),
                "TargetCapacity": {"Ref": INSTANCE_MIN_PARAM},
                "TerminateInstancesWithExpiration": "true",
                "LaunchSpecifications": launch_specs
            }
        }
    }))
}

/// Re-express the launch configuration's instance profile reference as the
/// ARN form the fleet API takes.
fn instance_profile_arn(template: &Template) -> Result<Value> {
    let profile = template
        .expect_property(LAUNCH_CONFIG, "IamInstanceProfile")?
        .get("Ref")
        .and_then(Value::as_str)
        .ok_or_else(|| StackformError::PropertyShape {
            resource: LAUNCH_CONFIG.to_string(),
            property: "IamInstanceProfile".to_string(),
            expected: "a {\"Ref\": ..} entry",
        })?;
    Ok(json!({"Arn": {"Fn::GetAtt": [profile, "Arn"]}}))
}

/// Re-express the launch configuration's security group references as the
/// group-id form the fleet API takes.
fn security_group_ids(template: &Template) -> Result<Vec<Value>> {
    let groups = template
        .expect_property(LAUNCH_CONFIG, "SecurityGroups")?
        .as_array()
        .ok_or_else(|| StackformError::PropertyShape {
            resource: LAUNCH_CONFIG.to_string(),
            property: "SecurityGroups".to_string(),
            expected: "a list of {\"Ref\": ..} entries",
        })?;

    groups
        .iter()
        .map(|group| {
            let target = group.get("Ref").and_then(Value::as_str).ok_or_else(|| {
                StackformError::PropertyShape {
                    resource: LAUNCH_CONFIG.to_string(),
                    property: "SecurityGroups".to_string(),
                    expected: "a list of {\"Ref\": ..} entries",
                }
            })?;
            Ok(json!({"GroupId": {"Fn::GetAtt": [target, "GroupId"]}}))
        })
        .collect()
}

/// Remove the scaling group, launch configuration, and the fixed set of
/// policy/alarm resources that managed them.
fn remove_scaling_subgraph(template: &mut Template) {
    template.resources.shift_remove(SCALING_GROUP);
    template.resources.shift_remove(LAUNCH_CONFIG);
    for name in SCALING_MANAGEMENT_RESOURCES {
        template.resources.shift_remove(name);
    }
}

/// Repoint outputs that referenced the removed scaling group at the fleet.
///
/// Runs after resource removal so it cannot mask a reference that should
/// surface as a graph-integrity failure. The conventional group-name output
/// receives the same redirection.
fn redirect_scaling_outputs(template: &mut Template) {
    for output in template.outputs.values_mut() {
        let Some(value) = output.get_mut("Value").and_then(Value::as_object_mut) else {
            continue;
        };
        if value.get("Ref").and_then(Value::as_str) == Some(SCALING_GROUP) {
            value.insert("Ref".to_string(), Value::String(SPOT_FLEET.to_string()));
        }
    }
    if let Some(value) = template
        .outputs
        .get_mut(SCALING_GROUP_NAME_OUTPUT)
        .and_then(|output| output.get_mut("Value"))
        .and_then(Value::as_object_mut)
    {
        if value.contains_key("Ref") {
            value.insert("Ref".to_string(), Value::String(SPOT_FLEET.to_string()));
        }
    }
}

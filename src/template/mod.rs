//! The in-memory resource graph model.
//!
//! A [`Template`] is the shared document every transformation operates on: a
//! mapping of named resources (type tag plus arbitrary property bag), named
//! parameters, and named outputs, in the provisioning service's JSON shape.
//! It is constructed once per deployment unit upstream of this crate, mutated
//! in place by the compute transformer and the service injector, and handed
//! off immutable afterwards.
//!
//! # Referential integrity
//!
//! Property values and outputs embed references (`{"Ref": name}` and
//! `{"Fn::GetAtt": [name, attr]}`) to other resources and parameters. Every
//! reference must resolve once all transformations complete; a dangling
//! reference is a defect in whichever transformation left it behind.
//! [`Template::dangling_refs`] performs that check without touching the
//! document.

pub mod user_data;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::StackformError;

/// A declarative infrastructure template: resources, parameters, and outputs.
///
/// Field order within each map is preserved (serde_json's `preserve_order`),
/// which the transformers rely on for deterministic fan-out and splice
/// bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Named resources: `{"Type": .., "Properties": {..}, "DependsOn": ..?}`.
    #[serde(rename = "Resources", default)]
    pub resources: Map<String, Value>,

    /// Named parameters: `{"Default": .., ..}`.
    #[serde(rename = "Parameters", default)]
    pub parameters: Map<String, Value>,

    /// Named outputs: `{"Value": reference-or-literal}`.
    #[serde(rename = "Outputs", default)]
    pub outputs: Map<String, Value>,
}

impl Template {
    /// Look up a resource that the canonical baseline contract requires.
    pub fn expect_resource(&self, name: &str) -> Result<&Value, StackformError> {
        self.resources
            .get(name)
            .ok_or_else(|| StackformError::ResourceMissing {
                name: name.to_string(),
            })
    }

    /// Look up a property under a resource's `Properties` bag.
    ///
    /// Absence is a contract violation: the baseline subgraph is assumed
    /// well-formed and no recovery is attempted.
    pub fn expect_property(&self, resource: &str, property: &str) -> Result<&Value, StackformError> {
        self.expect_resource(resource)?
            .pointer(&format!("/Properties/{property}"))
            .ok_or_else(|| StackformError::PropertyMissing {
                resource: resource.to_string(),
                property: property.to_string(),
            })
    }

    /// Collect reference targets that resolve to neither a resource nor a
    /// parameter, sorted and deduplicated.
    ///
    /// Scans `Ref` and `Fn::GetAtt` references embedded anywhere in resource
    /// bodies and outputs, plus `DependsOn` entries. Pseudo-parameters
    /// (`AWS::*`) are supplied by the provisioning service and are never
    /// dangling.
    pub fn dangling_refs(&self) -> Vec<String> {
        let mut targets: Vec<&str> = Vec::new();
        for resource in self.resources.values() {
            collect_ref_targets(resource, &mut targets);
            match resource.get("DependsOn") {
                Some(Value::String(name)) => targets.push(name),
                Some(Value::Array(names)) => {
                    targets.extend(names.iter().filter_map(Value::as_str));
                }
                _ => {}
            }
        }
        for output in self.outputs.values() {
            collect_ref_targets(output, &mut targets);
        }

        let mut dangling: Vec<String> = targets
            .into_iter()
            .filter(|target| {
                !target.starts_with("AWS::")
                    && !self.resources.contains_key(*target)
                    && !self.parameters.contains_key(*target)
            })
            .map(String::from)
            .collect();
        dangling.sort();
        dangling.dedup();
        dangling
    }
}

/// Recursively collect `Ref` and `Fn::GetAtt` targets from a property value.
///
/// A reference is a single-key object; anything else is walked as plain data,
/// so user-authored payloads containing the literal text "Ref" are not
/// misread.
fn collect_ref_targets<'a>(value: &'a Value, targets: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    targets.push(target);
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        targets.push(target);
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_ref_targets(nested, targets);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ref_targets(item, targets);
            }
        }
        _ => {}
    }
}

//! End-to-end composition over the canonical baseline template.
//!
//! Exercises the full pipeline the way the provisioning flow does: cache
//! injection, the spot-fleet rewrite, and the graph-integrity check, plus
//! topology resolution against a canned parent stack.

use serde_json::{Value, json};

use stackform::test_utils::{baseline_template, init_test_logging, region_context};
use stackform::{RegionTopology, SpotConfig, StackformError, compose};

#[test]
fn composes_spot_fleet_and_caches_over_baseline() {
    init_test_logging(None);

    let mut template = baseline_template();
    let mut ctx = region_context();
    ctx.spot = Some(SpotConfig {
        price: Some("0.50".to_string()),
        weights: serde_json::from_value(json!({"t3.micro": 1, "t3.small": 2})).unwrap(),
        strategy: None,
    });
    ctx.caches = serde_json::from_value(json!({
        "sessions": {"replicas": 2},
        "pages": {"replicas": 0}
    }))
    .unwrap();

    compose(&ctx, &mut template).unwrap();

    // Spot fleet replaced the autoscaling subgraph.
    assert!(!template.resources.contains_key("Asg"));
    assert!(!template.resources.contains_key("Lc"));
    assert!(!template.resources.contains_key("SpScaleUp"));

    let config = template.resources["SpotFleet"]
        .pointer("/Properties/SpotFleetRequestConfigData")
        .expect("fleet config");
    let specs = config["LaunchSpecifications"].as_array().unwrap();
    assert_eq!(specs.len(), 4, "two weights across two subnets");
    assert_eq!(config["AllocationStrategy"], json!("lowestPrice"));
    assert_eq!(config["SpotPrice"], json!("0.50"));
    assert_eq!(config["TargetCapacity"], json!({"Ref": "InstanceMin"}));

    // Both caches landed, with their access-control resources and the one
    // shared discovery policy.
    for name in ["CacheSessions", "CacheSessionsSg", "CachePages", "CachePagesSg"] {
        assert!(template.resources.contains_key(name), "{name} missing");
    }
    assert!(template.resources.contains_key("CachePolicy"));
    assert_eq!(
        template.resources["CacheSessions"]["Properties"]["NumCacheClusters"],
        json!(3)
    );

    // Every launch spec's boot payload carries both cache references with no
    // trailing separator before the closing marker.
    for spec in specs {
        let fragments = spec
            .pointer("/UserData/Fn::Base64/Fn::Join/1")
            .and_then(Value::as_array)
            .expect("payload fragments");
        let rendered: String = fragments
            .iter()
            .map(|fragment| match fragment {
                Value::String(text) => text.clone(),
                reference => format!("<{}>", reference["Ref"].as_str().unwrap()),
            })
            .collect();
        assert!(rendered.contains("\"sessions\":\"<CacheSessions>\""));
        assert!(rendered.contains("\"pages\":\"<CachePages>\""));
        assert!(!rendered.contains(",}"));
    }

    // Outputs repointed; untouched outputs identical; graph integrity holds.
    assert_eq!(template.outputs["AsgName"]["Value"], json!({"Ref": "SpotFleet"}));
    assert_eq!(template.outputs["AppSg"]["Value"], json!({"Ref": "Sg"}));
    assert!(template.dangling_refs().is_empty());
}

#[test]
fn unconfigured_compose_leaves_template_unchanged() {
    init_test_logging(None);

    let mut template = baseline_template();
    let before = template.clone();

    compose(&region_context(), &mut template).unwrap();

    assert_eq!(template, before);
}

#[test]
fn recomposition_is_a_contract_violation() {
    init_test_logging(None);

    let mut template = baseline_template();
    let mut ctx = region_context();
    ctx.spot = Some(SpotConfig::default());

    compose(&ctx, &mut template).unwrap();
    let err = compose(&ctx, &mut template).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StackformError>(),
        Some(StackformError::ResourceMissing { .. })
    ));
}

#[test]
fn topology_inheritance_across_two_ancestors() {
    init_test_logging(None);

    use anyhow::Result;
    use stackform::{StackDetail, StackLookup, TopologyResolver};

    struct CannedStack {
        detail: StackDetail,
    }

    impl StackLookup for CannedStack {
        fn stack_id(&self, name: &str) -> Result<String> {
            Ok(format!("arn:cloudformation:{name}"))
        }

        fn stack_detail(&self, _stack_id: &str) -> Result<StackDetail> {
            Ok(self.detail.clone())
        }
    }

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    let grandparent = CannedStack {
        detail: StackDetail {
            parameters: pairs(&[("Az1", "us-west-2a"), ("Az2", "us-west-2b")]),
            outputs: pairs(&[
                ("EnvironmentVpcId", "vpc-123456"),
                ("PublicRouteTable", "rtb-000001"),
            ]),
        },
    };
    let parent = CannedStack {
        detail: StackDetail {
            parameters: pairs(&[]),
            outputs: pairs(&[
                ("PrivateSubnet01", "subnet-000001"),
                ("PrivateSubnet02", "subnet-000002"),
                ("PublicSubnet01", "subnet-000101"),
            ]),
        },
    };

    let mut topology = RegionTopology::default();
    TopologyResolver::new(&grandparent)
        .resolve("grandparent", "us-west-2", &mut topology)
        .unwrap();
    TopologyResolver::new(&parent)
        .resolve("parent", "us-west-2", &mut topology)
        .unwrap();

    // Each ancestor contributed its exports; nothing was clobbered.
    assert_eq!(topology.vpc_id.as_deref(), Some("vpc-123456"));
    assert_eq!(topology.public_route_table.as_deref(), Some("rtb-000001"));
    assert_eq!(topology.availability_zones, vec!["us-west-2a", "us-west-2b"]);
    assert_eq!(
        topology.private_instance_subnets,
        vec!["subnet-000001", "subnet-000002"]
    );
    assert_eq!(topology.public_elb_subnets, vec!["subnet-000101"]);
}

//! Managed cache injection.
//!
//! For every configured cache request, [`add_caches`] adds a replication
//! group and a dedicated security group to the template, and splices a
//! reference to the replication group into the boot configuration payload so
//! instances can resolve the endpoint at start-up. One shared IAM policy
//! (read-only endpoint discovery) is attached when at least one cache was
//! added.
//!
//! A request with an invalid replica count is logged and skipped; it leaves
//! no partial resources behind and does not disturb the payload bookkeeping
//! for the requests that follow it.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::constants::{APP_ROLE, APP_SECURITY_GROUP, CACHE_SUBNET_GROUP_PARAM, VPC_ID_PARAM};
use crate::context::{CacheConfig, RegionContext};
use crate::services::logical_name;
use crate::template::Template;
use crate::template::user_data::UserDataFragments;

/// Well-known cache service port.
const CACHE_PORT: &str = "6379";

/// Default engine version.
/// <https://docs.aws.amazon.com/AmazonElastiCache/latest/UserGuide/SelectEngine.html>
const ENGINE_VERSION: &str = "3.2.4";

/// Payload marker after which cache endpoint references are spliced.
const CACHE_BREADCRUMB: &str = "\"caches\":{";

/// Logical ID of the shared endpoint-discovery policy.
const CACHE_POLICY: &str = "CachePolicy";

/// Inject the configured cache requests into the template.
///
/// No-op when no caches are requested.
pub fn add_caches(ctx: &RegionContext, template: &mut Template) -> Result<()> {
    if ctx.caches.is_empty() {
        debug!(app = %ctx.app_name, "No caches requested.");
        return Ok(());
    }

    let mut user_data = UserDataFragments::detach(template)?;
    let mut cursor = user_data.cursor_after(CACHE_BREADCRUMB)?;

    for (name, params) in &ctx.caches {
        let Some(replicas) = replica_count(params) else {
            warn!(cache = %name, "Cache has an invalid \"replicas\" value; skipping.");
            continue;
        };
        let automatic_failover = params.automatic_failover.unwrap_or(replicas > 0);
        let node_type = node_type(params, automatic_failover);
        let engine_version = params.version.as_deref().unwrap_or(ENGINE_VERSION);

        let cache_resource = format!("Cache{}", logical_name(name));
        let cache_sg_resource = format!("{cache_resource}Sg");
        let description = format!("{} for {} in {}", name, ctx.app_name, ctx.environment);
        debug!(cache = %name, resource = %cache_resource, "Creating cache.");

        // Access control: cache port only, sourced from the deployment's own
        // security group.
        template.resources.insert(
            cache_sg_resource.clone(),
            json!({
                "Type": "AWS::EC2::SecurityGroup",
                "Properties": {
                    "GroupDescription": description,
                    "VpcId": {"Ref": VPC_ID_PARAM},
                    "SecurityGroupIngress": [
                        {
                            "IpProtocol": "tcp",
                            "FromPort": CACHE_PORT,
                            "ToPort": CACHE_PORT,
                            "SourceSecurityGroupId": {"Ref": APP_SECURITY_GROUP}
                        }
                    ]
                }
            }),
        );

        template.resources.insert(
            cache_resource.clone(),
            json!({
                "Type": "AWS::ElastiCache::ReplicationGroup",
                "Properties": {
                    "AutomaticFailoverEnabled": automatic_failover,
                    "AutoMinorVersionUpgrade": true,
                    "CacheNodeType": node_type,
                    "CacheSubnetGroupName": {"Ref": CACHE_SUBNET_GROUP_PARAM},
                    "Engine": "redis",
                    "EngineVersion": engine_version,
                    "NumCacheClusters": 1 + replicas,
                    "Port": CACHE_PORT,
                    "ReplicationGroupDescription": description,
                    "SecurityGroupIds": [{"Ref": cache_sg_resource}]
                }
            }),
        );

        user_data.splice_entry(&mut cursor, name, json!({"Ref": cache_resource}));
    }

    if cursor.entries() > 0 {
        user_data.trim_trailing_separator(&cursor);
        template.resources.insert(
            CACHE_POLICY.to_string(),
            json!({
                "DependsOn": APP_ROLE,
                "Type": "AWS::IAM::Policy",
                "Properties": {
                    "PolicyName": "DescribeCacheEndpoints",
                    "Roles": [{"Ref": APP_ROLE}],
                    "PolicyDocument": {
                        "Statement": [{
                            "Effect": "Allow",
                            "Action": "elasticache:DescribeReplicationGroups",
                            "Resource": "*"
                        }]
                    }
                }
            }),
        );
    }

    user_data.reattach(template)?;
    Ok(())
}

/// Validate a request's replica count: a non-negative integer, given as a
/// number or a numeric string. `None` means the request is skipped.
fn replica_count(params: &CacheConfig) -> Option<u64> {
    match &params.replicas {
        Value::Null => Some(0),
        Value::Number(count) => count.as_u64(),
        Value::String(count) => count.trim().parse().ok(),
        _ => None,
    }
}

/// Resolve the cache node class: failover-dependent default, explicit value
/// normalized to carry the provider's `cache.` prefix.
fn node_type(params: &CacheConfig, automatic_failover: bool) -> String {
    let default = if automatic_failover {
        "cache.m3.medium"
    } else {
        "cache.t2.micro"
    };
    let node_type = params.instance_type.as_deref().unwrap_or(default);
    if node_type.starts_with("cache.") {
        node_type.to_string()
    } else {
        format!("cache.{node_type}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    use crate::test_utils::{baseline_template, region_context};

    fn cache_context(caches: Value) -> RegionContext {
        let mut ctx = region_context();
        ctx.caches = serde_json::from_value(caches).unwrap();
        ctx
    }

    fn payload_fragments(template: &Template) -> Vec<Value> {
        template
            .resources["Lc"]
            .pointer("/Properties/UserData/Fn::Base64/Fn::Join/1")
            .and_then(Value::as_array)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_no_caches_is_noop() {
        let mut template = baseline_template();
        let before = template.clone();

        add_caches(&region_context(), &mut template).unwrap();

        assert_eq!(template, before);
    }

    #[test]
    fn test_single_cache_with_replicas() {
        let mut template = baseline_template();
        let ctx = cache_context(json!({"sessions": {"replicas": 2}}));

        add_caches(&ctx, &mut template).unwrap();

        let cache = &template.resources["CacheSessions"]["Properties"];
        // Failover defaults to enabled when replicas > 0; cluster count is
        // 1 + replicas.
        assert_eq!(cache["AutomaticFailoverEnabled"], json!(true));
        assert_eq!(cache["NumCacheClusters"], json!(3));
        assert_eq!(cache["CacheNodeType"], json!("cache.m3.medium"));
        assert_eq!(cache["EngineVersion"], json!("3.2.4"));
        assert_eq!(cache["Port"], json!("6379"));
        assert_eq!(
            cache["CacheSubnetGroupName"],
            json!({"Ref": "PrivateCacheSubnetGroup"})
        );
        assert_eq!(
            cache["SecurityGroupIds"],
            json!([{"Ref": "CacheSessionsSg"}])
        );

        let sg = &template.resources["CacheSessionsSg"]["Properties"];
        assert_eq!(sg["VpcId"], json!({"Ref": "VpcId"}));
        assert_eq!(
            sg["SecurityGroupIngress"],
            json!([{
                "IpProtocol": "tcp",
                "FromPort": "6379",
                "ToPort": "6379",
                "SourceSecurityGroupId": {"Ref": "Sg"}
            }])
        );

        let policy = &template.resources["CachePolicy"];
        assert_eq!(policy["DependsOn"], json!("Role"));
        assert_eq!(
            policy["Properties"]["PolicyDocument"]["Statement"][0]["Action"],
            json!("elasticache:DescribeReplicationGroups")
        );

        assert!(template.dangling_refs().is_empty());
    }

    #[test]
    fn test_zero_replicas_disables_failover_and_shrinks_class() {
        let mut template = baseline_template();
        let ctx = cache_context(json!({"sessions": {}}));

        add_caches(&ctx, &mut template).unwrap();

        let cache = &template.resources["CacheSessions"]["Properties"];
        assert_eq!(cache["AutomaticFailoverEnabled"], json!(false));
        assert_eq!(cache["NumCacheClusters"], json!(1));
        assert_eq!(cache["CacheNodeType"], json!("cache.t2.micro"));
    }

    #[test]
    fn test_explicit_failover_and_class_overrides() {
        let mut template = baseline_template();
        let ctx = cache_context(json!({
            "sessions": {
                "replicas": "3",
                "automatic_failover": false,
                "instance_type": "r3.large",
                "version": "3.2.6"
            }
        }));

        add_caches(&ctx, &mut template).unwrap();

        let cache = &template.resources["CacheSessions"]["Properties"];
        assert_eq!(cache["AutomaticFailoverEnabled"], json!(false));
        assert_eq!(cache["NumCacheClusters"], json!(4));
        // Explicit class gains the provider prefix.
        assert_eq!(cache["CacheNodeType"], json!("cache.r3.large"));
        assert_eq!(cache["EngineVersion"], json!("3.2.6"));
    }

    #[test]
    fn test_prefixed_class_is_not_doubled() {
        let params = CacheConfig {
            instance_type: Some("cache.r3.large".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(node_type(&params, false), "cache.r3.large");
    }

    #[test]
    fn test_replica_count_validation() {
        let with = |replicas: Value| CacheConfig {
            replicas,
            ..CacheConfig::default()
        };
        assert_eq!(replica_count(&with(Value::Null)), Some(0));
        assert_eq!(replica_count(&with(json!(2))), Some(2));
        assert_eq!(replica_count(&with(json!("2"))), Some(2));
        assert_eq!(replica_count(&with(json!(-1))), None);
        assert_eq!(replica_count(&with(json!("-1"))), None);
        assert_eq!(replica_count(&with(json!("lots"))), None);
        assert_eq!(replica_count(&with(json!(1.5))), None);
        assert_eq!(replica_count(&with(json!([]))), None);
    }

    #[test]
    fn test_invalid_request_is_skipped_not_fatal() {
        let mut template = baseline_template();
        let ctx = cache_context(json!({
            "bad": {"replicas": "lots"},
            "good": {"replicas": 1}
        }));

        add_caches(&ctx, &mut template).unwrap();

        // The invalid request leaves nothing behind; the valid one is intact.
        assert!(!template.resources.contains_key("CacheBad"));
        assert!(!template.resources.contains_key("CacheBadSg"));
        assert!(template.resources.contains_key("CacheGood"));
        assert!(template.resources.contains_key("CacheGoodSg"));
        assert!(template.resources.contains_key("CachePolicy"));

        // Exactly one splice, and its trailing separator was removed.
        let rendered = rendered_payload(&template);
        assert!(rendered.contains("\"caches\":{\"good\":\"<CacheGood>\"}"));
    }

    #[test]
    fn test_all_requests_invalid_adds_nothing() {
        let mut template = baseline_template();
        let before = template.clone();
        let ctx = cache_context(json!({"bad": {"replicas": "lots"}}));

        add_caches(&ctx, &mut template).unwrap();

        assert_eq!(template, before);
    }

    #[test]
    fn test_multiple_caches_splice_set_and_separator() {
        let mut template = baseline_template();
        let ctx = cache_context(json!({
            "pages": {"replicas": 0},
            "sessions": {"replicas": 1}
        }));

        add_caches(&ctx, &mut template).unwrap();

        let rendered = rendered_payload(&template);
        // Both entries present, exactly one separator between them, none
        // trailing. Entry order is unspecified (reverse-of-request today).
        assert!(rendered.contains("\"pages\":\"<CachePages>\""));
        assert!(rendered.contains("\"sessions\":\"<CacheSessions>\""));
        assert!(!rendered.contains(",}"));
        assert_eq!(rendered.matches(',').count(), 1);

        // Exactly one shared policy regardless of cache count.
        let policies: Vec<&String> = template
            .resources
            .keys()
            .filter(|name| name.ends_with("Policy"))
            .collect();
        assert_eq!(policies, vec!["CachePolicy"]);
    }

    #[test]
    fn test_request_names_are_cleaned_for_logical_ids() {
        let mut template = baseline_template();
        let ctx = cache_context(json!({"session-store": {"replicas": 0}}));

        add_caches(&ctx, &mut template).unwrap();

        assert!(template.resources.contains_key("CacheSessionStore"));
        assert!(template.resources.contains_key("CacheSessionStoreSg"));
        // The payload key keeps the operator's spelling.
        assert!(rendered_payload(&template).contains("\"session-store\":\"<CacheSessionStore>\""));
    }

    fn rendered_payload(template: &Template) -> String {
        payload_fragments(template)
            .iter()
            .map(|fragment| match fragment {
                Value::String(text) => text.clone(),
                reference => format!("<{}>", reference["Ref"].as_str().unwrap()),
            })
            .collect()
    }

    #[test]
    fn test_caches_config_shape() {
        // BTreeMap request order is the processing order.
        let caches: BTreeMap<String, CacheConfig> = serde_json::from_value(json!({
            "b": {"replicas": 1},
            "a": {"replicas": 2}
        }))
        .unwrap();
        assert_eq!(
            caches.keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}

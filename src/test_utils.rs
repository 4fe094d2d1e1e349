//! Shared test fixtures and logging setup.
//!
//! Available to unit tests and, via the `test-utils` feature, to the
//! integration test suite.

use std::sync::Once;

use serde_json::json;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::context::RegionContext;
use crate::template::Template;

/// Global flag to ensure logging is only initialized once in tests.
static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests, once per process.
///
/// Respects `RUST_LOG` when set; otherwise uses the provided level, or stays
/// silent when neither is given.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A baseline template in the canonical autoscaling shape the assembly
/// collaborator produces: scaling group over two subnets, launch
/// configuration with a `"caches":{}` breadcrumb in its boot payload, the
/// scaling management policies/alarms, and the conventional outputs.
pub fn baseline_template() -> Template {
    serde_json::from_value(json!({
        "Parameters": {
            "InstanceMin": {"Type": "Number", "Default": "1"},
            "UserData": {"Type": "String", "Default": ""},
            "VpcId": {"Type": "String", "Default": "vpc-123456"},
            "PrivateCacheSubnetGroup": {"Type": "String", "Default": "cache-subnets"}
        },
        "Resources": {
            "Role": {
                "Type": "AWS::IAM::Role",
                "Properties": {"AssumeRolePolicyDocument": {"Statement": []}}
            },
            "InstanceProfile": {
                "Type": "AWS::IAM::InstanceProfile",
                "Properties": {"Roles": [{"Ref": "Role"}]}
            },
            "Sg": {
                "Type": "AWS::EC2::SecurityGroup",
                "Properties": {"GroupDescription": "app", "VpcId": {"Ref": "VpcId"}}
            },
            "Lc": {
                "Type": "AWS::AutoScaling::LaunchConfiguration",
                "Properties": {
                    "ImageId": "ami-123456",
                    "InstanceType": "t3.micro",
                    "InstanceMonitoring": true,
                    "IamInstanceProfile": {"Ref": "InstanceProfile"},
                    "SecurityGroups": [{"Ref": "Sg"}],
                    "BlockDeviceMappings": [
                        {"DeviceName": "/dev/xvda", "Ebs": {"VolumeSize": 8}}
                    ],
                    "UserData": {
                        "Fn::Base64": {
                            "Fn::Join": ["", [
                                "{",
                                "\"caches\":{",
                                "}",
                                "}"
                            ]]
                        }
                    }
                }
            },
            "Asg": {
                "Type": "AWS::AutoScaling::AutoScalingGroup",
                "Properties": {
                    "LaunchConfigurationName": {"Ref": "Lc"},
                    "MinSize": {"Ref": "InstanceMin"},
                    "VPCZoneIdentifier": ["subnet-1", "subnet-2"]
                }
            },
            "SpScaleUp": {
                "Type": "AWS::AutoScaling::ScalingPolicy",
                "Properties": {"AutoScalingGroupName": {"Ref": "Asg"}, "ScalingAdjustment": 1}
            },
            "SpScaleDown": {
                "Type": "AWS::AutoScaling::ScalingPolicy",
                "Properties": {"AutoScalingGroupName": {"Ref": "Asg"}, "ScalingAdjustment": -1}
            },
            "AlarmScaleUp": {
                "Type": "AWS::CloudWatch::Alarm",
                "Properties": {"AlarmActions": [{"Ref": "SpScaleUp"}]}
            },
            "AlarmScaleDown": {
                "Type": "AWS::CloudWatch::Alarm",
                "Properties": {"AlarmActions": [{"Ref": "SpScaleDown"}]}
            },
            "AlarmContinuousHighLoad": {
                "Type": "AWS::CloudWatch::Alarm",
                "Properties": {"AlarmActions": []}
            }
        },
        "Outputs": {
            "AsgName": {"Value": {"Ref": "Asg"}},
            "GroupRef": {"Value": {"Ref": "Asg"}},
            "AppSg": {"Value": {"Ref": "Sg"}}
        }
    }))
    .expect("baseline template fixture")
}

/// A region context with neither spot nor cache configuration.
pub fn region_context() -> RegionContext {
    serde_json::from_value(json!({
        "app_name": "webapp",
        "environment": "staging",
        "instance_type": "t3.micro",
        "spot_fleet_role": "arn:aws:iam::123456789012:role/fleet"
    }))
    .expect("region context fixture")
}

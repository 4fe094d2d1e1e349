//! Logical resource identifiers shared with the template assembly collaborator.
//!
//! The baseline template is produced upstream with a canonical shape; these
//! names are that contract. Defining them centrally keeps the contract
//! greppable and avoids string drift between the transformers and their tests.

/// Logical ID of the autoscaling group in the canonical baseline.
pub const SCALING_GROUP: &str = "Asg";

/// Logical ID of the launch configuration in the canonical baseline.
pub const LAUNCH_CONFIG: &str = "Lc";

/// Logical ID of the spot fleet resource emitted by the compute transformer.
pub const SPOT_FLEET: &str = "SpotFleet";

/// Conventional output carrying the scaling group name.
pub const SCALING_GROUP_NAME_OUTPUT: &str = "AsgName";

/// Scaling policies and alarms whose sole purpose is managing the autoscaling
/// group; removed together with it.
pub const SCALING_MANAGEMENT_RESOURCES: [&str; 5] = [
    "SpScaleUp",
    "SpScaleDown",
    "AlarmScaleUp",
    "AlarmScaleDown",
    "AlarmContinuousHighLoad",
];

/// Parameter governing the baseline minimum instance count; the fleet's
/// target capacity binds to it to preserve operator-facing sizing semantics.
pub const INSTANCE_MIN_PARAM: &str = "InstanceMin";

/// Parameter carrying extra boot payload content.
pub const USER_DATA_PARAM: &str = "UserData";

/// Parameter carrying the deployment VPC.
pub const VPC_ID_PARAM: &str = "VpcId";

/// Logical ID of the deployment's own security group.
pub const APP_SECURITY_GROUP: &str = "Sg";

/// Logical ID of the deployment's principal IAM role.
pub const APP_ROLE: &str = "Role";

/// Parameter naming the shared private cache subnet group.
pub const CACHE_SUBNET_GROUP_PARAM: &str = "PrivateCacheSubnetGroup";

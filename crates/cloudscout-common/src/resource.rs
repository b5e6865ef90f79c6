//! Resource taxonomy for the indexing pipeline
//!
//! Every inventoried resource type has a stable camelCase key (used in
//! snapshot documents and issue reports), a fetch scope, and a human-readable
//! display name.

use serde::{Deserialize, Serialize};

/// Fetch scope of a resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Fetched once per active region
    Regional,
    /// Fetched once per account
    Global,
}

/// Types of cloud resources inventoried by the pipeline
///
/// The serde representation is the camelCase key, so the enum can be used
/// directly as a JSON map key in snapshot documents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Volumes,
    Eips,
    Snapshots,
    SecurityGroups,
    Amis,
    Ec2s,
    Vpcs,
    VpcEndpoints,
    Enis,
    RouteTables,
    InternetGateways,
    VpnGateways,
    Elbs,
    Albs,
    TargetGroups,
    Rdses,
    RdsManualSnapshots,
    LaunchConfigs,
    AutoScalingGroups,
    CloudTrails,
    Users,
    Roles,
    Groups,
    AccountSummary,
    PasswordPolicy,
    S3Buckets,
}

impl ResourceType {
    /// Types fetched once per active region
    pub const REGIONAL: [ResourceType; 20] = [
        ResourceType::Volumes,
        ResourceType::Eips,
        ResourceType::Snapshots,
        ResourceType::SecurityGroups,
        ResourceType::Amis,
        ResourceType::Ec2s,
        ResourceType::Vpcs,
        ResourceType::VpcEndpoints,
        ResourceType::Enis,
        ResourceType::RouteTables,
        ResourceType::InternetGateways,
        ResourceType::VpnGateways,
        ResourceType::Elbs,
        ResourceType::Albs,
        ResourceType::TargetGroups,
        ResourceType::Rdses,
        ResourceType::RdsManualSnapshots,
        ResourceType::LaunchConfigs,
        ResourceType::AutoScalingGroups,
        ResourceType::CloudTrails,
    ];

    /// Types fetched once per account
    pub const GLOBAL: [ResourceType; 6] = [
        ResourceType::Users,
        ResourceType::Roles,
        ResourceType::Groups,
        ResourceType::AccountSummary,
        ResourceType::PasswordPolicy,
        ResourceType::S3Buckets,
    ];

    pub fn scope(self) -> Scope {
        match self {
            ResourceType::Users
            | ResourceType::Roles
            | ResourceType::Groups
            | ResourceType::AccountSummary
            | ResourceType::PasswordPolicy
            | ResourceType::S3Buckets => Scope::Global,
            _ => Scope::Regional,
        }
    }

    /// Stable camelCase key, identical to the serde representation
    pub fn key(self) -> &'static str {
        match self {
            ResourceType::Volumes => "volumes",
            ResourceType::Eips => "eips",
            ResourceType::Snapshots => "snapshots",
            ResourceType::SecurityGroups => "securityGroups",
            ResourceType::Amis => "amis",
            ResourceType::Ec2s => "ec2s",
            ResourceType::Vpcs => "vpcs",
            ResourceType::VpcEndpoints => "vpcEndpoints",
            ResourceType::Enis => "enis",
            ResourceType::RouteTables => "routeTables",
            ResourceType::InternetGateways => "internetGateways",
            ResourceType::VpnGateways => "vpnGateways",
            ResourceType::Elbs => "elbs",
            ResourceType::Albs => "albs",
            ResourceType::TargetGroups => "targetGroups",
            ResourceType::Rdses => "rdses",
            ResourceType::RdsManualSnapshots => "rdsManualSnapshots",
            ResourceType::LaunchConfigs => "launchConfigs",
            ResourceType::AutoScalingGroups => "autoScalingGroups",
            ResourceType::CloudTrails => "cloudTrails",
            ResourceType::Users => "users",
            ResourceType::Roles => "roles",
            ResourceType::Groups => "groups",
            ResourceType::AccountSummary => "accountSummary",
            ResourceType::PasswordPolicy => "passwordPolicy",
            ResourceType::S3Buckets => "s3Buckets",
        }
    }

    /// Human-readable name used when presenting individual records
    pub fn display_name(self) -> &'static str {
        match self {
            ResourceType::Volumes => "EBS Volume",
            ResourceType::Eips => "Elastic IP",
            ResourceType::Snapshots => "EBS Snapshot",
            ResourceType::SecurityGroups => "Security Group",
            ResourceType::Amis => "AMI",
            ResourceType::Ec2s => "EC2 Instance",
            ResourceType::Vpcs => "VPC",
            ResourceType::VpcEndpoints => "VPC Endpoint",
            ResourceType::Enis => "Elastic Network Interface",
            ResourceType::RouteTables => "Route Table",
            ResourceType::InternetGateways => "Internet Gateway",
            ResourceType::VpnGateways => "VPN Gateway",
            ResourceType::Elbs => "ELB",
            ResourceType::Albs => "Application Load Balancer",
            ResourceType::TargetGroups => "Target Group",
            ResourceType::Rdses => "RDS",
            ResourceType::RdsManualSnapshots => "RDS Manual Snapshot",
            ResourceType::LaunchConfigs => "Launch Config",
            ResourceType::AutoScalingGroups => "Auto Scaling Group",
            ResourceType::CloudTrails => "Cloud Trail",
            ResourceType::Users => "IAM User",
            ResourceType::Roles => "IAM Role",
            ResourceType::Groups => "IAM Group",
            ResourceType::AccountSummary => "Account Summary",
            ResourceType::PasswordPolicy => "Password Policy",
            ResourceType::S3Buckets => "S3 Bucket",
        }
    }

    /// Resolve a camelCase key back to its type
    pub fn from_key(key: &str) -> Option<ResourceType> {
        ResourceType::REGIONAL
            .iter()
            .chain(ResourceType::GLOBAL.iter())
            .copied()
            .find(|t| t.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_partition() {
        for t in ResourceType::REGIONAL {
            assert_eq!(t.scope(), Scope::Regional, "{} must be regional", t.key());
        }
        for t in ResourceType::GLOBAL {
            assert_eq!(t.scope(), Scope::Global, "{} must be global", t.key());
        }
        assert_eq!(
            ResourceType::REGIONAL.len() + ResourceType::GLOBAL.len(),
            26,
            "taxonomy covers 26 types"
        );
    }

    #[test]
    fn test_key_round_trip() {
        for t in ResourceType::REGIONAL.iter().chain(ResourceType::GLOBAL.iter()) {
            assert_eq!(
                ResourceType::from_key(t.key()),
                Some(*t),
                "key {} must resolve back to its type",
                t.key()
            );
        }
    }

    #[test]
    fn test_serde_matches_key() {
        for t in ResourceType::REGIONAL.iter().chain(ResourceType::GLOBAL.iter()) {
            let json = serde_json::to_value(t).expect("serialize resource type");
            assert_eq!(
                json,
                serde_json::Value::String(t.key().to_string()),
                "serde form must equal the stable key"
            );
        }
    }
}

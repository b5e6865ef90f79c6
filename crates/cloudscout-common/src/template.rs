//! Seeded category templates for the rule engines
//!
//! Every category is present with zeroed counters before evaluation, so
//! downstream consumers always see the full category set even when a
//! snapshot is empty. The one deliberate exception is
//! `rootAccountWithoutMFA`, which seeds `count: 1` and is cleared only on
//! positive evidence that root MFA is enabled.

use std::collections::BTreeMap;

use crate::report::{CategoryReport, IssueReport};

fn unused(label: &str) -> CategoryReport {
    CategoryReport {
        label: label.to_string(),
        unused: Some(0),
        total: Some(0),
        item_list: Some(Vec::new()),
        cost_saving: Some(0),
        ..Default::default()
    }
}

fn issue(label: &str, severity: u8) -> CategoryReport {
    CategoryReport {
        label: label.to_string(),
        count: Some(0),
        severity: Some(severity),
        item_list: Some(Vec::new()),
        ..Default::default()
    }
}

fn remediable(mut category: CategoryReport, alert: &str) -> CategoryReport {
    category.fixed_item_list = Some(Vec::new());
    category.can_fix = Some(true);
    category.alert_message = Some(alert.to_string());
    category
}

/// Template for the unused-resource engine
pub fn unused_resources() -> IssueReport {
    let mut categories = BTreeMap::new();
    categories.insert(
        "volumes".to_string(),
        remediable(unused("Volume"), "Are you sure you want delete this volume?"),
    );
    categories.insert(
        "eips".to_string(),
        remediable(
            unused("EIP"),
            "Are you sure you want release this EIP? You will not be able to get it back once released.",
        ),
    );
    categories.insert("vpcs".to_string(), unused("VPC"));
    categories.insert(
        "snapshots".to_string(),
        remediable(unused("Snapshot"), "Are you sure you want delete this Snapshot?"),
    );
    categories.insert(
        "enis".to_string(),
        remediable(unused("ENI"), "Are you sure you want delete this ENI?"),
    );
    categories.insert(
        "securityGroups".to_string(),
        remediable(
            unused("Security Group"),
            "Are you sure you want delete this SecurityGroup?",
        ),
    );
    categories.insert(
        "amis".to_string(),
        remediable(unused("AMI"), "Are you sure you want de-register this AMI?"),
    );
    categories.insert("ec2s".to_string(), unused("EC2"));
    categories.insert(
        "routeTables".to_string(),
        remediable(
            unused("Route Table"),
            "Are you sure you want delete this RouteTable?",
        ),
    );
    categories.insert(
        "internetGateways".to_string(),
        remediable(
            unused("Internet Gateway"),
            "Are you sure you want delete this InternetGateway?",
        ),
    );
    categories.insert(
        "vpnGateways".to_string(),
        remediable(
            unused("VPN Gateway"),
            "Are you sure you want delete this VPN Gateway?",
        ),
    );
    categories.insert(
        "elbs".to_string(),
        remediable(unused("ELB"), "Are you sure you want delete this ELB?"),
    );
    categories.insert(
        "albs".to_string(),
        remediable(unused("ALB"), "Are you sure you want delete this ALB?"),
    );
    categories.insert("targetGroups".to_string(), unused("Target Group"));
    categories.insert("rdses".to_string(), unused("RDS"));
    categories.insert(
        "rdsManualSnapshots".to_string(),
        remediable(
            unused("RDS Manual Snapshot"),
            "Are you sure you want delete this RDS Snapshot?",
        ),
    );
    categories.insert("autoScalingGroups".to_string(), unused("Auto Scaling Group"));
    categories.insert("launchConfigs".to_string(), unused("Launch Config"));
    IssueReport::from_categories(categories)
}

/// Template for the security engine
pub fn security_issues() -> IssueReport {
    let mut categories = BTreeMap::new();
    categories.insert("usersWithoutMFA".to_string(), issue("Users without MFA", 1));
    categories.insert(
        "unusedAccessKeys".to_string(),
        remediable(
            issue("Unused Keys", 1),
            "Are you sure you want to delete this Access Key?",
        ),
    );
    categories.insert("unusedIAMUsers".to_string(), issue("Unused IAM Users", 1));
    categories.insert(
        "passwordPolicy".to_string(),
        CategoryReport {
            label: "Password Strength Policy".to_string(),
            severity: Some(1),
            score: Some(0),
            can_fix: Some(true),
            alert_message: Some("Are you sure you want apply this password policy?".to_string()),
            ..Default::default()
        },
    );
    categories.insert("adminUsers".to_string(), issue("Admin IAM Users", 1));
    categories.insert("adminRoles".to_string(), issue("Admin IAM Roles", 1));
    categories.insert(
        "publicRWS3Buckets".to_string(),
        issue("S3s Public Read/Write Permissions", 1),
    );
    categories.insert("expiredAccessKeys".to_string(), issue("Expired Keys", 2));
    categories.insert(
        "insecurePublicPortsSGs".to_string(),
        issue("Security Groups with vulnerable public ports", 2),
    );
    categories.insert(
        "publicSSHAccess".to_string(),
        issue("Security Groups open to world SSH port", 2),
    );
    categories.insert(
        "cloudTrailsNotConfigured".to_string(),
        remediable(
            issue("Regions without CloudTrails", 3),
            "Are you sure you want enable CloudTrail for this Region?",
        ),
    );
    categories.insert(
        "rdsDataEncryptionAtRest".to_string(),
        issue("RDSs without Data Encryption", 3),
    );
    categories.insert("publicRDS".to_string(), issue("Public RDS Instances", 3));
    // Assume-insecure until the account summary proves otherwise.
    categories.insert(
        "rootAccountWithoutMFA".to_string(),
        CategoryReport {
            label: "AWS Root Account without MFA".to_string(),
            count: Some(1),
            severity: Some(3),
            ..Default::default()
        },
    );
    categories.insert("ec2WithoutIAM".to_string(), issue("EC2 without IAM Profile", 4));
    IssueReport::from_categories(categories)
}

/// Template for the maintenance engine
pub fn maintenance() -> IssueReport {
    let mut categories = BTreeMap::new();
    categories.insert(
        "staleSecurityGroups".to_string(),
        remediable(
            issue("Stale Security Groups", 2),
            "Are you sure you want to delete this item?",
        ),
    );
    categories.insert(
        "vpcWithoutPrivateSubnet".to_string(),
        issue("VPCs without Private Subnets", 2),
    );
    categories.insert("failingNATGateways".to_string(), issue("Failing NAT Gateways", 4));
    categories.insert(
        "vpcWithoutS3Endpoints".to_string(),
        remediable(
            issue("VPCs without S3 Endpoints", 4),
            "This will create a new S3 endpoint in the following VPC",
        ),
    );
    categories.insert(
        "classicEC2Instances".to_string(),
        issue("EC2 instances outside VPC", 4),
    );
    categories.insert(
        "ec2WithoutEBSOptimised".to_string(),
        issue("EC2 without EBS Optimized", 2),
    );
    categories.insert("unencryptedVolumes".to_string(), issue("Volumes Not Encrypted", 4));
    categories.insert(
        "s3BucketsWithoutVersioning".to_string(),
        remediable(
            issue("S3 Buckets without Versioning", 4),
            "Are you sure you want to enable versioning for the following bucket?",
        ),
    );
    categories.insert(
        "ipv6VPCWithoutEgressOnlyIGW".to_string(),
        issue("IPv6 VPC without Egress only Internet Gateways", 5),
    );
    categories.insert(
        "ec2NotTerminationProtected".to_string(),
        remediable(
            issue("EC2 Termination Protection Disabled", 1),
            "Are you sure you want to enable Termination Protection for the following instance?",
        ),
    );
    IssueReport::from_categories(categories)
}

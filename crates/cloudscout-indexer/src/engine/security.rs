//! Security engine
//!
//! Identity rules run over the global slots, perimeter rules per region.
//! Key and login ages arrive as precomputed day counts, so no clock is
//! needed here. Two categories assume the worst until data proves
//! otherwise: the root-MFA count seeds at 1 and clears only when the
//! account summary reports MFA enabled, and the password policy score
//! seeds at 0 until a fetched policy replaces it.

use cloudscout_common::defaults::SSH_PORT;
use cloudscout_common::record::{entry_int, entry_str};
use cloudscout_common::{template, IssueReport, ResourceRecord, ResourceType, Snapshot};
use serde_json::Value;

use crate::config::RulePolicy;
use crate::engine::{is_blank, policy_grants_admin, sg_exposes_port};

pub fn evaluate(snapshot: &Snapshot, rules: &RulePolicy) -> IssueReport {
    let mut report = template::security_issues();

    if let Some(users) = snapshot.global_slot(ResourceType::Users) {
        let groups = snapshot.global_slot(ResourceType::Groups).unwrap_or(&[]);

        if let Some(cat) = report.category_mut("usersWithoutMFA") {
            for user in users {
                if !user.flag("hasMFAEnabled") {
                    cat.add_item(user.id());
                }
            }
        }
        if let Some(cat) = report.category_mut("adminUsers") {
            for user in users {
                if user_grants_admin(user, groups) {
                    cat.add_item(user.id());
                }
            }
        }
        if let Some(cat) = report.category_mut("unusedAccessKeys") {
            for user in users {
                for key in user.list("accessKeys") {
                    // A key that has never been used has no lastUsed at all
                    let idle = entry_int(key, "lastUsed")
                        .map(|days| days > rules.max_unused_access_key_age_days)
                        .unwrap_or(true);
                    if idle {
                        cat.add_item(entry_str(key, "id").unwrap_or_default());
                    }
                }
            }
        }
        if let Some(cat) = report.category_mut("expiredAccessKeys") {
            for user in users {
                for key in user.list("accessKeys") {
                    let expired = entry_int(key, "age")
                        .map(|age| age > rules.max_access_key_age_days)
                        .unwrap_or(false);
                    if expired {
                        cat.add_item(entry_str(key, "id").unwrap_or_default());
                    }
                }
            }
        }
        if let Some(cat) = report.category_mut("unusedIAMUsers") {
            for user in users {
                let dormant = user
                    .int("lastLoggedIn")
                    .map(|days| days > rules.max_unused_iam_user_age_days)
                    .unwrap_or(false);
                if dormant {
                    cat.add_item(user.id());
                }
            }
        }
    }

    if let Some(roles) = snapshot.global_slot(ResourceType::Roles) {
        if let Some(cat) = report.category_mut("adminRoles") {
            for role in roles {
                if policy_grants_admin(role.list("policies")) {
                    cat.add_item(role.id());
                }
            }
        }
    }

    if let Some(summary) = snapshot.global_single(ResourceType::AccountSummary) {
        if summary.flag("accountMFAEnabled") {
            if let Some(cat) = report.category_mut("rootAccountWithoutMFA") {
                cat.count = Some(0);
            }
        }
    }

    if let Some(buckets) = snapshot.global_slot(ResourceType::S3Buckets) {
        if let Some(cat) = report.category_mut("publicRWS3Buckets") {
            for bucket in buckets {
                if bucket.flag("isPublicRead") || bucket.flag("isPublicWrite") {
                    cat.add_item(bucket.id());
                }
            }
        }
    }

    if let Some(policy) = snapshot.global_single(ResourceType::PasswordPolicy) {
        if let Some(cat) = report.category_mut("passwordPolicy") {
            cat.score = Some(policy.int("score").unwrap_or(0));
        }
    }

    for (region, slots) in &snapshot.regional {
        if let Some(rdses) = slots.get(&ResourceType::Rdses) {
            if let Some(cat) = report.category_mut("publicRDS") {
                for rds in rdses {
                    if rds.flag("isPublic") {
                        cat.add_item(rds.id());
                    }
                }
            }
            if let Some(cat) = report.category_mut("rdsDataEncryptionAtRest") {
                for rds in rdses {
                    if !rds.flag("isEncrypted") {
                        cat.add_item(rds.id());
                    }
                }
            }
        }
        if let Some(ec2s) = slots.get(&ResourceType::Ec2s) {
            if let Some(cat) = report.category_mut("ec2WithoutIAM") {
                for ec2 in ec2s {
                    if is_blank(ec2, "iamProfileId") {
                        cat.add_item(ec2.id());
                    }
                }
            }
        }
        if let Some(groups) = slots.get(&ResourceType::SecurityGroups) {
            if let Some(cat) = report.category_mut("insecurePublicPortsSGs") {
                for group in groups {
                    if sg_exposes_port(group, &rules.vulnerable_ports) {
                        cat.add_item(group.id());
                    }
                }
            }
            if let Some(cat) = report.category_mut("publicSSHAccess") {
                for group in groups {
                    if sg_exposes_port(group, &[SSH_PORT]) {
                        cat.add_item(group.id());
                    }
                }
            }
        }
        // A trail-less region is only provable from a present, empty slot;
        // a failed fetch must not flag the region.
        if let Some(trails) = slots.get(&ResourceType::CloudTrails) {
            if trails.is_empty() {
                if let Some(cat) = report.category_mut("cloudTrailsNotConfigured") {
                    cat.add_item(region.as_str());
                }
            }
        }
    }

    report
}

/// Admin either through the user's own policies or any group they belong to
fn user_grants_admin(user: &ResourceRecord, groups: &[ResourceRecord]) -> bool {
    if policy_grants_admin(user.list("policies")) {
        return true;
    }
    user.list("groups")
        .iter()
        .filter_map(Value::as_str)
        .any(|name| {
            groups
                .iter()
                .filter(|group| group.id() == name)
                .any(|group| policy_grants_admin(group.list("policies")))
        })
}

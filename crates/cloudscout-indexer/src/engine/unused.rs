//! Unused-resource engine
//!
//! Counts every record of each present slot into the category totals, then
//! applies the per-type unused predicate. Cross-type lookups (snapshot to
//! image, launch config to scaling group) stay inside the record's own
//! region. Cost savings accrue as floats and round once per category.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cloudscout_common::record::entry_str;
use cloudscout_common::{cost, template, IssueReport, ResourceRecord, ResourceType, Snapshot};
use serde_json::Value;

use crate::config::RulePolicy;
use crate::engine::{days_since, image_reference};

pub fn evaluate(snapshot: &Snapshot, rules: &RulePolicy, now: DateTime<Utc>) -> IssueReport {
    let mut report = template::unused_resources();
    let mut costs: BTreeMap<&'static str, f64> = BTreeMap::new();

    for (region, slots) in &snapshot.regional {
        for (ty, records) in slots {
            let Some(cat) = report.category_mut(ty.key()) else {
                continue;
            };
            cat.add_total(records.len() as i64);

            match ty {
                ResourceType::Volumes => {
                    for volume in records {
                        if volume.list("attachments").is_empty() {
                            cat.add_item(volume.id());
                            *costs.entry("volumes").or_default() += cost::volume_monthly(volume);
                        }
                    }
                }
                ResourceType::Eips => {
                    for eip in records {
                        if !eip.has("instanceId") && !eip.has("networkInterfaceId") {
                            cat.add_item(eip.str("ip").unwrap_or(eip.id()));
                            *costs.entry("eips").or_default() += cost::EIP_MONTHLY;
                        }
                    }
                }
                ResourceType::Snapshots => {
                    let amis = snapshot.sibling_records(region, ResourceType::Amis);
                    let volumes = snapshot.sibling_records(region, ResourceType::Volumes);
                    for snap in records {
                        let description = snap.str("description").unwrap_or("");
                        let Some((_, image_id)) = image_reference(description) else {
                            continue;
                        };
                        if image_id.is_empty() {
                            continue;
                        }
                        let image_exists = amis.iter().any(|ami| ami.id() == image_id);
                        let volume_exists = snap
                            .str("volumeId")
                            .map(|vid| volumes.iter().any(|v| v.id() == vid))
                            .unwrap_or(false);
                        if !image_exists && !volume_exists {
                            cat.add_item(snap.id());
                        }
                    }
                }
                ResourceType::SecurityGroups => {
                    let ec2s = snapshot.sibling_records(region, ResourceType::Ec2s);
                    for group in records {
                        let name = group.str("name").unwrap_or("");
                        if name == "default" || name.contains("ElasticMapReduce") {
                            continue;
                        }
                        let referenced = ec2s.iter().any(|ec2| {
                            ec2.list("securityGroups")
                                .iter()
                                .any(|sg| entry_str(sg, "id") == Some(group.id()))
                        });
                        if !referenced {
                            cat.add_item(group.id());
                        }
                    }
                }
                ResourceType::Amis => {
                    for ami in records {
                        let stale = ami
                            .int("age")
                            .map(|age| age > rules.max_image_age_days)
                            .unwrap_or(false);
                        if stale {
                            cat.add_item(ami.id());
                        }
                    }
                }
                ResourceType::Ec2s => {
                    for ec2 in records {
                        if ec2.str("state") != Some("stopped") {
                            continue;
                        }
                        let parked = ec2
                            .str("lastStateChangedOn")
                            .and_then(|raw| days_since(raw, now))
                            .map(|days| days > rules.max_stopped_instance_age_days)
                            .unwrap_or(false);
                        if parked {
                            cat.add_item(ec2.id());
                        }
                    }
                }
                ResourceType::Enis => {
                    for eni in records {
                        if eni.str("status") == Some("available")
                            && eni.str("description") != Some("RDSNetworkInterface")
                        {
                            cat.add_item(eni.id());
                        }
                    }
                }
                ResourceType::RouteTables => {
                    for table in records {
                        if table.list("associations").is_empty() {
                            cat.add_item(table.id());
                        }
                    }
                }
                ResourceType::InternetGateways => {
                    for gateway in records {
                        if gateway.list("attachments").is_empty() {
                            cat.add_item(gateway.id());
                        }
                    }
                }
                ResourceType::VpnGateways => {
                    for gateway in records {
                        if gateway.str("state") == Some("available")
                            || gateway.list("vpcAttachments").is_empty()
                        {
                            cat.add_item(gateway.id());
                            *costs.entry("vpnGateways").or_default() += cost::VPN_GATEWAY_MONTHLY;
                        }
                    }
                }
                ResourceType::Elbs => {
                    for balancer in records {
                        if balancer.list("instances").is_empty() {
                            cat.add_item(balancer.id());
                            *costs.entry("elbs").or_default() += cost::ELB_MONTHLY;
                        }
                    }
                }
                ResourceType::Albs => {
                    let target_groups =
                        snapshot.sibling_records(region, ResourceType::TargetGroups);
                    for balancer in records {
                        if alb_is_unused(balancer.list("listeners"), target_groups) {
                            cat.add_item(balancer.id());
                            *costs.entry("albs").or_default() += cost::ALB_MONTHLY;
                        }
                    }
                }
                ResourceType::RdsManualSnapshots => {
                    for snap in records {
                        let stale = snap
                            .int("age")
                            .map(|age| age > rules.max_rds_snapshot_age_days)
                            .unwrap_or(false);
                        if stale {
                            cat.add_item(snap.id());
                            *costs.entry("rdsManualSnapshots").or_default() +=
                                cost::rds_snapshot_monthly(snap);
                        }
                    }
                }
                ResourceType::LaunchConfigs => {
                    let scaling_groups =
                        snapshot.sibling_records(region, ResourceType::AutoScalingGroups);
                    for config in records {
                        let Some(name) = config.str("name") else {
                            continue;
                        };
                        let referenced = scaling_groups
                            .iter()
                            .any(|group| group.str("launchConfigName") == Some(name));
                        if !referenced {
                            cat.add_item(name);
                        }
                    }
                }
                ResourceType::AutoScalingGroups => {
                    for group in records {
                        if group.int("desiredCapacity").unwrap_or(0) == 0 {
                            cat.add_item(group.id());
                        }
                    }
                }
                // vpcs, targetGroups and rdses report totals only
                _ => {}
            }
        }
    }

    for (key, amount) in costs {
        if let Some(cat) = report.category_mut(key) {
            cat.cost_saving = Some(amount.round() as i64);
        }
    }
    report
}

/// A balancer is unused when it routes nowhere: no listeners at all, or
/// every listener's every target group resolves to one with no registered
/// targets. An arn that does not resolve keeps the balancer in use.
fn alb_is_unused(listeners: &[Value], target_groups: &[ResourceRecord]) -> bool {
    if listeners.is_empty() {
        return true;
    }
    listeners.iter().all(|listener| {
        let attached = listener.get("targetGroups").and_then(Value::as_array);
        let Some(attached) = attached else {
            return true;
        };
        attached.iter().all(|group| {
            let Some(arn) = entry_str(group, "arn") else {
                return false;
            };
            match target_groups.iter().find(|tg| tg.str("arn") == Some(arn)) {
                Some(tg) => tg.list("instanceHealth").is_empty(),
                None => false,
            }
        })
    })
}

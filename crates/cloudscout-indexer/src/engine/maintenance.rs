//! Maintenance engine
//!
//! Hygiene rules that need no thresholds or clock: versioning, encryption,
//! termination protection, and VPC plumbing. Most of the VPC rules read the
//! nested lists (`natGateways`, `staleSecurityGroups`) the source shapes
//! onto each vpc record.

use cloudscout_common::record::entry_str;
use cloudscout_common::{template, IssueReport, ResourceType, Snapshot};

use crate::engine::is_blank;

pub fn evaluate(snapshot: &Snapshot) -> IssueReport {
    let mut report = template::maintenance();

    if let Some(buckets) = snapshot.global_slot(ResourceType::S3Buckets) {
        if let Some(cat) = report.category_mut("s3BucketsWithoutVersioning") {
            for bucket in buckets {
                if !bucket.flag("isVersioningEnabled") {
                    cat.add_item(bucket.id());
                }
            }
        }
    }

    for (region, slots) in &snapshot.regional {
        if let Some(ec2s) = slots.get(&ResourceType::Ec2s) {
            if let Some(cat) = report.category_mut("ec2NotTerminationProtected") {
                for ec2 in ec2s {
                    if !ec2.flag("isTerminationProtected") {
                        cat.add_item(ec2.id());
                    }
                }
            }
            if let Some(cat) = report.category_mut("classicEC2Instances") {
                for ec2 in ec2s {
                    if is_blank(ec2, "vpcId") {
                        cat.add_item(ec2.id());
                    }
                }
            }
            if let Some(cat) = report.category_mut("ec2WithoutEBSOptimised") {
                for ec2 in ec2s {
                    if !ec2.flag("isEbsOptimized") {
                        cat.add_item(ec2.id());
                    }
                }
            }
        }

        if let Some(volumes) = slots.get(&ResourceType::Volumes) {
            if let Some(cat) = report.category_mut("unencryptedVolumes") {
                for volume in volumes {
                    if !volume.flag("isEncrypted") {
                        cat.add_item(volume.id());
                    }
                }
            }
        }

        if let Some(vpcs) = slots.get(&ResourceType::Vpcs) {
            if let Some(cat) = report.category_mut("staleSecurityGroups") {
                for vpc in vpcs {
                    for group in vpc.list("staleSecurityGroups") {
                        if let Some(id) = entry_str(group, "id") {
                            cat.add_item(id);
                        }
                    }
                }
            }
            if let Some(cat) = report.category_mut("failingNATGateways") {
                for vpc in vpcs {
                    for gateway in vpc.list("natGateways") {
                        let failed = match entry_str(gateway, "state") {
                            Some(state) => state == "failed",
                            None => true,
                        };
                        if failed {
                            cat.add_item(entry_str(gateway, "id").unwrap_or_default());
                        }
                    }
                }
            }
            if let Some(cat) = report.category_mut("vpcWithoutS3Endpoints") {
                let endpoints = snapshot.sibling_records(region, ResourceType::VpcEndpoints);
                for vpc in vpcs {
                    let has_s3_endpoint = endpoints.iter().any(|endpoint| {
                        endpoint.str("vpcId") == Some(vpc.id())
                            && endpoint
                                .str("serviceName")
                                .map(|name| name.ends_with(".s3"))
                                .unwrap_or(false)
                    });
                    if !has_s3_endpoint {
                        cat.add_item(vpc.id());
                    }
                }
            }
            if let Some(cat) = report.category_mut("ipv6VPCWithoutEgressOnlyIGW") {
                for vpc in vpcs {
                    if vpc.flag("hasIPv6Association")
                        && !vpc.flag("hasEgressOnlyInternetGateways")
                    {
                        cat.add_item(vpc.id());
                    }
                }
            }
            if let Some(cat) = report.category_mut("vpcWithoutPrivateSubnet") {
                for vpc in vpcs {
                    if vpc.list("natGateways").is_empty() {
                        cat.add_item(vpc.id());
                    }
                }
            }
        }
    }

    report
}

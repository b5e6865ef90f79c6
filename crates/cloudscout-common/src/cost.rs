//! Monthly cost rates for the unused-resource engine
//!
//! Rates are rough monthly list prices in whole-account currency units and
//! feed the per-category `costSaving` estimate. Accumulation stays in float
//! and is rounded once per category when an engine run finalizes.

use crate::record::ResourceRecord;

/// Monthly cost of one unattached Elastic IP
pub const EIP_MONTHLY: f64 = 4.0;

/// Monthly cost of one idle VPN gateway
pub const VPN_GATEWAY_MONTHLY: f64 = 37.5;

/// Monthly cost of one idle classic load balancer
pub const ELB_MONTHLY: f64 = 18.30;

/// Monthly cost of one idle application load balancer
pub const ALB_MONTHLY: f64 = 18.30;

/// Monthly cost per allocated GB of an RDS manual snapshot
pub const RDS_SNAPSHOT_GB_MONTHLY: f64 = 0.095;

/// Per-GB (and per-IOPS where provisioned) monthly rates by volume type
const VOLUME_RATES: &[(&str, f64, Option<f64>)] = &[
    ("io1", 0.131, Some(0.070)),
    ("gp2", 0.114, None),
    ("st1", 0.051, None),
    ("sc1", 0.029, None),
    ("standard", 0.131, None),
];

/// Monthly cost of a volume from its `type`, `size`, and `iops` attributes.
/// Unknown volume types cost nothing.
pub fn volume_monthly(volume: &ResourceRecord) -> f64 {
    let Some(volume_type) = volume.str("type") else {
        return 0.0;
    };
    let Some((_, size_rate, iops_rate)) = VOLUME_RATES.iter().find(|(t, _, _)| *t == volume_type)
    else {
        return 0.0;
    };
    let mut cost = volume.float("size").unwrap_or(0.0) * size_rate;
    if let Some(rate) = iops_rate {
        cost += volume.float("iops").unwrap_or(0.0) * rate;
    }
    cost
}

/// Monthly storage cost of an RDS manual snapshot
pub fn rds_snapshot_monthly(snapshot: &ResourceRecord) -> f64 {
    snapshot.float("allocatedStorage").unwrap_or(0.0) * RDS_SNAPSHOT_GB_MONTHLY
}

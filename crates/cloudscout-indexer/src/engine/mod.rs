//! Rule engines over a frozen snapshot
//!
//! Each engine seeds its report from the category template, walks the
//! snapshot's present slots, and fills in counters and item lists. Absent
//! slots contribute nothing, so a partial snapshot never trips a rule that
//! needs data it does not have. Engines are pure over (snapshot, thresholds,
//! clock) and therefore idempotent.

use chrono::{DateTime, NaiveDateTime, Utc};
use cloudscout_common::record::{entry_int, entry_str, ResourceRecord};
use serde_json::Value;

pub mod maintenance;
pub mod security;
pub mod unused;

/// Whole days elapsed since a source timestamp.
///
/// Sources emit RFC 3339 or a bare `%Y-%m-%dT%H:%M:%S%.f`; anything else
/// reads as unknown and the caller's rule stays quiet.
fn days_since(raw: &str, now: DateTime<Utc>) -> Option<i64> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
        })
        .ok()?;
    Some((now - parsed).num_days())
}

/// String attribute absent, null, or empty
fn is_blank(record: &ResourceRecord, key: &str) -> bool {
    record.str(key).unwrap_or("").is_empty()
}

/// Any policy name granting blanket access
fn policy_grants_admin(policies: &[Value]) -> bool {
    policies.iter().any(|policy| {
        let name = policy.as_str().or_else(|| entry_str(policy, "name")).unwrap_or("");
        name.contains("AdministratorAccess") || name.contains("PowerUserAccess")
    })
}

/// Ingress rule exposing one of `ports` to the whole internet.
///
/// A rule with neither port bound is skipped; a `-1` bound means all ports.
fn sg_exposes_port(group: &ResourceRecord, ports: &[i64]) -> bool {
    group.list("ingressRules").iter().any(|rule| {
        let open_to_world = rule
            .get("ipRanges")
            .and_then(Value::as_array)
            .map(|ranges| {
                ranges
                    .iter()
                    .any(|range| entry_str(range, "CidrIp") == Some("0.0.0.0/0"))
            })
            .unwrap_or(false);
        if !open_to_world {
            return false;
        }

        let from = entry_int(rule, "fromPort");
        let to = entry_int(rule, "toPort");
        if from.is_none() && to.is_none() {
            return false;
        }
        from == Some(-1)
            || to == Some(-1)
            || from.map(|p| ports.contains(&p)).unwrap_or(false)
            || to.map(|p| ports.contains(&p)).unwrap_or(false)
    })
}

/// Instance and image ids out of a `Created by CreateImage(<instance>) for
/// <image> ...` snapshot description
fn image_reference(description: &str) -> Option<(&str, &str)> {
    let rest = description.strip_prefix("Created by CreateImage(")?;
    let (instance, rest) = rest.split_once(')')?;
    let rest = rest.strip_prefix(" for ")?;
    let (image, _) = rest.split_once(' ')?;
    Some((instance, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn days_since_accepts_both_source_formats() {
        let now = "2024-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(days_since("2024-01-01T00:00:00Z", now), Some(60));
        assert_eq!(days_since("2024-01-01T00:00:00.123", now), Some(60));
        assert_eq!(days_since("yesterday", now), None);
    }

    #[test]
    fn admin_policies_match_by_substring() {
        assert!(policy_grants_admin(&[json!("AdministratorAccess")]));
        assert!(policy_grants_admin(&[json!({"name": "MyPowerUserAccess-v2"})]));
        assert!(!policy_grants_admin(&[json!("ReadOnlyAccess")]));
        assert!(!policy_grants_admin(&[]));
    }

    #[test]
    fn port_exposure_requires_world_cidr_and_a_bound() {
        let world = json!([{"CidrIp": "0.0.0.0/0"}]);
        let open = ResourceRecord::new("sg-1").with(
            "ingressRules",
            json!([{"ipRanges": world, "fromPort": 3389, "toPort": 3389}]),
        );
        assert!(sg_exposes_port(&open, &[3389]));
        assert!(!sg_exposes_port(&open, &[22]));

        let all_ports = ResourceRecord::new("sg-2").with(
            "ingressRules",
            json!([{"ipRanges": [{"CidrIp": "0.0.0.0/0"}], "fromPort": -1}]),
        );
        assert!(sg_exposes_port(&all_ports, &[22]));

        let unbounded = ResourceRecord::new("sg-3").with(
            "ingressRules",
            json!([{"ipRanges": [{"CidrIp": "0.0.0.0/0"}]}]),
        );
        assert!(!sg_exposes_port(&unbounded, &[22]), "no port bound at all is skipped");

        let internal = ResourceRecord::new("sg-4").with(
            "ingressRules",
            json!([{"ipRanges": [{"CidrIp": "10.0.0.0/8"}], "fromPort": 22, "toPort": 22}]),
        );
        assert!(!sg_exposes_port(&internal, &[22]));
    }

    #[test]
    fn image_reference_needs_the_full_shape() {
        assert_eq!(
            image_reference("Created by CreateImage(i-0abc) for ami-0def from vol-1"),
            Some(("i-0abc", "ami-0def"))
        );
        assert_eq!(image_reference("manual snapshot"), None);
        assert_eq!(
            image_reference("Created by CreateImage(i-0abc) for ami-0def"),
            None,
            "description without trailing context does not parse"
        );
    }
}

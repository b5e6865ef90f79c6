//! Fetch plan construction
//!
//! One unit per (region, regional type) pair plus one per global type.
//! The plan is the complete set of snapshot slots a run can produce.

use cloudscout_common::ResourceType;

/// A single fetch task: one resource type, optionally scoped to a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUnit {
    pub resource_type: ResourceType,
    /// `None` for global types
    pub region: Option<String>,
}

/// Build the full fetch plan for an account's active regions
pub fn fetch_plan(regions: &[String]) -> Vec<FetchUnit> {
    let mut plan = Vec::with_capacity(
        regions.len() * ResourceType::REGIONAL.len() + ResourceType::GLOBAL.len(),
    );
    for region in regions {
        for resource_type in ResourceType::REGIONAL {
            plan.push(FetchUnit {
                resource_type,
                region: Some(region.clone()),
            });
        }
    }
    for resource_type in ResourceType::GLOBAL {
        plan.push(FetchUnit {
            resource_type,
            region: None,
        });
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_all_slots() {
        let regions = vec!["us-east-1".to_string(), "eu-west-1".to_string()];
        let plan = fetch_plan(&regions);
        assert_eq!(plan.len(), 2 * 20 + 6);

        let globals = plan.iter().filter(|u| u.region.is_none()).count();
        assert_eq!(globals, 6);
        assert!(plan
            .iter()
            .any(|u| u.resource_type == ResourceType::Volumes
                && u.region.as_deref() == Some("eu-west-1")));
    }

    #[test]
    fn test_no_regions_still_fetches_globals() {
        let plan = fetch_plan(&[]);
        assert_eq!(plan.len(), 6);
        assert!(plan.iter().all(|u| u.region.is_none()));
    }
}

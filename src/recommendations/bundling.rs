// Bundling Processor
//
// Groups compatible recommendations into a single synthetic visit so the
// caller sees "3 Services Bundle" instead of three separate line items.
// Grouping is a greedy left-to-right partition over the ordered list, so
// deterministic input order gives deterministic bundles.

use crate::recommendations::models::ServiceRecommendationResult;
use crate::recommendations::types::RuleEngineConfig;

/// Groups bundle-eligible recommendations into synthetic bundle entries
pub struct BundlingProcessor {
    enabled: bool,
}

impl BundlingProcessor {
    pub fn new(config: &RuleEngineConfig) -> Self {
        Self {
            enabled: config.enable_bundling,
        }
    }

    /// Partition recommendations into bundles where possible
    ///
    /// Each item joins at most one bundle. A candidate joins the current
    /// seed's group when it is bundle-eligible, shares the seed's category,
    /// and its priority is within one ordinal step of the seed's. Groups of
    /// two or more collapse into a synthetic bundle; everything else passes
    /// through unchanged, in its original position.
    pub fn bundle(
        &self,
        recommendations: Vec<ServiceRecommendationResult>,
    ) -> Vec<ServiceRecommendationResult> {
        if !self.enabled || recommendations.len() < 2 {
            return recommendations;
        }

        let mut consumed = vec![false; recommendations.len()];
        let mut output = Vec::with_capacity(recommendations.len());

        for seed_idx in 0..recommendations.len() {
            if consumed[seed_idx] {
                continue;
            }
            consumed[seed_idx] = true;

            let seed = &recommendations[seed_idx];
            if !seed.can_bundle {
                output.push(seed.clone());
                continue;
            }

            let mut group = vec![seed_idx];
            for candidate_idx in (seed_idx + 1)..recommendations.len() {
                if consumed[candidate_idx] {
                    continue;
                }
                let candidate = &recommendations[candidate_idx];
                if candidate.can_bundle
                    && candidate.category == seed.category
                    && candidate.priority.within_one_step(seed.priority)
                {
                    consumed[candidate_idx] = true;
                    group.push(candidate_idx);
                }
            }

            if group.len() < 2 {
                output.push(seed.clone());
                continue;
            }

            output.push(build_bundle(&recommendations, &group));
        }

        output
    }
}

/// Collapse a group of recommendations into one synthetic bundle entry
///
/// The bundle inherits identity fields from the first member; cost is the
/// sum of the members, duration the maximum (work happens in one visit).
fn build_bundle(
    recommendations: &[ServiceRecommendationResult],
    group: &[usize],
) -> ServiceRecommendationResult {
    let members: Vec<&ServiceRecommendationResult> =
        group.iter().map(|&i| &recommendations[i]).collect();
    let seed = members[0];

    let service_names: Vec<String> = members.iter().map(|m| m.service_name.clone()).collect();
    let total_cost = members.iter().map(|m| m.estimated_cost).sum();
    let max_duration = members
        .iter()
        .map(|m| m.estimated_duration_minutes)
        .max()
        .unwrap_or(seed.estimated_duration_minutes);
    let highest_priority = members.iter().map(|m| m.priority).max().unwrap_or(seed.priority);
    let highest_severity = members.iter().map(|m| m.severity).max().unwrap_or(seed.severity);

    let mut bundle = seed.clone();
    bundle.id = None;
    bundle.rule_code = format!("BUNDLE_{}", seed.rule_code);
    bundle.service_type = "bundle".to_string();
    bundle.service_name = format!("{} Services Bundle", members.len());
    bundle.priority = highest_priority;
    bundle.severity = highest_severity;
    bundle.reason = format!("Bundled services due together: {}", service_names.join(", "));
    bundle.estimated_cost = total_cost;
    bundle.estimated_duration_minutes = max_duration;
    bundle.depends_on = Vec::new();
    bundle.conflicts_with = Vec::new();
    bundle.bundled_services = service_names;
    bundle
}

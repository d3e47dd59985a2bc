// Rule Evaluator
//
// Computes whether a maintenance rule is triggered "now" for a vehicle, and
// if not, at what mileage or date it will be. Evaluation is pure: it reads
// the rule, the vehicle context, and the service history, and produces a
// result with a human-readable derivation.

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

use crate::models::ServiceHistoryEntry;
use crate::recommendations::catalog::{service_estimate, ServiceRuleDefinition};
use crate::recommendations::classifier::VehicleClassifier;
use crate::recommendations::error::RecommendationError;
use crate::recommendations::models::{RuleEvaluationResult, VehicleContext};
use crate::recommendations::types::{DrivingCondition, RuleType};

/// Default interval-shrink multipliers for mileage-based rules
const MILEAGE_SEVERE_DEFAULT: f64 = 0.8;
const MILEAGE_OFFROAD_DEFAULT: f64 = 0.7;
const MILEAGE_COMMERCIAL: f64 = 0.9;

/// Time-based rules shrink more gently by default
const TIME_SEVERE_DEFAULT: f64 = 0.9;
const TIME_OFFROAD_DEFAULT: f64 = 0.85;
const TIME_COMMERCIAL: f64 = 0.95;

/// Evaluates catalog rules against a vehicle's context and history
pub struct RuleEvaluator {
    classifier: Arc<dyn VehicleClassifier + Send + Sync>,
}

impl RuleEvaluator {
    /// Create a new RuleEvaluator with the given vehicle classifier
    pub fn new(classifier: Arc<dyn VehicleClassifier + Send + Sync>) -> Self {
        Self { classifier }
    }

    /// Check whether a rule applies to this vehicle at all
    ///
    /// Run before evaluation, not inside it. A rule is skipped when the
    /// vehicle's class is known and not in `applicable_vehicle_classes`, or
    /// when the driving condition is not in `applicable_driving_conditions`.
    /// Empty sets mean "applies to all"; an unclassifiable vehicle matches
    /// every class restriction.
    pub fn is_applicable(&self, rule: &ServiceRuleDefinition, context: &VehicleContext) -> bool {
        if !rule.applicable_vehicle_classes.is_empty() {
            if let Some(class) = self.classifier.classify(&context.make, &context.model) {
                if !rule.applicable_vehicle_classes.contains(&class) {
                    return false;
                }
            }
        }

        if !rule.applicable_driving_conditions.is_empty()
            && !rule
                .applicable_driving_conditions
                .contains(&context.driving_condition)
        {
            return false;
        }

        true
    }

    /// Evaluate a rule against today's date
    pub fn evaluate(
        &self,
        rule: &ServiceRuleDefinition,
        context: &VehicleContext,
        history: &[ServiceHistoryEntry],
    ) -> Result<RuleEvaluationResult, RecommendationError> {
        self.evaluate_at(rule, context, history, Utc::now().date_naive())
    }

    /// Evaluate a rule against an explicit "today", for deterministic tests
    pub fn evaluate_at(
        &self,
        rule: &ServiceRuleDefinition,
        context: &VehicleContext,
        history: &[ServiceHistoryEntry],
        today: NaiveDate,
    ) -> Result<RuleEvaluationResult, RecommendationError> {
        match rule.rule_type {
            RuleType::MileageBased => self.evaluate_mileage_rule(rule, context, history),
            RuleType::TimeBased => self.evaluate_time_rule(rule, context, history, today),
        }
    }

    fn evaluate_mileage_rule(
        &self,
        rule: &ServiceRuleDefinition,
        context: &VehicleContext,
        history: &[ServiceHistoryEntry],
    ) -> Result<RuleEvaluationResult, RecommendationError> {
        let interval = rule.mileage_interval.ok_or_else(|| {
            RecommendationError::InvalidRuleDefinition(format!(
                "rule '{}' is mileage-based but has no mileage interval",
                rule.code
            ))
        })?;

        let last = latest_service(history, rule.service_type);
        let last_mileage = last.map(|entry| entry.service_mileage).unwrap_or(0);

        let multiplier = mileage_multiplier(rule, context.driving_condition);
        let adjusted_interval = (interval as f64 * multiplier).floor() as i32;
        let due_mileage = last_mileage + adjusted_interval;
        let triggered = context.current_mileage >= due_mileage;

        let reason = format!(
            "Current mileage {} mi against an adjusted interval of {} mi since last service at {} mi (due at {} mi)",
            context.current_mileage, adjusted_interval, last_mileage, due_mileage
        );

        let (estimated_cost, estimated_duration_minutes) = service_estimate(rule.service_type);

        Ok(RuleEvaluationResult {
            rule_code: rule.code.to_string(),
            triggered,
            priority: rule.priority,
            severity: rule.severity,
            due_mileage: Some(due_mileage),
            due_date: None,
            reason,
            last_service_date: last.map(|entry| entry.service_date),
            last_service_mileage: last.map(|entry| entry.service_mileage),
            estimated_cost,
            estimated_duration_minutes,
        })
    }

    fn evaluate_time_rule(
        &self,
        rule: &ServiceRuleDefinition,
        context: &VehicleContext,
        history: &[ServiceHistoryEntry],
        today: NaiveDate,
    ) -> Result<RuleEvaluationResult, RecommendationError> {
        let total_days = rule.total_interval_days();
        if total_days <= 0 {
            return Err(RecommendationError::InvalidRuleDefinition(format!(
                "rule '{}' is time-based but has no positive day count",
                rule.code
            )));
        }

        let (estimated_cost, estimated_duration_minutes) = service_estimate(rule.service_type);
        let last = latest_service(history, rule.service_type);

        let Some(last_entry) = last else {
            // A service never performed is always a candidate
            let reason = format!(
                "No recorded {} service; due immediately",
                rule.service_name
            );
            return Ok(RuleEvaluationResult {
                rule_code: rule.code.to_string(),
                triggered: true,
                priority: rule.priority,
                severity: rule.severity,
                due_mileage: None,
                due_date: Some(today),
                reason,
                last_service_date: None,
                last_service_mileage: None,
                estimated_cost,
                estimated_duration_minutes,
            });
        };

        let multiplier = time_multiplier(rule, context.driving_condition);
        let adjusted_days = (total_days as f64 * multiplier).floor() as i64;
        let due_date = last_entry.service_date + Duration::days(adjusted_days);
        let triggered = today >= due_date;

        let reason = format!(
            "Last serviced on {} with an adjusted interval of {} days (due on {})",
            last_entry.service_date, adjusted_days, due_date
        );

        Ok(RuleEvaluationResult {
            rule_code: rule.code.to_string(),
            triggered,
            priority: rule.priority,
            severity: rule.severity,
            due_mileage: None,
            due_date: Some(due_date),
            reason,
            last_service_date: Some(last_entry.service_date),
            last_service_mileage: Some(last_entry.service_mileage),
            estimated_cost,
            estimated_duration_minutes,
        })
    }
}

/// Most recent history entry for a service type
///
/// History is consumed most-recent-first; only the latest entry per type
/// matters for interval math. Ties on date fall back to the higher mileage.
fn latest_service<'a>(
    history: &'a [ServiceHistoryEntry],
    service_type: &str,
) -> Option<&'a ServiceHistoryEntry> {
    history
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .max_by_key(|entry| (entry.service_date, entry.service_mileage))
}

fn mileage_multiplier(rule: &ServiceRuleDefinition, condition: DrivingCondition) -> f64 {
    match condition {
        DrivingCondition::Normal => 1.0,
        DrivingCondition::Severe => rule
            .severe_condition_multiplier
            .unwrap_or(MILEAGE_SEVERE_DEFAULT),
        DrivingCondition::Offroad => rule.offroad_multiplier.unwrap_or(MILEAGE_OFFROAD_DEFAULT),
        DrivingCondition::Commercial => MILEAGE_COMMERCIAL,
    }
}

fn time_multiplier(rule: &ServiceRuleDefinition, condition: DrivingCondition) -> f64 {
    match condition {
        DrivingCondition::Normal => 1.0,
        DrivingCondition::Severe => rule
            .severe_condition_multiplier
            .unwrap_or(TIME_SEVERE_DEFAULT),
        DrivingCondition::Offroad => rule.offroad_multiplier.unwrap_or(TIME_OFFROAD_DEFAULT),
        DrivingCondition::Commercial => TIME_COMMERCIAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::catalog::RuleCatalog;
    use crate::recommendations::classifier::{FixedClassifier, MakeModelClassifier, VehicleClass};
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn evaluator() -> RuleEvaluator {
        RuleEvaluator::new(Arc::new(MakeModelClassifier))
    }

    fn context(mileage: i32, condition: DrivingCondition) -> VehicleContext {
        VehicleContext {
            vehicle_id: 1,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: Some(2019),
            current_mileage: mileage,
            driving_condition: condition,
            service_interval: "standard".to_string(),
            engine_type: None,
            transmission: None,
            fuel_type: None,
        }
    }

    fn history_entry(service_type: &str, date: NaiveDate, mileage: i32) -> ServiceHistoryEntry {
        ServiceHistoryEntry {
            id: 1,
            vehicle_id: 1,
            service_type: service_type.to_string(),
            service_date: date,
            service_mileage: mileage,
            provider: None,
            cost: None,
            created_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn oil_change_rule() -> ServiceRuleDefinition {
        RuleCatalog::standard()
            .unwrap()
            .find("OIL_CHANGE_MILEAGE")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_mileage_rule_triggered_at_exact_interval() {
        // Interval 5000, last service at 50000, current 55000 -> due at 55000
        let rule = oil_change_rule();
        let ctx = context(55000, DrivingCondition::Normal);
        let history = vec![history_entry("oil_change", date(2024, 1, 10), 50000)];

        let result = evaluator().evaluate(&rule, &ctx, &history).unwrap();
        assert!(result.triggered);
        assert_eq!(result.due_mileage, Some(55000));
        assert_eq!(result.last_service_mileage, Some(50000));
    }

    #[test]
    fn test_mileage_rule_severe_condition_shrinks_interval() {
        // Severe multiplier 0.8 -> adjusted interval 4000, due at 54000
        let rule = oil_change_rule();
        let history = vec![history_entry("oil_change", date(2024, 1, 10), 50000)];

        let ctx = context(53000, DrivingCondition::Severe);
        let result = evaluator().evaluate(&rule, &ctx, &history).unwrap();
        assert!(!result.triggered);
        assert_eq!(result.due_mileage, Some(54000));

        let ctx = context(54000, DrivingCondition::Severe);
        let result = evaluator().evaluate(&rule, &ctx, &history).unwrap();
        assert!(result.triggered);
    }

    #[test]
    fn test_mileage_rule_offroad_and_commercial_multipliers() {
        let rule = oil_change_rule();
        let history = vec![history_entry("oil_change", date(2024, 1, 10), 10000)];

        // Offroad multiplier 0.7 -> adjusted 3500
        let result = evaluator()
            .evaluate(&rule, &context(13000, DrivingCondition::Offroad), &history)
            .unwrap();
        assert_eq!(result.due_mileage, Some(13500));

        // Commercial is a fixed 0.9 -> adjusted 4500
        let result = evaluator()
            .evaluate(&rule, &context(14000, DrivingCondition::Commercial), &history)
            .unwrap();
        assert_eq!(result.due_mileage, Some(14500));
    }

    #[test]
    fn test_mileage_rule_no_history_counts_from_zero() {
        let rule = oil_change_rule();
        let ctx = context(5200, DrivingCondition::Normal);

        let result = evaluator().evaluate(&rule, &ctx, &[]).unwrap();
        assert!(result.triggered);
        assert_eq!(result.due_mileage, Some(5000));
        assert_eq!(result.last_service_mileage, None);
    }

    #[test]
    fn test_mileage_rule_adjusted_interval_floors() {
        // 12000 * 0.75 = 9000 exactly; use a rule where flooring matters
        let mut rule = oil_change_rule();
        rule.mileage_interval = Some(3333);
        rule.severe_condition_multiplier = Some(0.8);
        let history = vec![history_entry("oil_change", date(2024, 1, 10), 0)];

        // 3333 * 0.8 = 2666.4 -> floor 2666
        let result = evaluator()
            .evaluate(&rule, &context(2666, DrivingCondition::Severe), &history)
            .unwrap();
        assert!(result.triggered);
        assert_eq!(result.due_mileage, Some(2666));
    }

    #[test]
    fn test_mileage_reason_states_derivation() {
        let rule = oil_change_rule();
        let ctx = context(55000, DrivingCondition::Normal);
        let history = vec![history_entry("oil_change", date(2024, 1, 10), 50000)];

        let result = evaluator().evaluate(&rule, &ctx, &history).unwrap();
        assert!(result.reason.contains("55000"));
        assert!(result.reason.contains("5000"));
        assert!(result.reason.contains("50000"));
    }

    #[test]
    fn test_mileage_rule_uses_latest_history_entry() {
        let rule = oil_change_rule();
        let ctx = context(56000, DrivingCondition::Normal);
        let history = vec![
            history_entry("oil_change", date(2023, 6, 1), 45000),
            history_entry("oil_change", date(2024, 1, 10), 52000),
            history_entry("tire_rotation", date(2024, 3, 1), 54000),
        ];

        let result = evaluator().evaluate(&rule, &ctx, &history).unwrap();
        assert_eq!(result.last_service_mileage, Some(52000));
        assert_eq!(result.due_mileage, Some(57000));
        assert!(!result.triggered);
    }

    #[test]
    fn test_time_rule_never_serviced_is_always_due() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("CABIN_AIR_FILTER_TIME").unwrap();
        let ctx = context(30000, DrivingCondition::Normal);
        let today = date(2025, 6, 1);

        let result = evaluator().evaluate_at(rule, &ctx, &[], today).unwrap();
        assert!(result.triggered);
        assert_eq!(result.due_date, Some(today));
        assert!(result.reason.contains("due immediately"));
    }

    #[test]
    fn test_time_rule_interval_arithmetic() {
        let catalog = RuleCatalog::standard().unwrap();
        // 12 months -> 360 days
        let rule = catalog.find("CABIN_AIR_FILTER_TIME").unwrap();
        let ctx = context(30000, DrivingCondition::Normal);
        let history = vec![history_entry("cabin_air_filter", date(2024, 1, 1), 20000)];

        let due = date(2024, 12, 26); // 2024-01-01 + 360 days
        let result = evaluator()
            .evaluate_at(rule, &ctx, &history, date(2024, 12, 25))
            .unwrap();
        assert!(!result.triggered);
        assert_eq!(result.due_date, Some(due));

        let result = evaluator()
            .evaluate_at(rule, &ctx, &history, due)
            .unwrap();
        assert!(result.triggered);
    }

    #[test]
    fn test_time_rule_severe_uses_gentler_default() {
        let catalog = RuleCatalog::standard().unwrap();
        // CABIN_AIR_FILTER_TIME has no explicit multiplier overrides
        let rule = catalog.find("CABIN_AIR_FILTER_TIME").unwrap();
        let ctx = context(30000, DrivingCondition::Severe);
        let history = vec![history_entry("cabin_air_filter", date(2024, 1, 1), 20000)];

        // 360 * 0.9 = 324 days
        let result = evaluator()
            .evaluate_at(rule, &ctx, &history, date(2024, 6, 1))
            .unwrap();
        assert_eq!(result.due_date, Some(date(2024, 1, 1) + Duration::days(324)));
    }

    #[test]
    fn test_time_rule_explicit_override_beats_default() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut rule = catalog.find("CABIN_AIR_FILTER_TIME").unwrap().clone();
        rule.severe_condition_multiplier = Some(0.5);
        let ctx = context(30000, DrivingCondition::Severe);
        let history = vec![history_entry("cabin_air_filter", date(2024, 1, 1), 20000)];

        // 360 * 0.5 = 180 days
        let result = evaluator()
            .evaluate_at(&rule, &ctx, &history, date(2024, 6, 1))
            .unwrap();
        assert_eq!(result.due_date, Some(date(2024, 1, 1) + Duration::days(180)));
    }

    #[test]
    fn test_estimates_come_from_service_table() {
        let rule = oil_change_rule();
        let ctx = context(55000, DrivingCondition::Normal);

        let result = evaluator().evaluate(&rule, &ctx, &[]).unwrap();
        assert_eq!(result.estimated_cost, dec!(45));
        assert_eq!(result.estimated_duration_minutes, 30);
    }

    #[test]
    fn test_estimate_fallback_for_unknown_service_type() {
        let mut rule = oil_change_rule();
        rule.service_type = "flux_capacitor_service";
        let ctx = context(55000, DrivingCondition::Normal);

        let result = evaluator().evaluate(&rule, &ctx, &[]).unwrap();
        assert_eq!(result.estimated_cost, dec!(50));
        assert_eq!(result.estimated_duration_minutes, 45);
    }

    #[test]
    fn test_applicability_driving_condition_filter() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("DIFFERENTIAL_SERVICE_MILEAGE").unwrap();
        let evaluator = RuleEvaluator::new(Arc::new(FixedClassifier(Some(VehicleClass::Truck))));

        assert!(evaluator.is_applicable(rule, &context(1000, DrivingCondition::Offroad)));
        assert!(!evaluator.is_applicable(rule, &context(1000, DrivingCondition::Normal)));
    }

    #[test]
    fn test_applicability_vehicle_class_filter() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("DIFFERENTIAL_SERVICE_MILEAGE").unwrap();
        let ctx = context(1000, DrivingCondition::Severe);

        let truck = RuleEvaluator::new(Arc::new(FixedClassifier(Some(VehicleClass::Truck))));
        assert!(truck.is_applicable(rule, &ctx));

        let sedan = RuleEvaluator::new(Arc::new(FixedClassifier(Some(VehicleClass::Sedan))));
        assert!(!sedan.is_applicable(rule, &ctx));
    }

    #[test]
    fn test_unknown_vehicle_matches_class_restrictions() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("DIFFERENTIAL_SERVICE_MILEAGE").unwrap();
        let ctx = context(1000, DrivingCondition::Severe);

        let unknown = RuleEvaluator::new(Arc::new(FixedClassifier(None)));
        assert!(unknown.is_applicable(rule, &ctx));
    }

    #[test]
    fn test_unrestricted_rule_applies_to_all() {
        let rule = oil_change_rule();
        let evaluator = evaluator();
        for condition in [
            DrivingCondition::Normal,
            DrivingCondition::Severe,
            DrivingCondition::Offroad,
            DrivingCondition::Commercial,
        ] {
            assert!(evaluator.is_applicable(&rule, &context(0, condition)));
        }
    }

    #[test]
    fn test_malformed_mileage_rule_is_an_error() {
        let mut rule = oil_change_rule();
        rule.mileage_interval = None;
        let ctx = context(55000, DrivingCondition::Normal);

        let err = evaluator().evaluate(&rule, &ctx, &[]).unwrap_err();
        assert!(matches!(
            err,
            RecommendationError::InvalidRuleDefinition(_)
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::recommendations::catalog::RuleCatalog;
    use crate::recommendations::classifier::MakeModelClassifier;
    use chrono::DateTime;

    use proptest::prelude::*;

    fn context(mileage: i32, condition: DrivingCondition) -> VehicleContext {
        VehicleContext {
            vehicle_id: 1,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: Some(2019),
            current_mileage: mileage,
            driving_condition: condition,
            service_interval: "standard".to_string(),
            engine_type: None,
            transmission: None,
            fuel_type: None,
        }
    }

    fn condition_strategy() -> impl Strategy<Value = DrivingCondition> {
        prop_oneof![
            Just(DrivingCondition::Normal),
            Just(DrivingCondition::Severe),
            Just(DrivingCondition::Offroad),
            Just(DrivingCondition::Commercial),
        ]
    }

    /// Property: triggered iff current mileage >= last + floor(interval * m)
    #[test]
    fn prop_mileage_trigger_invariant() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("OIL_CHANGE_MILEAGE").unwrap().clone();
        let evaluator = RuleEvaluator::new(Arc::new(MakeModelClassifier));

        proptest!(|(
            current in 0i32..200_000,
            last in 0i32..150_000,
            condition in condition_strategy()
        )| {
            let history = vec![ServiceHistoryEntry {
                id: 1,
                vehicle_id: 1,
                service_type: "oil_change".to_string(),
                service_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                service_mileage: last,
                provider: None,
                cost: None,
                created_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            }];

            let multiplier = match condition {
                DrivingCondition::Normal => 1.0,
                DrivingCondition::Severe => 0.8,
                DrivingCondition::Offroad => 0.7,
                DrivingCondition::Commercial => 0.9,
            };
            let expected_due = last + (5000f64 * multiplier).floor() as i32;

            let result = evaluator
                .evaluate(&rule, &context(current, condition), &history)
                .unwrap();

            prop_assert_eq!(result.due_mileage, Some(expected_due));
            prop_assert_eq!(result.triggered, current >= expected_due);
        });
    }

    /// Property: a time-based rule with no prior history always triggers
    #[test]
    fn prop_time_rule_without_history_always_triggers() {
        let catalog = RuleCatalog::standard().unwrap();
        let evaluator = RuleEvaluator::new(Arc::new(MakeModelClassifier));
        let time_rules: Vec<_> = catalog
            .rules()
            .iter()
            .filter(|r| r.rule_type == RuleType::TimeBased)
            .cloned()
            .collect();

        proptest!(|(
            mileage in 0i32..300_000,
            condition in condition_strategy()
        )| {
            for rule in &time_rules {
                let result = evaluator
                    .evaluate(rule, &context(mileage, condition), &[])
                    .unwrap();
                prop_assert!(result.triggered, "rule {} should be due", rule.code);
            }
        });
    }
}

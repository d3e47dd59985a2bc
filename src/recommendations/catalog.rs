// Static maintenance rule catalog
//
// The catalog is a plain declarative table loaded once at process start.
// Rule behavior is data, not polymorphism: a single evaluator dispatches on
// `rule_type`, so adding a rule means adding a row here, nothing else.

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::recommendations::classifier::VehicleClass;
use crate::recommendations::error::RecommendationError;
use crate::recommendations::types::{DrivingCondition, Priority, RuleType, Severity};

/// Declarative definition of a single maintenance trigger
///
/// `mileage_interval` is required for mileage-based rules; `time_interval_*`
/// for time-based rules. Empty applicability slices mean "applies to all".
/// `depends_on`/`conflicts_with` are informational and surfaced to callers
/// unchanged.
#[derive(Debug, Clone)]
pub struct ServiceRuleDefinition {
    pub code: &'static str,
    pub service_type: &'static str,
    pub service_name: &'static str,
    pub category: &'static str,
    pub rule_type: RuleType,
    pub mileage_interval: Option<i32>,
    pub time_interval_months: Option<i32>,
    pub time_interval_days: Option<i32>,
    pub priority: Priority,
    pub severity: Severity,
    pub applicable_vehicle_classes: &'static [VehicleClass],
    pub applicable_driving_conditions: &'static [DrivingCondition],
    /// Interval-shrink factor for severe driving, 0 < m <= 1
    pub severe_condition_multiplier: Option<f64>,
    /// Interval-shrink factor for offroad driving, 0 < m <= 1
    pub offroad_multiplier: Option<f64>,
    pub can_bundle: bool,
    pub depends_on: &'static [&'static str],
    pub conflicts_with: &'static [&'static str],
}

impl ServiceRuleDefinition {
    /// Total day count for a time-based rule (`months * 30 + days`)
    pub fn total_interval_days(&self) -> i32 {
        self.time_interval_months.unwrap_or(0) * 30 + self.time_interval_days.unwrap_or(0)
    }
}

/// Fixed per-service-type cost and duration estimates
///
/// Returns (estimated cost, estimated duration in minutes). Unrecognized
/// service types fall back to cost 50 / 45 minutes.
pub fn service_estimate(service_type: &str) -> (Decimal, i32) {
    match service_type {
        "oil_change" => (Decimal::from(45), 30),
        "tire_rotation" => (Decimal::from(20), 20),
        "brake_inspection" => (Decimal::from(30), 30),
        "brake_fluid_flush" => (Decimal::from(90), 45),
        "engine_air_filter" => (Decimal::from(25), 15),
        "cabin_air_filter" => (Decimal::from(20), 15),
        "coolant_flush" => (Decimal::from(110), 60),
        "transmission_service" => (Decimal::from(180), 90),
        "spark_plugs" => (Decimal::from(150), 75),
        "battery_check" => (Decimal::from(20), 15),
        "wiper_blades" => (Decimal::from(25), 10),
        "wheel_alignment" => (Decimal::from(90), 60),
        "differential_service" => (Decimal::from(120), 60),
        "timing_belt" => (Decimal::from(450), 240),
        _ => (Decimal::from(50), 45),
    }
}

/// Immutable, in-process registry of maintenance rules
#[derive(Debug)]
pub struct RuleCatalog {
    rules: Vec<ServiceRuleDefinition>,
}

impl RuleCatalog {
    /// Build the standard catalog, validating every definition
    ///
    /// Validation failures are fatal at load time; a malformed catalog entry
    /// must never reach per-request evaluation.
    pub fn standard() -> Result<Self, RecommendationError> {
        Self::from_rules(standard_rules())
    }

    /// Build a catalog from explicit rules (used by tests)
    pub fn from_rules(rules: Vec<ServiceRuleDefinition>) -> Result<Self, RecommendationError> {
        let mut codes = HashSet::new();
        for rule in &rules {
            validate_rule(rule)?;
            if !codes.insert(rule.code) {
                return Err(RecommendationError::InvalidRuleDefinition(format!(
                    "duplicate rule code '{}'",
                    rule.code
                )));
            }
        }
        Ok(Self { rules })
    }

    /// Rules in stable catalog order
    pub fn rules(&self) -> &[ServiceRuleDefinition] {
        &self.rules
    }

    /// Look up a rule by code
    pub fn find(&self, code: &str) -> Option<&ServiceRuleDefinition> {
        self.rules.iter().find(|r| r.code == code)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate_rule(rule: &ServiceRuleDefinition) -> Result<(), RecommendationError> {
    match rule.rule_type {
        RuleType::MileageBased => {
            if rule.mileage_interval.map_or(true, |m| m <= 0) {
                return Err(RecommendationError::InvalidRuleDefinition(format!(
                    "rule '{}' is mileage-based but has no positive mileage interval",
                    rule.code
                )));
            }
        }
        RuleType::TimeBased => {
            if rule.total_interval_days() <= 0 {
                return Err(RecommendationError::InvalidRuleDefinition(format!(
                    "rule '{}' is time-based but has no positive day count",
                    rule.code
                )));
            }
        }
    }

    for (name, multiplier) in [
        ("severe_condition_multiplier", rule.severe_condition_multiplier),
        ("offroad_multiplier", rule.offroad_multiplier),
    ] {
        if let Some(m) = multiplier {
            if !(m > 0.0 && m <= 1.0) {
                return Err(RecommendationError::InvalidRuleDefinition(format!(
                    "rule '{}' has {} = {} outside (0, 1]",
                    rule.code, name, m
                )));
            }
        }
    }

    Ok(())
}

/// The standard maintenance schedule
fn standard_rules() -> Vec<ServiceRuleDefinition> {
    vec![
        ServiceRuleDefinition {
            code: "OIL_CHANGE_MILEAGE",
            service_type: "oil_change",
            service_name: "Oil & Filter Change",
            category: "Maintenance",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(5000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::High,
            severity: Severity::Medium,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: Some(0.8),
            offroad_multiplier: Some(0.7),
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &["OIL_CHANGE_TIME"],
        },
        ServiceRuleDefinition {
            code: "OIL_CHANGE_TIME",
            service_type: "oil_change",
            service_name: "Oil & Filter Change (time)",
            category: "Maintenance",
            rule_type: RuleType::TimeBased,
            mileage_interval: None,
            time_interval_months: Some(6),
            time_interval_days: None,
            priority: Priority::Medium,
            severity: Severity::Medium,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &["OIL_CHANGE_MILEAGE"],
        },
        ServiceRuleDefinition {
            code: "TIRE_ROTATION_MILEAGE",
            service_type: "tire_rotation",
            service_name: "Tire Rotation",
            category: "Maintenance",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(7500),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Medium,
            severity: Severity::Low,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: Some(0.6),
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "BRAKE_INSPECTION_MILEAGE",
            service_type: "brake_inspection",
            service_name: "Brake Inspection",
            category: "Safety",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(12000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::High,
            severity: Severity::High,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: Some(0.75),
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "BRAKE_FLUID_TIME",
            service_type: "brake_fluid_flush",
            service_name: "Brake Fluid Flush",
            category: "Safety",
            rule_type: RuleType::TimeBased,
            mileage_interval: None,
            time_interval_months: Some(24),
            time_interval_days: None,
            priority: Priority::Medium,
            severity: Severity::High,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &["BRAKE_INSPECTION_MILEAGE"],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "ENGINE_AIR_FILTER_MILEAGE",
            service_type: "engine_air_filter",
            service_name: "Engine Air Filter Replacement",
            category: "Maintenance",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(15000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Low,
            severity: Severity::Low,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: Some(0.5),
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "CABIN_AIR_FILTER_TIME",
            service_type: "cabin_air_filter",
            service_name: "Cabin Air Filter Replacement",
            category: "Comfort",
            rule_type: RuleType::TimeBased,
            mileage_interval: None,
            time_interval_months: Some(12),
            time_interval_days: None,
            priority: Priority::Low,
            severity: Severity::Low,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "COOLANT_FLUSH_TIME",
            service_type: "coolant_flush",
            service_name: "Coolant System Flush",
            category: "Powertrain",
            rule_type: RuleType::TimeBased,
            mileage_interval: None,
            time_interval_months: Some(36),
            time_interval_days: None,
            priority: Priority::Medium,
            severity: Severity::High,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "TRANSMISSION_SERVICE_MILEAGE",
            service_type: "transmission_service",
            service_name: "Transmission Service",
            category: "Powertrain",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(50000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Medium,
            severity: Severity::High,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: Some(0.75),
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "SPARK_PLUGS_MILEAGE",
            service_type: "spark_plugs",
            service_name: "Spark Plug Replacement",
            category: "Powertrain",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(60000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Low,
            severity: Severity::Medium,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "BATTERY_CHECK_TIME",
            service_type: "battery_check",
            service_name: "Battery Health Check",
            category: "Electrical",
            rule_type: RuleType::TimeBased,
            mileage_interval: None,
            time_interval_months: Some(12),
            time_interval_days: None,
            priority: Priority::Low,
            severity: Severity::Low,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "WIPER_BLADES_TIME",
            service_type: "wiper_blades",
            service_name: "Wiper Blade Replacement",
            category: "Safety",
            rule_type: RuleType::TimeBased,
            mileage_interval: None,
            time_interval_months: Some(6),
            time_interval_days: Some(0),
            priority: Priority::Low,
            severity: Severity::Low,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "WHEEL_ALIGNMENT_MILEAGE",
            service_type: "wheel_alignment",
            service_name: "Wheel Alignment",
            category: "Maintenance",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(20000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Low,
            severity: Severity::Medium,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: Some(0.5),
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "DIFFERENTIAL_SERVICE_MILEAGE",
            service_type: "differential_service",
            service_name: "Differential Fluid Service",
            category: "Powertrain",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(30000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Medium,
            severity: Severity::Medium,
            applicable_vehicle_classes: &[VehicleClass::Truck, VehicleClass::Suv],
            applicable_driving_conditions: &[
                DrivingCondition::Severe,
                DrivingCondition::Offroad,
                DrivingCondition::Commercial,
            ],
            severe_condition_multiplier: Some(0.8),
            offroad_multiplier: Some(0.6),
            can_bundle: true,
            depends_on: &[],
            conflicts_with: &[],
        },
        ServiceRuleDefinition {
            code: "TIMING_BELT_MILEAGE",
            service_type: "timing_belt",
            service_name: "Timing Belt Replacement",
            category: "Powertrain",
            rule_type: RuleType::MileageBased,
            mileage_interval: Some(90000),
            time_interval_months: None,
            time_interval_days: None,
            priority: Priority::Critical,
            severity: Severity::Critical,
            applicable_vehicle_classes: &[],
            applicable_driving_conditions: &[],
            severe_condition_multiplier: None,
            offroad_multiplier: None,
            can_bundle: false,
            depends_on: &[],
            conflicts_with: &[],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = RuleCatalog::standard().expect("standard catalog must validate");
        assert!(!catalog.is_empty());
        assert!(catalog.len() >= 10);
    }

    #[test]
    fn test_catalog_codes_are_unique() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut codes = HashSet::new();
        for rule in catalog.rules() {
            assert!(codes.insert(rule.code), "duplicate code {}", rule.code);
        }
    }

    #[test]
    fn test_mileage_rules_have_positive_intervals() {
        let catalog = RuleCatalog::standard().unwrap();
        for rule in catalog.rules() {
            match rule.rule_type {
                RuleType::MileageBased => {
                    assert!(rule.mileage_interval.unwrap() > 0, "rule {}", rule.code)
                }
                RuleType::TimeBased => {
                    assert!(rule.total_interval_days() > 0, "rule {}", rule.code)
                }
            }
        }
    }

    #[test]
    fn test_find_by_code() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("OIL_CHANGE_MILEAGE").unwrap();
        assert_eq!(rule.mileage_interval, Some(5000));
        assert_eq!(rule.category, "Maintenance");
        assert!(catalog.find("NO_SUCH_RULE").is_none());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut rules = standard_rules();
        let first = rules[0].clone();
        rules.push(first);
        let err = RuleCatalog::from_rules(rules).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_mileage_rule_without_interval_rejected() {
        let mut rule = standard_rules()[0].clone();
        rule.mileage_interval = None;
        let err = RuleCatalog::from_rules(vec![rule]).unwrap_err();
        assert!(err.to_string().contains("mileage"));
    }

    #[test]
    fn test_time_rule_without_days_rejected() {
        let mut rule = standard_rules()
            .into_iter()
            .find(|r| r.rule_type == RuleType::TimeBased)
            .unwrap();
        rule.time_interval_months = Some(0);
        rule.time_interval_days = Some(0);
        assert!(RuleCatalog::from_rules(vec![rule]).is_err());
    }

    #[test]
    fn test_multiplier_out_of_range_rejected() {
        let mut rule = standard_rules()[0].clone();
        rule.severe_condition_multiplier = Some(1.5);
        assert!(RuleCatalog::from_rules(vec![rule.clone()]).is_err());
        rule.severe_condition_multiplier = Some(0.0);
        assert!(RuleCatalog::from_rules(vec![rule]).is_err());
    }

    #[test]
    fn test_service_estimate_known_types() {
        assert_eq!(service_estimate("oil_change"), (dec!(45), 30));
        assert_eq!(service_estimate("tire_rotation"), (dec!(20), 20));
        assert_eq!(service_estimate("timing_belt"), (dec!(450), 240));
    }

    #[test]
    fn test_service_estimate_fallback() {
        assert_eq!(service_estimate("muffler_bearing_swap"), (dec!(50), 45));
    }

    #[test]
    fn test_total_interval_days() {
        let rule = standard_rules()
            .into_iter()
            .find(|r| r.code == "OIL_CHANGE_TIME")
            .unwrap();
        assert_eq!(rule.total_interval_days(), 180);
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::Vehicle;
use crate::recommendations::catalog::ServiceRuleDefinition;
use crate::recommendations::types::{DrivingCondition, Priority, RecommendationStatus, Severity};

/// Snapshot of the vehicle state a rule evaluation runs against
///
/// Computed per evaluation from the vehicles table; never persisted by the
/// rule engine itself.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleContext {
    pub vehicle_id: i32,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub current_mileage: i32,
    pub driving_condition: DrivingCondition,
    pub service_interval: String,
    pub engine_type: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
}

impl From<&Vehicle> for VehicleContext {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            vehicle_id: vehicle.id,
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            year: vehicle.year,
            current_mileage: vehicle.current_mileage,
            driving_condition: vehicle.driving_condition,
            service_interval: vehicle.service_interval.clone(),
            engine_type: vehicle.engine_type.clone(),
            transmission: vehicle.transmission.clone(),
            fuel_type: vehicle.fuel_type.clone(),
        }
    }
}

/// Raw outcome of evaluating a single rule against a vehicle
///
/// Ephemeral; only triggered results survive the evaluation pass.
#[derive(Debug, Clone)]
pub struct RuleEvaluationResult {
    pub rule_code: String,
    pub triggered: bool,
    pub priority: Priority,
    pub severity: Severity,
    pub due_mileage: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub reason: String,
    pub last_service_date: Option<NaiveDate>,
    pub last_service_mileage: Option<i32>,
    pub estimated_cost: Decimal,
    pub estimated_duration_minutes: i32,
}

/// Catalog-enriched recommendation returned to callers and reconciled into
/// the store
///
/// `id` is the persisted record's id once reconciliation has run; synthetic
/// bundles carry no id. `bundled_services` is empty for plain
/// recommendations and lists constituent service names for bundles.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRecommendationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub rule_code: String,
    pub service_type: String,
    pub service_name: String,
    pub category: String,
    pub status: RecommendationStatus,
    pub priority: Priority,
    pub severity: Severity,
    pub due_mileage: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub reason: String,
    pub last_service_date: Option<NaiveDate>,
    pub last_service_mileage: Option<i32>,
    pub estimated_cost: Decimal,
    pub estimated_duration_minutes: i32,
    pub can_bundle: bool,
    pub depends_on: Vec<String>,
    pub conflicts_with: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bundled_services: Vec<String>,
}

impl ServiceRecommendationResult {
    /// Project an evaluation result into a recommendation using its rule's
    /// catalog metadata
    pub fn from_evaluation(rule: &ServiceRuleDefinition, eval: RuleEvaluationResult) -> Self {
        Self {
            id: None,
            rule_code: eval.rule_code,
            service_type: rule.service_type.to_string(),
            service_name: rule.service_name.to_string(),
            category: rule.category.to_string(),
            status: RecommendationStatus::Pending,
            priority: eval.priority,
            severity: eval.severity,
            due_mileage: eval.due_mileage,
            due_date: eval.due_date,
            reason: eval.reason,
            last_service_date: eval.last_service_date,
            last_service_mileage: eval.last_service_mileage,
            estimated_cost: eval.estimated_cost,
            estimated_duration_minutes: eval.estimated_duration_minutes,
            can_bundle: rule.can_bundle,
            depends_on: rule.depends_on.iter().map(|s| s.to_string()).collect(),
            conflicts_with: rule.conflicts_with.iter().map(|s| s.to_string()).collect(),
            bundled_services: Vec::new(),
        }
    }

    /// Project a persisted record into the caller-facing shape
    ///
    /// Catalog metadata (bundling flags, dependencies) is re-attached when
    /// the rule still exists; stale rule codes degrade to empty sets.
    pub fn from_persisted(record: &PersistedRecommendation, rule: Option<&ServiceRuleDefinition>) -> Self {
        Self {
            id: Some(record.id),
            rule_code: record.rule_code.clone(),
            service_type: record.service_type.clone(),
            service_name: record.service_name.clone(),
            category: record.category.clone(),
            status: record.status,
            priority: record.priority,
            severity: record.severity,
            due_mileage: record.due_mileage,
            due_date: record.due_date,
            reason: record.reason.clone(),
            last_service_date: None,
            last_service_mileage: None,
            estimated_cost: record.estimated_cost,
            estimated_duration_minutes: record.estimated_duration_minutes,
            can_bundle: rule.map(|r| r.can_bundle).unwrap_or(false),
            depends_on: rule
                .map(|r| r.depends_on.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
            conflicts_with: rule
                .map(|r| r.conflicts_with.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
            bundled_services: Vec::new(),
        }
    }
}

/// Durable per-vehicle recommendation record
///
/// At most one active (pending/scheduled) row exists per
/// `(vehicle_id, rule_code)`; a partial unique index backstops that
/// invariant at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersistedRecommendation {
    pub id: Uuid,
    pub vehicle_id: i32,
    pub rule_code: String,
    pub service_type: String,
    pub service_name: String,
    pub category: String,
    pub status: RecommendationStatus,
    pub priority: Priority,
    pub severity: Severity,
    pub due_mileage: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub reason: String,
    pub estimated_cost: Decimal,
    pub estimated_duration_minutes: i32,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub dismissed_reason: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for updating a single recommendation's status
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecommendationStatusRequest {
    pub status: RecommendationStatus,
    #[validate(length(min = 1, message = "Dismissal reason cannot be empty"))]
    pub dismissed_reason: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One item of a bulk status update, addressed by rule code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStatusUpdateItem {
    pub rule_code: String,
    pub status: RecommendationStatus,
    pub dismissed_reason: Option<String>,
}

/// Request DTO for bulk status updates scoped to one vehicle
#[derive(Debug, Deserialize, Validate)]
pub struct BulkStatusUpdateRequest {
    #[validate(length(min = 1, message = "Bulk update must contain at least one item"))]
    pub updates: Vec<BulkStatusUpdateItem>,
}

/// Outcome of a bulk status update
///
/// `skipped` counts items whose `(vehicle_id, rule_code)` pair had no active
/// record; that is a documented no-op, not an error.
#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub updated: usize,
    pub skipped: usize,
}

/// Response DTO for recommendation listings
#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<ServiceRecommendationResult>,
    pub total_count: usize,
    pub vehicle_context: VehicleContext,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::catalog::RuleCatalog;
    use rust_decimal_macros::dec;

    fn sample_evaluation(code: &str) -> RuleEvaluationResult {
        RuleEvaluationResult {
            rule_code: code.to_string(),
            triggered: true,
            priority: Priority::High,
            severity: Severity::Medium,
            due_mileage: Some(55000),
            due_date: None,
            reason: "due".to_string(),
            last_service_date: None,
            last_service_mileage: Some(50000),
            estimated_cost: dec!(45),
            estimated_duration_minutes: 30,
        }
    }

    #[test]
    fn test_from_evaluation_copies_catalog_metadata() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("OIL_CHANGE_MILEAGE").unwrap();
        let rec = ServiceRecommendationResult::from_evaluation(
            rule,
            sample_evaluation("OIL_CHANGE_MILEAGE"),
        );

        assert_eq!(rec.service_name, "Oil & Filter Change");
        assert_eq!(rec.category, "Maintenance");
        assert!(rec.can_bundle);
        assert_eq!(rec.conflicts_with, vec!["OIL_CHANGE_TIME".to_string()]);
        assert_eq!(rec.status, RecommendationStatus::Pending);
        assert!(rec.id.is_none());
        assert!(rec.bundled_services.is_empty());
    }

    #[test]
    fn test_serialization_skips_empty_optionals() {
        let catalog = RuleCatalog::standard().unwrap();
        let rule = catalog.find("OIL_CHANGE_MILEAGE").unwrap();
        let rec = ServiceRecommendationResult::from_evaluation(
            rule,
            sample_evaluation("OIL_CHANGE_MILEAGE"),
        );

        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("bundled_services"));
        assert!(json.contains("\"rule_code\":\"OIL_CHANGE_MILEAGE\""));
        assert!(json.contains("\"priority\":\"high\""));
    }

    #[test]
    fn test_bulk_request_validation() {
        let request = BulkStatusUpdateRequest { updates: vec![] };
        assert!(request.validate().is_err());

        let request = BulkStatusUpdateRequest {
            updates: vec![BulkStatusUpdateItem {
                rule_code: "OIL_CHANGE_MILEAGE".to_string(),
                status: RecommendationStatus::Dismissed,
                dismissed_reason: Some("customer declined".to_string()),
            }],
        };
        assert!(request.validate().is_ok());
    }
}

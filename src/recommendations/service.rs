use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::models::ServiceHistoryEntry;
use crate::recommendations::bundling::BundlingProcessor;
use crate::recommendations::catalog::{RuleCatalog, ServiceRuleDefinition};
use crate::recommendations::classifier::MakeModelClassifier;
use crate::recommendations::error::RecommendationError;
use crate::recommendations::evaluator::RuleEvaluator;
use crate::recommendations::models::{
    BulkStatusUpdateRequest, BulkUpdateResponse, PersistedRecommendation,
    RecommendationsResponse, ServiceRecommendationResult, UpdateRecommendationStatusRequest,
    VehicleContext,
};
use crate::recommendations::repository::{RecommendationsRepository, VehicleRepository};
use crate::recommendations::status_machine::StatusMachine;
use crate::recommendations::types::{RecommendationStatus, RuleEngineConfig};

/// Options for listing a vehicle's recommendations
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub include_completed: bool,
    pub include_dismissed: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Evaluate every applicable rule and keep the triggered results
///
/// Rules run sequentially in catalog order so downstream bundling sees a
/// deterministic sequence. A rule that fails to evaluate is logged and
/// skipped; one bad rule must never take down the whole pass.
pub fn evaluate_rules(
    rules: &[ServiceRuleDefinition],
    evaluator: &RuleEvaluator,
    context: &VehicleContext,
    history: &[ServiceHistoryEntry],
) -> Vec<ServiceRecommendationResult> {
    let mut triggered = Vec::new();

    for rule in rules {
        if !evaluator.is_applicable(rule, context) {
            continue;
        }

        match evaluator.evaluate(rule, context, history) {
            Ok(eval) if eval.triggered => {
                triggered.push(ServiceRecommendationResult::from_evaluation(rule, eval));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    rule_code = rule.code,
                    vehicle_id = context.vehicle_id,
                    "Skipping rule that failed to evaluate: {}",
                    err
                );
            }
        }
    }

    triggered
}

/// Orchestrates rule evaluation, reconciliation, bundling, and the
/// recommendation status lifecycle
#[derive(Clone)]
pub struct RecommendationService {
    catalog: Arc<RuleCatalog>,
    evaluator: Arc<RuleEvaluator>,
    config: RuleEngineConfig,
    vehicles: VehicleRepository,
    recommendations: RecommendationsRepository,
}

impl RecommendationService {
    /// Create a new RecommendationService over the standard catalog
    ///
    /// Catalog validation failures abort construction; the process should
    /// not start with a malformed schedule.
    pub fn new(pool: PgPool, config: RuleEngineConfig) -> Result<Self, RecommendationError> {
        let catalog = Arc::new(RuleCatalog::standard()?);
        let evaluator = Arc::new(RuleEvaluator::new(Arc::new(MakeModelClassifier)));
        Ok(Self {
            catalog,
            evaluator,
            config,
            vehicles: VehicleRepository::new(pool.clone()),
            recommendations: RecommendationsRepository::new(pool),
        })
    }

    /// Current recommendations for a vehicle
    ///
    /// Always recomputes from the catalog and reconciles into the store, so
    /// the caller sees evaluation state that matches the vehicle's current
    /// mileage. Terminal records are appended only when asked for.
    pub async fn get_recommendations(
        &self,
        vehicle_id: i32,
        options: ListOptions,
    ) -> Result<RecommendationsResponse, RecommendationError> {
        let vehicle = self
            .vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or(RecommendationError::VehicleNotFound(vehicle_id))?;
        let context = VehicleContext::from(&vehicle);
        let history = self.vehicles.find_history(vehicle_id).await?;

        let fresh = evaluate_rules(self.catalog.rules(), &self.evaluator, &context, &history);
        let reconciled = self.reconcile(vehicle_id, fresh).await?;

        let bundler = BundlingProcessor::new(&self.config);
        let mut results = bundler.bundle(reconciled);

        if options.include_completed || options.include_dismissed {
            let terminal = self
                .recommendations
                .find_terminal(vehicle_id, options.include_completed, options.include_dismissed)
                .await?;
            results.extend(
                terminal
                    .iter()
                    .map(|record| {
                        ServiceRecommendationResult::from_persisted(
                            record,
                            self.catalog.find(&record.rule_code),
                        )
                    }),
            );
        }

        let total_count = results.len();
        let offset = options.offset.unwrap_or(0);
        let paged: Vec<ServiceRecommendationResult> = results
            .into_iter()
            .skip(offset)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();

        let last_updated = self
            .recommendations
            .last_updated(vehicle_id)
            .await?
            .unwrap_or_else(Utc::now);

        tracing::info!(
            vehicle_id,
            total = total_count,
            returned = paged.len(),
            "Computed recommendations"
        );

        Ok(RecommendationsResponse {
            recommendations: paged,
            total_count,
            vehicle_context: context,
            last_updated,
        })
    }

    /// Force a recomputation, returning only active recommendations
    pub async fn refresh_recommendations(
        &self,
        vehicle_id: i32,
    ) -> Result<RecommendationsResponse, RecommendationError> {
        self.get_recommendations(vehicle_id, ListOptions::default())
            .await
    }

    /// Merge fresh evaluation results into the persisted store
    ///
    /// Per item: an existing active row keeps its identity and status and
    /// only its evaluation fields are refreshed; otherwise a new pending row
    /// is inserted. An insert that loses the race to a concurrent request is
    /// retried once as an update.
    async fn reconcile(
        &self,
        vehicle_id: i32,
        fresh: Vec<ServiceRecommendationResult>,
    ) -> Result<Vec<ServiceRecommendationResult>, RecommendationError> {
        let mut reconciled = Vec::with_capacity(fresh.len());

        for mut rec in fresh {
            let persisted = match self.recommendations.find_active(vehicle_id, &rec.rule_code).await? {
                Some(existing) => {
                    self.recommendations
                        .update_evaluation(existing.id, &rec)
                        .await?
                }
                None => match self.recommendations.insert(vehicle_id, &rec).await {
                    Ok(inserted) => {
                        tracing::debug!(
                            vehicle_id,
                            rule_code = %rec.rule_code,
                            "Inserted new pending recommendation"
                        );
                        inserted
                    }
                    Err(RecommendationError::ReconciliationConflict(_)) => {
                        // Lost the insert race; the winner's row is now active
                        let existing = self
                            .recommendations
                            .find_active(vehicle_id, &rec.rule_code)
                            .await?
                            .ok_or_else(|| {
                                RecommendationError::ReconciliationConflict(format!(
                                    "no active recommendation for vehicle {} rule {} after insert conflict",
                                    vehicle_id, rec.rule_code
                                ))
                            })?;
                        self.recommendations
                            .update_evaluation(existing.id, &rec)
                            .await?
                    }
                    Err(err) => return Err(err),
                },
            };

            rec.id = Some(persisted.id);
            rec.status = persisted.status;
            reconciled.push(rec);
        }

        Ok(reconciled)
    }

    /// Update the status of a single recommendation
    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateRecommendationStatusRequest,
    ) -> Result<PersistedRecommendation, RecommendationError> {
        request
            .validate()
            .map_err(|err| RecommendationError::ValidationError(err.to_string()))?;

        let record = self
            .recommendations
            .find_by_id(id)
            .await?
            .ok_or(RecommendationError::RecommendationNotFound(id))?;

        self.apply_status_change(
            &record,
            request.status,
            request.dismissed_reason,
            request.scheduled_at,
            request.completed_at,
        )
        .await
    }

    /// Apply status updates to several of a vehicle's recommendations
    ///
    /// Items addressing a `(vehicle, rule_code)` pair with no active row are
    /// skipped and counted; an invalid transition on an existing row still
    /// fails the request.
    pub async fn bulk_update_status(
        &self,
        vehicle_id: i32,
        request: BulkStatusUpdateRequest,
    ) -> Result<BulkUpdateResponse, RecommendationError> {
        request
            .validate()
            .map_err(|err| RecommendationError::ValidationError(err.to_string()))?;

        self.vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or(RecommendationError::VehicleNotFound(vehicle_id))?;

        let mut updated = 0;
        let mut skipped = 0;

        for item in request.updates {
            let Some(record) = self
                .recommendations
                .find_active(vehicle_id, &item.rule_code)
                .await?
            else {
                tracing::debug!(
                    vehicle_id,
                    rule_code = %item.rule_code,
                    "No active recommendation for bulk update item, skipping"
                );
                skipped += 1;
                continue;
            };

            self.apply_status_change(&record, item.status, item.dismissed_reason, None, None)
                .await?;
            updated += 1;
        }

        Ok(BulkUpdateResponse { updated, skipped })
    }

    async fn apply_status_change(
        &self,
        record: &PersistedRecommendation,
        new_status: RecommendationStatus,
        dismissed_reason: Option<String>,
        scheduled_at: Option<chrono::DateTime<Utc>>,
        completed_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<PersistedRecommendation, RecommendationError> {
        StatusMachine::transition(record.status, new_status)
            .map_err(RecommendationError::InvalidTransition)?;

        let now = Utc::now();
        let (dismissed_at, dismissed_reason) = match new_status {
            RecommendationStatus::Dismissed => {
                let reason = dismissed_reason
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| {
                        RecommendationError::ValidationError(
                            "A dismissal reason is required".to_string(),
                        )
                    })?;
                (Some(now), Some(reason))
            }
            _ => (None, None),
        };
        let scheduled_at = match new_status {
            RecommendationStatus::Scheduled => Some(scheduled_at.unwrap_or(now)),
            _ => None,
        };
        let completed_at = match new_status {
            RecommendationStatus::Completed => Some(completed_at.unwrap_or(now)),
            _ => None,
        };

        let updated = self
            .recommendations
            .update_status(
                record.id,
                new_status,
                dismissed_at,
                dismissed_reason,
                scheduled_at,
                completed_at,
            )
            .await?;

        tracing::info!(
            recommendation_id = %record.id,
            vehicle_id = record.vehicle_id,
            from = %record.status,
            to = %new_status,
            "Recommendation status updated"
        );

        Ok(updated)
    }
}

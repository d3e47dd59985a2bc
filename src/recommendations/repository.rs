use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ServiceHistoryEntry, Vehicle};
use crate::recommendations::error::RecommendationError;
use crate::recommendations::models::{PersistedRecommendation, ServiceRecommendationResult};
use crate::recommendations::types::RecommendationStatus;

/// Repository for vehicle reads needed by the rule engine
#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    /// Create a new VehicleRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a vehicle by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Vehicle>, RecommendationError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, vin, make, model, year, current_mileage, driving_condition,
                   service_interval, engine_type, transmission, fuel_type,
                   created_at, updated_at
            FROM vehicles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    /// All service history for a vehicle, most recent first
    pub async fn find_history(
        &self,
        vehicle_id: i32,
    ) -> Result<Vec<ServiceHistoryEntry>, RecommendationError> {
        let history = sqlx::query_as::<_, ServiceHistoryEntry>(
            r#"
            SELECT id, vehicle_id, service_type, service_date, service_mileage,
                   provider, cost, created_at
            FROM service_history
            WHERE vehicle_id = $1
            ORDER BY service_date DESC, service_mileage DESC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }
}

/// Repository for persisted recommendation operations
#[derive(Clone)]
pub struct RecommendationsRepository {
    pool: PgPool,
}

impl RecommendationsRepository {
    /// Create a new RecommendationsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a recommendation by ID
    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<PersistedRecommendation>, RecommendationError> {
        let record = sqlx::query_as::<_, PersistedRecommendation>(
            r#"
            SELECT id, vehicle_id, rule_code, service_type, service_name, category,
                   status, priority, severity, due_mileage, due_date, reason,
                   estimated_cost, estimated_duration_minutes,
                   dismissed_at, dismissed_reason, scheduled_at, completed_at,
                   created_at, updated_at
            FROM service_recommendations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Find the active (pending or scheduled) row for a vehicle/rule pair
    ///
    /// At most one such row can exist; a partial unique index enforces that.
    pub async fn find_active(
        &self,
        vehicle_id: i32,
        rule_code: &str,
    ) -> Result<Option<PersistedRecommendation>, RecommendationError> {
        let record = sqlx::query_as::<_, PersistedRecommendation>(
            r#"
            SELECT id, vehicle_id, rule_code, service_type, service_name, category,
                   status, priority, severity, due_mileage, due_date, reason,
                   estimated_cost, estimated_duration_minutes,
                   dismissed_at, dismissed_reason, scheduled_at, completed_at,
                   created_at, updated_at
            FROM service_recommendations
            WHERE vehicle_id = $1 AND rule_code = $2 AND status IN ('pending', 'scheduled')
            "#,
        )
        .bind(vehicle_id)
        .bind(rule_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Terminal (completed/dismissed) rows for a vehicle, newest first
    pub async fn find_terminal(
        &self,
        vehicle_id: i32,
        include_completed: bool,
        include_dismissed: bool,
    ) -> Result<Vec<PersistedRecommendation>, RecommendationError> {
        let statuses: Vec<&str> = [
            include_completed.then_some("completed"),
            include_dismissed.then_some("dismissed"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, PersistedRecommendation>(
            r#"
            SELECT id, vehicle_id, rule_code, service_type, service_name, category,
                   status, priority, severity, due_mileage, due_date, reason,
                   estimated_cost, estimated_duration_minutes,
                   dismissed_at, dismissed_reason, scheduled_at, completed_at,
                   created_at, updated_at
            FROM service_recommendations
            WHERE vehicle_id = $1 AND status = ANY($2)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(vehicle_id)
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Insert a fresh recommendation as a new pending row
    ///
    /// A unique violation on the active-row index maps to
    /// `ReconciliationConflict` so the caller can fall back to an update.
    pub async fn insert(
        &self,
        vehicle_id: i32,
        rec: &ServiceRecommendationResult,
    ) -> Result<PersistedRecommendation, RecommendationError> {
        let record = sqlx::query_as::<_, PersistedRecommendation>(
            r#"
            INSERT INTO service_recommendations
                (vehicle_id, rule_code, service_type, service_name, category,
                 status, priority, severity, due_mileage, due_date, reason,
                 estimated_cost, estimated_duration_minutes)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, vehicle_id, rule_code, service_type, service_name, category,
                      status, priority, severity, due_mileage, due_date, reason,
                      estimated_cost, estimated_duration_minutes,
                      dismissed_at, dismissed_reason, scheduled_at, completed_at,
                      created_at, updated_at
            "#,
        )
        .bind(vehicle_id)
        .bind(&rec.rule_code)
        .bind(&rec.service_type)
        .bind(&rec.service_name)
        .bind(&rec.category)
        .bind(rec.priority)
        .bind(rec.severity)
        .bind(rec.due_mileage)
        .bind(rec.due_date)
        .bind(&rec.reason)
        .bind(rec.estimated_cost)
        .bind(rec.estimated_duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                RecommendationError::ReconciliationConflict(format!(
                    "active recommendation already exists for vehicle {} rule {}",
                    vehicle_id, rec.rule_code
                ))
            } else {
                err.into()
            }
        })?;

        Ok(record)
    }

    /// Refresh the evaluation fields of an active row, leaving status alone
    pub async fn update_evaluation(
        &self,
        id: Uuid,
        rec: &ServiceRecommendationResult,
    ) -> Result<PersistedRecommendation, RecommendationError> {
        let record = sqlx::query_as::<_, PersistedRecommendation>(
            r#"
            UPDATE service_recommendations
            SET priority = $1, severity = $2, due_mileage = $3, due_date = $4,
                reason = $5, estimated_cost = $6, estimated_duration_minutes = $7,
                updated_at = NOW()
            WHERE id = $8
            RETURNING id, vehicle_id, rule_code, service_type, service_name, category,
                      status, priority, severity, due_mileage, due_date, reason,
                      estimated_cost, estimated_duration_minutes,
                      dismissed_at, dismissed_reason, scheduled_at, completed_at,
                      created_at, updated_at
            "#,
        )
        .bind(rec.priority)
        .bind(rec.severity)
        .bind(rec.due_mileage)
        .bind(rec.due_date)
        .bind(&rec.reason)
        .bind(rec.estimated_cost)
        .bind(rec.estimated_duration_minutes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RecommendationError::RecommendationNotFound(id))?;

        Ok(record)
    }

    /// Move a recommendation to a new status and stamp lifecycle fields
    ///
    /// Transition legality is the service's responsibility; this only writes.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: RecommendationStatus,
        dismissed_at: Option<DateTime<Utc>>,
        dismissed_reason: Option<String>,
        scheduled_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<PersistedRecommendation, RecommendationError> {
        let record = sqlx::query_as::<_, PersistedRecommendation>(
            r#"
            UPDATE service_recommendations
            SET status = $1,
                dismissed_at = COALESCE($2, dismissed_at),
                dismissed_reason = COALESCE($3, dismissed_reason),
                scheduled_at = COALESCE($4, scheduled_at),
                completed_at = COALESCE($5, completed_at),
                updated_at = NOW()
            WHERE id = $6
            RETURNING id, vehicle_id, rule_code, service_type, service_name, category,
                      status, priority, severity, due_mileage, due_date, reason,
                      estimated_cost, estimated_duration_minutes,
                      dismissed_at, dismissed_reason, scheduled_at, completed_at,
                      created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(dismissed_at)
        .bind(dismissed_reason)
        .bind(scheduled_at)
        .bind(completed_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RecommendationError::RecommendationNotFound(id))?;

        Ok(record)
    }

    /// Newest `updated_at` across a vehicle's recommendations, if any
    pub async fn last_updated(
        &self,
        vehicle_id: i32,
    ) -> Result<Option<DateTime<Utc>>, RecommendationError> {
        let ts: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            "SELECT MAX(updated_at) FROM service_recommendations WHERE vehicle_id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ts.flatten())
    }
}

/// True for Postgres unique-constraint violations (SQLSTATE 23505)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    // Repository methods run raw SQL against Postgres; they are exercised by
    // the ignored end-to-end tests in src/tests.rs against a live database.
}

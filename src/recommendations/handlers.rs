// HTTP handlers for recommendation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::recommendations::{
    BulkStatusUpdateRequest, BulkUpdateResponse, ListOptions, PersistedRecommendation,
    RecommendationError, RecommendationsResponse, UpdateRecommendationStatusRequest,
};

/// Query parameters for the recommendation listing
#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    /// Include completed recommendations in the listing
    #[serde(default)]
    pub include_completed: bool,
    /// Include dismissed recommendations in the listing
    #[serde(default)]
    pub include_dismissed: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<RecommendationsQuery> for ListOptions {
    fn from(query: RecommendationsQuery) -> Self {
        Self {
            include_completed: query.include_completed,
            include_dismissed: query.include_dismissed,
            limit: query.limit,
            offset: query.offset,
        }
    }
}

/// Handler for GET /api/vehicles/{vehicle_id}/recommendations
/// Evaluates the catalog against the vehicle and returns its recommendations
pub async fn get_recommendations_handler(
    State(state): State<crate::AppState>,
    Path(vehicle_id): Path<i32>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>, RecommendationError> {
    let response = state
        .recommendation_service
        .get_recommendations(vehicle_id, query.into())
        .await?;

    Ok(Json(response))
}

/// Handler for POST /api/vehicles/{vehicle_id}/recommendations/refresh
/// Forces a recomputation and returns the active recommendations
pub async fn refresh_recommendations_handler(
    State(state): State<crate::AppState>,
    Path(vehicle_id): Path<i32>,
) -> Result<Json<RecommendationsResponse>, RecommendationError> {
    let response = state
        .recommendation_service
        .refresh_recommendations(vehicle_id)
        .await?;

    Ok(Json(response))
}

/// Handler for PATCH /api/recommendations/{id}/status
/// Moves a single recommendation through its lifecycle
pub async fn update_status_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecommendationStatusRequest>,
) -> Result<Json<PersistedRecommendation>, RecommendationError> {
    let record = state
        .recommendation_service
        .update_status(id, request)
        .await?;

    Ok(Json(record))
}

/// Handler for PATCH /api/vehicles/{vehicle_id}/recommendations/status
/// Applies status updates to several recommendations of one vehicle
pub async fn bulk_update_status_handler(
    State(state): State<crate::AppState>,
    Path(vehicle_id): Path<i32>,
    Json(request): Json<BulkStatusUpdateRequest>,
) -> Result<Json<BulkUpdateResponse>, RecommendationError> {
    let response = state
        .recommendation_service
        .bulk_update_status(vehicle_id, request)
        .await?;

    Ok(Json(response))
}

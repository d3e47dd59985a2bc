mod db;
mod error;
mod models;
mod recommendations;
mod validation;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ApiError;
use models::{CreateVehicle, RecordServiceRequest, ServiceHistoryEntry, UpdateVehicle, Vehicle};
use recommendations::handlers::{
    bulk_update_status_handler, get_recommendations_handler, refresh_recommendations_handler,
    update_status_handler,
};
use recommendations::{RecommendationError, RecommendationService, RuleEngineConfig};
use validator::Validate;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        create_vehicle,
        get_all_vehicles,
        get_vehicle_by_id,
        update_vehicle,
        record_service,
        get_service_history,
    ),
    components(
        schemas(Vehicle, CreateVehicle, UpdateVehicle, ServiceHistoryEntry, RecordServiceRequest, recommendations::DrivingCondition)
    ),
    tags(
        (name = "vehicles", description = "Vehicle registry endpoints"),
        (name = "service-history", description = "Service history record keeping")
    ),
    info(
        title = "AutoCare Maintenance API",
        version = "1.0.0",
        description = "RESTful API for vehicle registry and maintenance recommendations",
        contact(
            name = "API Support",
            email = "support@autocareapi.com"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub recommendation_service: RecommendationService,
}

/// Handler for GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up")
    ),
    tag = "vehicles"
)]
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Handler for POST /api/vehicles
/// Registers a new vehicle
#[utoipa::path(
    post,
    path = "/api/vehicles",
    request_body = CreateVehicle,
    responses(
        (status = 201, description = "Vehicle registered successfully", body = Vehicle),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Mileage cannot be negative"})),
        (status = 409, description = "VIN already registered", body = String, example = json!({"error": "Vehicle with VIN already exists"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "vehicles"
)]
async fn create_vehicle(
    State(state): State<AppState>,
    Json(payload): Json<CreateVehicle>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    tracing::debug!("Registering new vehicle with VIN: {}", payload.vin);

    payload.validate()?;

    if db::check_duplicate_vin(&state.db, &payload.vin).await? {
        tracing::warn!("Attempt to register duplicate VIN: {}", payload.vin);
        return Err(ApiError::Conflict {
            message: format!("Vehicle with VIN '{}' already exists", payload.vin),
        });
    }

    let vehicle = sqlx::query_as::<_, Vehicle>(
        r#"
        INSERT INTO vehicles (vin, make, model, year, current_mileage, driving_condition,
                              service_interval, engine_type, transmission, fuel_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, vin, make, model, year, current_mileage, driving_condition,
                  service_interval, engine_type, transmission, fuel_type,
                  created_at, updated_at
        "#,
    )
    .bind(&payload.vin)
    .bind(&payload.make)
    .bind(&payload.model)
    .bind(payload.year)
    .bind(payload.current_mileage)
    .bind(payload.driving_condition.unwrap_or_default())
    .bind(
        payload
            .service_interval
            .unwrap_or_else(|| "standard".to_string()),
    )
    .bind(&payload.engine_type)
    .bind(&payload.transmission)
    .bind(&payload.fuel_type)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully registered vehicle with id: {}", vehicle.id);
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Handler for GET /api/vehicles
/// Retrieves all registered vehicles
#[utoipa::path(
    get,
    path = "/api/vehicles",
    responses(
        (status = 200, description = "List of all vehicles", body = Vec<Vehicle>),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "vehicles"
)]
async fn get_all_vehicles(State(state): State<AppState>) -> Result<Json<Vec<Vehicle>>, ApiError> {
    tracing::debug!("Fetching all vehicles");

    let vehicles = sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, vin, make, model, year, current_mileage, driving_condition,
               service_interval, engine_type, transmission, fuel_type,
               created_at, updated_at
        FROM vehicles
        ORDER BY id
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    tracing::debug!("Retrieved {} vehicles", vehicles.len());
    Ok(Json(vehicles))
}

/// Handler for GET /api/vehicles/:id
/// Retrieves a specific vehicle by ID
#[utoipa::path(
    get,
    path = "/api/vehicles/{id}",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 200, description = "Vehicle found", body = Vehicle),
        (status = 404, description = "Vehicle not found", body = String, example = json!({"error": "Vehicle with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "vehicles"
)]
async fn get_vehicle_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vehicle>, ApiError> {
    tracing::debug!("Fetching vehicle with id: {}", id);

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
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        tracing::debug!("Vehicle with id {} not found", id);
        ApiError::NotFound {
            resource: "Vehicle".to_string(),
            id: id.to_string(),
        }
    })?;

    tracing::debug!("Successfully retrieved vehicle: {} {}", vehicle.make, vehicle.model);
    Ok(Json(vehicle))
}

/// Handler for PUT /api/vehicles/:id
/// Updates mutable fields of an existing vehicle
#[utoipa::path(
    put,
    path = "/api/vehicles/{id}",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    request_body = UpdateVehicle,
    responses(
        (status = 200, description = "Vehicle updated successfully", body = Vehicle),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Mileage cannot be negative"})),
        (status = 404, description = "Vehicle not found", body = String, example = json!({"error": "Vehicle with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "vehicles"
)]
async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateVehicle>,
) -> Result<Json<Vehicle>, ApiError> {
    tracing::debug!("Updating vehicle with id: {}", id);

    payload.validate()?;

    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, vin, make, model, year, current_mileage, driving_condition,
               service_interval, engine_type, transmission, fuel_type,
               created_at, updated_at
        FROM vehicles
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        tracing::debug!("Vehicle with id {} not found for update", id);
        ApiError::NotFound {
            resource: "Vehicle".to_string(),
            id: id.to_string(),
        }
    })?;

    // Update with provided fields, keeping existing values for omitted fields
    let updated_vehicle = sqlx::query_as::<_, Vehicle>(
        r#"
        UPDATE vehicles
        SET current_mileage = $1,
            driving_condition = $2,
            service_interval = $3,
            engine_type = $4,
            transmission = $5,
            fuel_type = $6,
            updated_at = NOW()
        WHERE id = $7
        RETURNING id, vin, make, model, year, current_mileage, driving_condition,
                  service_interval, engine_type, transmission, fuel_type,
                  created_at, updated_at
        "#,
    )
    .bind(payload.current_mileage.unwrap_or(existing.current_mileage))
    .bind(payload.driving_condition.unwrap_or(existing.driving_condition))
    .bind(payload.service_interval.unwrap_or(existing.service_interval))
    .bind(payload.engine_type.or(existing.engine_type))
    .bind(payload.transmission.or(existing.transmission))
    .bind(payload.fuel_type.or(existing.fuel_type))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated vehicle with id: {}", id);
    Ok(Json(updated_vehicle))
}

/// Handler for POST /api/vehicles/:id/service-history
/// Records a completed service against a vehicle
#[utoipa::path(
    post,
    path = "/api/vehicles/{id}/service-history",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    request_body = RecordServiceRequest,
    responses(
        (status = 201, description = "Service recorded successfully", body = ServiceHistoryEntry),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Mileage cannot be negative"})),
        (status = 404, description = "Vehicle not found", body = String, example = json!({"error": "Vehicle with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "service-history"
)]
async fn record_service(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RecordServiceRequest>,
) -> Result<(StatusCode, Json<ServiceHistoryEntry>), ApiError> {
    tracing::debug!("Recording {} service for vehicle {}", payload.service_type, id);

    payload.validate()?;

    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1)")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    if !exists.unwrap_or(false) {
        return Err(ApiError::NotFound {
            resource: "Vehicle".to_string(),
            id: id.to_string(),
        });
    }

    let entry = sqlx::query_as::<_, ServiceHistoryEntry>(
        r#"
        INSERT INTO service_history (vehicle_id, service_type, service_date, service_mileage, provider, cost)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, vehicle_id, service_type, service_date, service_mileage, provider, cost, created_at
        "#,
    )
    .bind(id)
    .bind(&payload.service_type)
    .bind(payload.service_date)
    .bind(payload.service_mileage)
    .bind(&payload.provider)
    .bind(payload.cost)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        "Recorded {} service for vehicle {} at {} miles",
        entry.service_type,
        id,
        entry.service_mileage
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Handler for GET /api/vehicles/:id/service-history
/// Retrieves a vehicle's service history, most recent first
#[utoipa::path(
    get,
    path = "/api/vehicles/{id}/service-history",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 200, description = "Service history for the vehicle", body = Vec<ServiceHistoryEntry>),
        (status = 404, description = "Vehicle not found", body = String, example = json!({"error": "Vehicle with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "service-history"
)]
async fn get_service_history(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ServiceHistoryEntry>>, ApiError> {
    tracing::debug!("Fetching service history for vehicle {}", id);

    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1)")
            .bind(id)
            .fetch_one(&state.db)
            .await?;
    if !exists.unwrap_or(false) {
        return Err(ApiError::NotFound {
            resource: "Vehicle".to_string(),
            id: id.to_string(),
        });
    }

    let history = sqlx::query_as::<_, ServiceHistoryEntry>(
        r#"
        SELECT id, vehicle_id, service_type, service_date, service_mileage, provider, cost, created_at
        FROM service_history
        WHERE vehicle_id = $1
        ORDER BY service_date DESC, service_mileage DESC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    tracing::debug!("Retrieved {} history entries for vehicle {}", history.len(), id);
    Ok(Json(history))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
pub fn create_router(
    db: PgPool,
    config: RuleEngineConfig,
) -> Result<Router, RecommendationError> {
    use tower_http::cors::{Any, CorsLayer};

    let recommendation_service = RecommendationService::new(db.clone(), config)?;
    let state = AppState {
        db,
        recommendation_service,
    };

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Vehicle registry
        .route("/api/health", get(health_check))
        .route("/api/vehicles", post(create_vehicle))
        .route("/api/vehicles", get(get_all_vehicles))
        .route("/api/vehicles/:id", get(get_vehicle_by_id))
        .route("/api/vehicles/:id", put(update_vehicle))
        // Service history
        .route("/api/vehicles/:id/service-history", post(record_service))
        .route("/api/vehicles/:id/service-history", get(get_service_history))
        // Maintenance recommendations
        .route(
            "/api/vehicles/:id/recommendations",
            get(get_recommendations_handler),
        )
        .route(
            "/api/vehicles/:id/recommendations/refresh",
            post(refresh_recommendations_handler),
        )
        .route(
            "/api/vehicles/:id/recommendations/status",
            patch(bulk_update_status_handler),
        )
        .route(
            "/api/recommendations/:id/status",
            patch(update_status_handler),
        )
        .layer(cors)
        .with_state(state))
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    // This enables the error!, warn!, info!, debug!, and trace! macros
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("AutoCare API - Starting...");

    // Get configuration from environment variables
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let engine_config = RuleEngineConfig::from_env();

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Create the application router
    let app = create_router(db_pool, engine_config).expect("Failed to build rule catalog");

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("AutoCare API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::recommendations::types::DrivingCondition;
use crate::validation::{validate_service_interval, validate_vin};

/// Represents a vehicle in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vehicle {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "1HGCM82633A004352")]
    pub vin: String,
    #[schema(example = "Toyota")]
    pub make: String,
    #[schema(example = "Camry")]
    pub model: String,
    #[schema(example = 2019)]
    pub year: Option<i32>,
    /// Odometer reading in miles
    #[schema(example = 54000, minimum = 0)]
    pub current_mileage: i32,
    #[schema(example = "normal")]
    pub driving_condition: DrivingCondition,
    /// Service interval profile tag ("standard", "extended", ...)
    #[schema(example = "standard")]
    pub service_interval: String,
    #[schema(example = "2.5L I4")]
    pub engine_type: Option<String>,
    #[schema(example = "automatic")]
    pub transmission: Option<String>,
    #[schema(example = "gasoline")]
    pub fuel_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the data needed to register a new vehicle
///
/// Used for POST /api/vehicles requests. Omitted optional fields fall back
/// to database defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVehicle {
    #[schema(example = "1HGCM82633A004352")]
    #[validate(custom = "validate_vin")]
    pub vin: String,
    #[schema(example = "Toyota")]
    #[validate(length(min = 1, message = "Make cannot be empty"))]
    pub make: String,
    #[schema(example = "Camry")]
    #[validate(length(min = 1, message = "Model cannot be empty"))]
    pub model: String,
    #[schema(example = 2019)]
    #[validate(range(min = 1886, max = 2035, message = "Model year is out of range"))]
    pub year: Option<i32>,
    /// Odometer reading in miles
    #[schema(example = 54000, minimum = 0)]
    #[validate(range(min = 0, message = "Mileage cannot be negative"))]
    pub current_mileage: i32,
    #[schema(example = "normal")]
    pub driving_condition: Option<DrivingCondition>,
    #[schema(example = "standard")]
    #[validate(custom = "validate_service_interval")]
    pub service_interval: Option<String>,
    #[schema(example = "2.5L I4")]
    pub engine_type: Option<String>,
    #[schema(example = "automatic")]
    pub transmission: Option<String>,
    #[schema(example = "gasoline")]
    pub fuel_type: Option<String>,
}

/// Represents the data for updating an existing vehicle
///
/// Used for PUT /api/vehicles/{id} requests. All fields are optional to
/// support partial updates; identity fields (vin, make, model) are fixed at
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateVehicle {
    /// Odometer reading in miles
    #[schema(example = 56000, minimum = 0)]
    #[validate(range(min = 0, message = "Mileage cannot be negative"))]
    pub current_mileage: Option<i32>,
    #[schema(example = "severe")]
    pub driving_condition: Option<DrivingCondition>,
    #[schema(example = "extended")]
    #[validate(custom = "validate_service_interval")]
    pub service_interval: Option<String>,
    #[schema(example = "2.5L I4")]
    pub engine_type: Option<String>,
    #[schema(example = "automatic")]
    pub transmission: Option<String>,
    #[schema(example = "gasoline")]
    pub fuel_type: Option<String>,
}

/// One completed service recorded against a vehicle
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ServiceHistoryEntry {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 1)]
    pub vehicle_id: i32,
    #[schema(example = "oil_change")]
    pub service_type: String,
    pub service_date: NaiveDate,
    /// Odometer reading when the service was performed
    #[schema(example = 50000, minimum = 0)]
    pub service_mileage: i32,
    #[schema(example = "Main St Auto")]
    pub provider: Option<String>,
    #[schema(value_type = Option<f64>, example = 45.0)]
    pub cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Request body for recording a completed service
///
/// Used for POST /api/vehicles/{id}/service-history requests
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordServiceRequest {
    #[schema(example = "oil_change")]
    #[validate(length(min = 1, message = "Service type cannot be empty"))]
    pub service_type: String,
    pub service_date: NaiveDate,
    /// Odometer reading when the service was performed
    #[schema(example = 50000, minimum = 0)]
    #[validate(range(min = 0, message = "Mileage cannot be negative"))]
    pub service_mileage: i32,
    #[schema(example = "Main St Auto")]
    pub provider: Option<String>,
    #[schema(value_type = Option<f64>, example = 45.0)]
    pub cost: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test Vehicle serialization to JSON
    #[test]
    fn test_vehicle_serialization() {
        let vehicle = Vehicle {
            id: 1,
            vin: "1HGCM82633A004352".to_string(),
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: Some(2019),
            current_mileage: 54000,
            driving_condition: DrivingCondition::Severe,
            service_interval: "standard".to_string(),
            engine_type: Some("2.5L I4".to_string()),
            transmission: Some("automatic".to_string()),
            fuel_type: Some("gasoline".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&vehicle).expect("Failed to serialize Vehicle");
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"vin\":\"1HGCM82633A004352\""));
        assert!(json.contains("\"make\":\"Toyota\""));
        assert!(json.contains("\"driving_condition\":\"severe\""));
        assert!(json.contains("\"current_mileage\":54000"));
    }

    /// Test CreateVehicle deserialization from JSON
    #[test]
    fn test_create_vehicle_deserialization() {
        let json = r#"{
            "vin": "1HGCM82633A004352",
            "make": "Ford",
            "model": "F-150",
            "year": 2021,
            "current_mileage": 12000,
            "driving_condition": "offroad"
        }"#;

        let create: CreateVehicle =
            serde_json::from_str(json).expect("Failed to deserialize CreateVehicle");

        assert_eq!(create.make, "Ford");
        assert_eq!(create.model, "F-150");
        assert_eq!(create.year, Some(2021));
        assert_eq!(create.current_mileage, 12000);
        assert_eq!(create.driving_condition, Some(DrivingCondition::Offroad));
        assert_eq!(create.service_interval, None);
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_create_vehicle_validation_rejects_bad_input() {
        let vehicle = CreateVehicle {
            vin: "SHORT".to_string(),
            make: "".to_string(),
            model: "Camry".to_string(),
            year: Some(1850),
            current_mileage: -5,
            driving_condition: None,
            service_interval: None,
            engine_type: None,
            transmission: None,
            fuel_type: None,
        };

        let errors = vehicle.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("vin"));
        assert!(errors.field_errors().contains_key("make"));
        assert!(errors.field_errors().contains_key("year"));
        assert!(errors.field_errors().contains_key("current_mileage"));
    }

    /// Test UpdateVehicle with partial fields
    #[test]
    fn test_update_vehicle_partial_fields() {
        let json = r#"{
            "current_mileage": 56000,
            "driving_condition": "severe"
        }"#;

        let update: UpdateVehicle =
            serde_json::from_str(json).expect("Failed to deserialize UpdateVehicle");

        assert_eq!(update.current_mileage, Some(56000));
        assert_eq!(update.driving_condition, Some(DrivingCondition::Severe));
        assert_eq!(update.service_interval, None);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_record_service_request_validation() {
        let request = RecordServiceRequest {
            service_type: "oil_change".to_string(),
            service_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            service_mileage: 50000,
            provider: None,
            cost: None,
        };
        assert!(request.validate().is_ok());

        let request = RecordServiceRequest {
            service_type: "".to_string(),
            service_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            service_mileage: -1,
            provider: None,
            cost: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("service_type"));
        assert!(errors.field_errors().contains_key("service_mileage"));
    }
}

// Domain type definitions for the Maintenance Recommendation System
// Provides shared enums and engine configuration used across the rule engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a maintenance rule decides that a service is due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Triggered when the vehicle has driven far enough since the last service
    MileageBased,

    /// Triggered when enough time has passed since the last service
    TimeBased,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::MileageBased => write!(f, "mileage_based"),
            RuleType::TimeBased => write!(f, "time_based"),
        }
    }
}

/// Urgency of a recommendation from the customer's point of view
///
/// Priorities are ordered LOW < MEDIUM < HIGH < CRITICAL; the ordinal
/// distance between two priorities drives bundling compatibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Position in the LOW < MEDIUM < HIGH < CRITICAL ordering
    pub fn ordinal(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }

    /// True when two priorities differ by at most one ordinal step
    pub fn within_one_step(&self, other: Priority) -> bool {
        self.ordinal().abs_diff(other.ordinal()) <= 1
    }

    /// Convert priority to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consequence of skipping the service (informational, surfaced to callers)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Convert severity to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorical modifier describing how the vehicle is driven
///
/// Harsher conditions shrink service intervals through per-rule multipliers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DrivingCondition {
    Normal,
    Severe,
    Offroad,
    Commercial,
}

impl DrivingCondition {
    /// Convert driving condition to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DrivingCondition::Normal => "normal",
            DrivingCondition::Severe => "severe",
            DrivingCondition::Offroad => "offroad",
            DrivingCondition::Commercial => "commercial",
        }
    }

    /// Parse driving condition from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(DrivingCondition::Normal),
            "severe" => Ok(DrivingCondition::Severe),
            "offroad" => Ok(DrivingCondition::Offroad),
            "commercial" => Ok(DrivingCondition::Commercial),
            _ => Err(format!("Invalid driving condition: {}", s)),
        }
    }
}

impl Default for DrivingCondition {
    fn default() -> Self {
        DrivingCondition::Normal
    }
}

impl fmt::Display for DrivingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recommendation status enum representing the lifecycle of a persisted
/// recommendation
///
/// `Completed` and `Dismissed` are terminal; the transition table lives in
/// [`crate::recommendations::StatusMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Scheduled,
    Completed,
    Dismissed,
}

impl RecommendationStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Scheduled => "scheduled",
            RecommendationStatus::Completed => "completed",
            RecommendationStatus::Dismissed => "dismissed",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RecommendationStatus::Pending),
            "scheduled" => Ok(RecommendationStatus::Scheduled),
            "completed" => Ok(RecommendationStatus::Completed),
            "dismissed" => Ok(RecommendationStatus::Dismissed),
            _ => Err(format!("Invalid recommendation status: {}", s)),
        }
    }

    /// True for statuses with no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecommendationStatus::Completed | RecommendationStatus::Dismissed
        )
    }
}

impl Default for RecommendationStatus {
    fn default() -> Self {
        RecommendationStatus::Pending
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine configuration passed explicitly into evaluator/bundler calls
///
/// Kept as a plain value (no module-level state) so tests can vary
/// behavior per call.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngineConfig {
    /// When false, triggered recommendations are returned unbundled
    pub enable_bundling: bool,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            enable_bundling: true,
        }
    }
}

impl RuleEngineConfig {
    /// Read configuration from environment variables, falling back to defaults
    ///
    /// `RULE_ENGINE_BUNDLING=false` disables bundling.
    pub fn from_env() -> Self {
        let enable_bundling = std::env::var("RULE_ENGINE_BUNDLING")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self { enable_bundling }
    }
}

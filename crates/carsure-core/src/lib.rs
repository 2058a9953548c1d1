//! Shared configuration, data model, and dashboard aggregation for carsure.

pub mod app_config;
pub mod config;
pub mod dashboard;
pub mod money;
pub mod types;

use thiserror::Error;

pub use app_config::{AiProvider, AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use dashboard::{process_dashboard_data, DashboardData, MonthlyTrend, RecentAnalysis, UsersData};
pub use types::{
    AnalysisMode, AnalysisRecord, ClaimRecommendation, CostAmount, CostBreakdown, DamageRegion,
    EnhancedRepairCost, InsuranceRecommendation, MarketSegment, RegionSource, RegionalCosts,
    SafetyAssessment, SafetyStatus, ServiceTypeCosts, Severity, StructuredDamageResult,
    UserProfile, Vehicle, VehicleIdentification,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

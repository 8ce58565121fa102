// Library interface for runcoach modules
// This allows integration tests and benches to access the core functionality

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod insights;
pub mod logging;
pub mod models;
pub mod pmc;
pub mod store;
pub mod tss;

// Re-export commonly used types for convenience
pub use models::*;
pub use tss::{TssBreakdown, TssCalculator};
pub use pmc::{
    calculate_atl, calculate_ctl, calculate_tsb, DailyLoad, FitnessState, FormStatus, PmcCalculator,
    PmcConfig,
};
pub use insights::{generate_insights, Insight, InsightAnalyzer, InsightConfig, InsightContext};
pub use context::{ContextBuilder, TrainingContext};
pub use config::AppConfig;
pub use database::Database;
pub use store::TrainingStore;
pub use error::{CoachError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};

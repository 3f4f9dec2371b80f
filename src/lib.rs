//! Per-user stamina engine
//!
//! Feed heart rate and activity telemetry into a [`User`] and read back
//! calorie totals, aerobic/anaerobic stamina, lactate, HRR zones and pace
//! predictions. [`UserRegistry`] keeps several users behind opaque handles.

pub mod activity;
pub mod coefficients;
pub mod config;
pub mod energy;
pub mod energy_system;
pub mod error;
pub mod heart_rate;
pub mod logging;
pub mod models;
pub mod prediction;
pub mod profile;
pub mod questionnaire;
pub mod registry;
pub mod replay;
pub mod timeline;
pub mod user;
pub mod vdot;
pub mod zones;

// Re-export commonly used types for convenience
pub use coefficients::PhysiologyCoefficients;
pub use config::EngineConfig;
pub use energy_system::ExertionRegime;
pub use error::{status_of, Result, StaminaError, Stream, STATUS_OK};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use prediction::PacePrediction;
pub use profile::{BodyComposition, UserProfile, UserProfileParams};
pub use questionnaire::QuestionnaireAnswers;
pub use registry::{UserHandle, UserRegistry};
pub use replay::{ReplaySummary, SessionReplay};
pub use user::{MetricsSnapshot, User};
pub use zones::{HrrZone, HrrZoneCalculator};

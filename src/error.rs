//! Unified error hierarchy for the stamina engine
//!
//! Every fallible operation returns [`StaminaError`]. Ingestion failures are
//! never fatal: they describe a rejected no-op update and map onto the integer
//! status codes expected by host bindings.

use thiserror::Error;

/// Sample stream an ordering violation was detected on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    HeartRate,
    Activity,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::HeartRate => write!(f, "heart-rate"),
            Stream::Activity => write!(f, "activity"),
        }
    }
}

/// Top-level error type for all engine operations
#[derive(Debug, Error)]
pub enum StaminaError {
    /// Sample timestamp is not newer than the last accepted one
    #[error("Out-of-order {stream} sample: t={time}s is not after last accepted t={last}s")]
    OutOfOrder { stream: Stream, time: i64, last: i64 },

    /// Sample carries a value the engine cannot integrate (NaN, infinity)
    #[error("Invalid sample field {field}: {reason}")]
    InvalidSample { field: String, reason: String },

    /// Questionnaire answer outside its ordinal scale
    #[error("Invalid answer for {question}: {value}")]
    InvalidAnswer { question: String, value: i32 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parse errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, StaminaError>;

/// Status code reported to hosts for a successful update
pub const STATUS_OK: i32 = 0;

impl StaminaError {
    /// Integer status for host bindings (0 is reserved for success)
    pub fn status_code(&self) -> i32 {
        match self {
            StaminaError::OutOfOrder { .. } => 1,
            StaminaError::InvalidSample { .. } => 2,
            StaminaError::InvalidAnswer { .. } => 3,
            StaminaError::Configuration(_)
            | StaminaError::Io(_)
            | StaminaError::Csv(_)
            | StaminaError::TomlParse(_) => 4,
        }
    }

    /// Whether the caller can resubmit corrected data
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StaminaError::OutOfOrder { .. }
                | StaminaError::InvalidSample { .. }
                | StaminaError::InvalidAnswer { .. }
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StaminaError::OutOfOrder { .. } => ErrorSeverity::Info,
            StaminaError::InvalidSample { .. } | StaminaError::InvalidAnswer { .. } => {
                ErrorSeverity::Warning
            }
            _ => ErrorSeverity::Error,
        }
    }

    pub(crate) fn invalid_sample(field: &str, reason: impl Into<String>) -> Self {
        StaminaError::InvalidSample {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Map an update result onto the host status code
pub fn status_of<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.status_code(),
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation but the engine can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_non_zero() {
        let err = StaminaError::OutOfOrder {
            stream: Stream::HeartRate,
            time: 10,
            last: 10,
        };
        assert_eq!(err.status_code(), 1);
        assert_eq!(StaminaError::invalid_sample("speed", "NaN").status_code(), 2);
        assert_eq!(
            StaminaError::Configuration("bad".to_string()).status_code(),
            4
        );
    }

    #[test]
    fn test_status_of() {
        let ok: Result<()> = Ok(());
        assert_eq!(status_of(&ok), STATUS_OK);

        let err: Result<()> = Err(StaminaError::InvalidAnswer {
            question: "rpe".to_string(),
            value: 42,
        });
        assert_eq!(status_of(&err), 3);
    }

    #[test]
    fn test_error_severity_and_retry() {
        let err = StaminaError::OutOfOrder {
            stream: Stream::Activity,
            time: 1,
            last: 5,
        };
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("activity"));

        let err = StaminaError::Configuration("x".to_string());
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
        assert!(!err.is_retryable());
    }
}

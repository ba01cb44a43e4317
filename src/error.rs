//! Error types for feature computation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::UserId;

/// Errors raised while loading ratings or computing features.
///
/// Missing users and degenerate metrics are not errors: they resolve to
/// zero-valued features. Only malformed input and misuse of the API abort.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Malformed record {record}: field `{field}` {message}")]
    DataFormat {
        record: usize,
        field: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Velocity for user {user} recorded out of order: {attempted} is before {last}")]
    OutOfOrder {
        user: UserId,
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeatureError {
    pub(crate) fn data_format(record: usize, field: &'static str, message: impl Into<String>) -> Self {
        Self::DataFormat {
            record,
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for feature operations
pub type Result<T> = std::result::Result<T, FeatureError>;

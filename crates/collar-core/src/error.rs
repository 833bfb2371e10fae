use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollarError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Empty distribution: {0}")]
    EmptyDistribution(String),

    #[error("Numerical error in {context}: {value}")]
    NumericalError { context: String, value: f64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CollarError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CollarError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CollarError {
    fn from(e: serde_json::Error) -> Self {
        CollarError::SerializationError(e.to_string())
    }
}

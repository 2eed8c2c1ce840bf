use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectionError>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Invalid scenario config: {field}: {reason}")]
    InvalidScenarioConfig { field: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl ProjectionError {
    pub(crate) fn scenario(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidScenarioConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn input(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

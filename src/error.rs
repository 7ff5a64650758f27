#[derive(Debug, thiserror::Error)]
pub enum HourError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl HourError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Stable IPC error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "bad_params",
            Self::Validation(_) => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "db_query_failed",
        }
    }
}

pub type HourResult<T> = Result<T, HourError>;

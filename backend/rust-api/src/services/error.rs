use thiserror::Error;

/// Failures the practice services report to their callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    NotFound {
        message: String,
        suggestions: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }
}

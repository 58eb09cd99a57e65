use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected locally before any network call; surfaced inline next to the
    /// offending field, never retried.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// A save reached the server (or tried to) and failed. Local state is
    /// left unchanged and the caller decides whether to resubmit; automatic
    /// retries risk double-submitting activity text and attachments.
    #[error("failed to persist monthly record: {message}")]
    Persistence {
        message: String,
        correlation_id: Option<String>,
    },

    /// A read failed where a safe default exists. Call sites substitute
    /// zeroed or empty defaults and keep the session usable.
    #[error("fetch failed: {message}")]
    Fetch {
        message: String,
        correlation_id: Option<String>,
    },

    #[error("dashboard API returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        correlation_id: Option<String>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "oiboard::validation", %message, "validation error");
        AppError::Validation { message }
    }

    pub fn persistence(message: impl Into<String>, correlation_id: Option<&str>) -> Self {
        let message = message.into();
        match correlation_id {
            Some(id) => {
                error!(target: "oiboard::api", correlation_id = %id, %message, "save failed")
            }
            None => error!(target: "oiboard::api", %message, "save failed"),
        }
        AppError::Persistence {
            message,
            correlation_id: correlation_id.map(|id| id.to_string()),
        }
    }

    pub fn fetch(message: impl Into<String>, correlation_id: Option<&str>) -> Self {
        let message = message.into();
        match correlation_id {
            Some(id) => {
                warn!(target: "oiboard::api", correlation_id = %id, %message, "fetch failed")
            }
            None => warn!(target: "oiboard::api", %message, "fetch failed"),
        }
        AppError::Fetch {
            message,
            correlation_id: correlation_id.map(|id| id.to_string()),
        }
    }

    pub fn http(status: u16, message: impl Into<String>, correlation_id: &str) -> Self {
        let message = message.into();
        warn!(
            target: "oiboard::api",
            status,
            correlation_id = %correlation_id,
            %message,
            "non-success response from dashboard API"
        );
        AppError::Http {
            status,
            message,
            correlation_id: Some(correlation_id.to_string()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "oiboard::other", %message, "other error");
        AppError::Other(message)
    }

    /// True for read failures the ledger absorbs by synthesizing defaults
    /// instead of surfacing to the user.
    pub fn is_degradable_read(&self) -> bool {
        matches!(self, AppError::Fetch { .. } | AppError::Http { .. })
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Persistence { correlation_id, .. }
            | AppError::Fetch { correlation_id, .. }
            | AppError::Http { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }
}

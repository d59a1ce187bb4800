use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Closed set of failure categories reported by the external backends.
///
/// The category is decided once, where the raw transport error or HTTP status
/// is inspected, so callers never re-match error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorCategory {
    RateLimited,
    ServerError,
    Timeout,
    Rejected,
    Transport,
    Malformed,
}

impl BackendErrorCategory {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendErrorCategory::RateLimited
                | BackendErrorCategory::ServerError
                | BackendErrorCategory::Timeout
        )
    }

    /// Classify an HTTP status together with the message the backend sent back.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        match status {
            Some(429) => return BackendErrorCategory::RateLimited,
            Some(code) if (500..600).contains(&code) => return BackendErrorCategory::ServerError,
            _ => {}
        }

        let lowered = message.to_ascii_lowercase();
        if lowered.contains("rate limit") {
            BackendErrorCategory::RateLimited
        } else if lowered.contains("internal error") {
            BackendErrorCategory::ServerError
        } else if lowered.contains("timeout") || lowered.contains("timed out") {
            BackendErrorCategory::Timeout
        } else if status.is_some() {
            BackendErrorCategory::Rejected
        } else {
            BackendErrorCategory::Transport
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return BackendErrorCategory::Timeout;
        }
        if err.is_decode() {
            return BackendErrorCategory::Malformed;
        }
        Self::classify(err.status().map(|s| s.as_u16()), &err.to_string())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendErrorCategory::RateLimited => "rate_limited",
            BackendErrorCategory::ServerError => "server_error",
            BackendErrorCategory::Timeout => "timeout",
            BackendErrorCategory::Rejected => "rejected",
            BackendErrorCategory::Transport => "transport",
            BackendErrorCategory::Malformed => "malformed",
        }
    }
}

impl fmt::Display for BackendErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{service} error ({category}): {message}")]
    BackendError {
        service: &'static str,
        category: BackendErrorCategory,
        message: String,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("No images were generated: {0}")]
    NoImagesGenerated(String),
    #[error("No images were successfully processed")]
    NoImagesProcessed,
}

impl PipelineError {
    pub fn backend(
        service: &'static str,
        category: BackendErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        PipelineError::BackendError {
            service,
            category,
            message: message.into(),
        }
    }

    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        PipelineError::BackendError {
            service,
            category: BackendErrorCategory::from_reqwest(&err),
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> Option<BackendErrorCategory> {
        match self {
            PipelineError::BackendError { category, .. } => Some(*category),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category().map_or(false, |c| c.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

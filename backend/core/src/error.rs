use thiserror::Error;

/// Top-level error type for the PageLens OCR gateway.
#[derive(Debug, Error)]
pub enum PageLensError {
    #[error("{0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("user record not found for uid {0}")]
    UserNotFound(String),

    #[error("account is pending approval")]
    PendingApproval,

    #[error("daily usage limit exceeded ({used}/{limit})")]
    DailyLimitExceeded { used: u32, limit: u32 },

    #[error("recognition engine error: {0}")]
    Engine(String),

    #[error("user store error: {0}")]
    Store(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PageLensError {
    /// True for outcomes caused by the caller's credentials or quota rather
    /// than a failure inside this service or its collaborators.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Unauthorized(_)
                | Self::UserNotFound(_)
                | Self::PendingApproval
                | Self::DailyLimitExceeded { .. }
        )
    }
}

//! Error taxonomy for the approval workflow.

use crate::request::ApprovalStatus;

/// Errors from the approval gate and magic-link workflow.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApprovalError {
    /// No request matches the presented token.
    #[error("approval link is not valid")]
    InvalidToken,
    /// The request expired before the link was used.
    #[error("approval request has expired")]
    RequestExpired,
    /// The request already reached a terminal state; clicking a link
    /// twice is a no-op, never a second charge.
    #[error("payment already {status}")]
    AlreadyProcessed {
        /// The terminal state the request is in.
        status: ApprovalStatus,
    },
    /// No request with the given id exists.
    #[error("approval request not found")]
    UnknownRequest,
    /// The approval store failed.
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl ApprovalError {
    /// Machine-readable reason code for API responses.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::RequestExpired => "request_expired",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::UnknownRequest => "unknown_request",
            Self::Store(_) => "store_unavailable",
        }
    }
}

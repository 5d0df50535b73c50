//! Approval request entity and its lifecycle states.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use taskpay::UnixTimestamp;

/// Lifecycle state of an approval request.
///
/// `Pending` is the only non-terminal state. Transitions out of it happen
/// exactly once, through either a token redemption or expiry detection,
/// and are never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting for the user to click a link.
    Pending,
    /// User clicked approve.
    Approved,
    /// User clicked deny.
    Denied,
    /// `expires_at` passed before a link was used.
    Expired,
}

impl ApprovalStatus {
    /// The storage spelling of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown status spellings in storage.
#[derive(Debug, thiserror::Error)]
#[error("unknown approval status {0:?}")]
pub struct ApprovalStatusParseError(String);

impl FromStr for ApprovalStatus {
    type Err = ApprovalStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            "expired" => Ok(Self::Expired),
            other => Err(ApprovalStatusParseError(other.to_owned())),
        }
    }
}

/// A persisted approval request.
///
/// `id` is safe to hand out for status polling. `token` is the single-use
/// secret and only ever appears inside the emailed links — status
/// responses must never carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    /// Opaque request identifier (`apr_…`).
    pub id: String,
    /// Task this payment belongs to.
    pub task_id: String,
    /// User asked to approve.
    pub user_id: String,
    /// Single-use redemption secret.
    pub token: String,
    /// Current lifecycle state.
    pub status: ApprovalStatus,
    /// Payment amount in decimal USD.
    pub amount: Decimal,
    /// What the user is paying for.
    pub task_description: String,
    /// Creation time.
    pub created_at: UnixTimestamp,
    /// Hard expiry; pending requests past this report `expired`.
    pub expires_at: UnixTimestamp,
    /// Set once on approval.
    pub approved_at: Option<UnixTimestamp>,
    /// Set once on denial.
    pub denied_at: Option<UnixTimestamp>,
}

impl ApprovalRequest {
    /// Whether the stored expiry has passed, regardless of the stored
    /// status field.
    #[must_use]
    pub fn is_past_expiry(&self, now: UnixTimestamp) -> bool {
        now > self.expires_at
    }
}

/// The payment attempt being evaluated, as supplied by the task pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentContext {
    /// Task identifier.
    pub task_id: String,
    /// Paying user's identifier.
    pub user_id: String,
    /// Where the approval email goes.
    pub user_email: String,
    /// Cost in decimal USD.
    pub amount: Decimal,
    /// Human-readable description for the email body.
    pub description: String,
}

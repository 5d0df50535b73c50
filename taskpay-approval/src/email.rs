//! Approval email content and the dispatch seam.
//!
//! The engine owns the content — subject line and the two single-use
//! URLs — but not the transport. Production deployments plug a real
//! transport in behind [`ApprovalMailer`]; [`LogMailer`] is the
//! development fallback that writes the links to the log instead.

use async_trait::async_trait;
use rust_decimal::Decimal;
use url::Url;

use crate::request::PaymentContext;

/// Failure to hand an email to the transport.
///
/// Dispatch failure never rolls back the approval request it belongs to;
/// the caller decides whether an unmailed request is usable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("email dispatch failed: {0}")]
pub struct MailerError(pub String);

/// A composed approval email, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Payment amount, for the body.
    pub amount: Decimal,
    /// What is being paid for, for the body.
    pub task_description: String,
    /// Single-use approval link.
    pub approve_url: Url,
    /// Single-use denial link.
    pub deny_url: Url,
}

impl ApprovalEmail {
    /// Composes the email for a payment, embedding the redemption token
    /// in both links. The token appears nowhere else.
    ///
    /// # Errors
    ///
    /// Returns [`MailerError`] if the link URLs cannot be built from the
    /// configured base URL.
    pub fn compose(
        ctx: &PaymentContext,
        base_url: &Url,
        token: &str,
    ) -> Result<Self, MailerError> {
        let approve_url = base_url
            .join(&format!("api/payments/magic-link/approve/{token}"))
            .map_err(|e| MailerError(e.to_string()))?;
        let deny_url = base_url
            .join(&format!("api/payments/magic-link/deny/{token}"))
            .map_err(|e| MailerError(e.to_string()))?;
        Ok(Self {
            to: ctx.user_email.clone(),
            subject: format!("Payment approval required: ${}", ctx.amount),
            amount: ctx.amount,
            task_description: ctx.description.clone(),
            approve_url,
            deny_url,
        })
    }
}

/// Outbound email capability consumed by the workflow.
#[async_trait]
pub trait ApprovalMailer: Send + Sync {
    /// Dispatches one approval email.
    async fn send(&self, email: &ApprovalEmail) -> Result<(), MailerError>;
}

/// Development mailer: logs the links instead of sending anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl ApprovalMailer for LogMailer {
    async fn send(&self, email: &ApprovalEmail) -> Result<(), MailerError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            approve_url = %email.approve_url,
            deny_url = %email.deny_url,
            "approval email (log transport)"
        );
        Ok(())
    }
}

//! The magic-link approval workflow.
//!
//! A request is created with a high-entropy single-use token, delivered
//! out-of-band as an approve link and a deny link, and consumed at most
//! once. Expiry is enforced on every read and every redemption, so a row
//! whose `expires_at` has passed reports `expired` even while its stored
//! status still says `pending`.

use std::time::Duration;

use rand::RngExt;
use rand::rng;
use rust_decimal::Decimal;
use serde::Serialize;
use taskpay::UnixTimestamp;
use taskpay::config::EngineConfig;
use url::Url;

use crate::email::{ApprovalEmail, ApprovalMailer, MailerError};
use crate::error::ApprovalError;
use crate::request::{ApprovalRequest, ApprovalStatus, PaymentContext};
use crate::store::ApprovalStore;

/// User's verdict carried by the clicked link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The approve link.
    Approve,
    /// The deny link.
    Deny,
}

impl Verdict {
    const fn target_status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Deny => ApprovalStatus::Denied,
        }
    }
}

/// Result of creating an approval request.
#[derive(Debug)]
pub struct CreatedRequest {
    /// Public id for status polling.
    pub request_id: String,
    /// When the emailed links stop working.
    pub expires_at: UnixTimestamp,
    /// Set when the request was persisted but the email could not be
    /// dispatched; the caller decides whether the request is usable.
    pub dispatch_error: Option<MailerError>,
}

/// Result of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    /// The redeemed request.
    pub request_id: String,
    /// Task the payment belongs to.
    pub task_id: String,
    /// Payment amount in decimal USD.
    pub amount: Decimal,
    /// The state the request moved to.
    pub status: ApprovalStatus,
    /// When the transition happened.
    pub processed_at: UnixTimestamp,
}

/// Status report safe to return from polling endpoints.
///
/// Deliberately excludes the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Public request id.
    pub request_id: String,
    /// Task the payment belongs to.
    pub task_id: String,
    /// Current state, after expiry-on-read.
    pub status: ApprovalStatus,
    /// Payment amount in decimal USD.
    pub amount: Decimal,
    /// Link expiry.
    pub expires_at: UnixTimestamp,
}

impl StatusReport {
    fn from_request(request: &ApprovalRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            task_id: request.task_id.clone(),
            status: request.status,
            amount: request.amount,
            expires_at: request.expires_at,
        }
    }
}

/// Issues, tracks, and single-use-consumes approval tokens.
#[derive(Debug)]
pub struct MagicLinkWorkflow<M> {
    store: ApprovalStore,
    mailer: M,
    expiry: Duration,
    base_url: Url,
}

impl<M: ApprovalMailer> MagicLinkWorkflow<M> {
    /// Creates a workflow over a store and mailer.
    pub const fn new(store: ApprovalStore, mailer: M, expiry: Duration, base_url: Url) -> Self {
        Self {
            store,
            mailer,
            expiry,
            base_url,
        }
    }

    /// Creates a workflow from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig, store: ApprovalStore, mailer: M) -> Self {
        Self::new(
            store,
            mailer,
            Duration::from_secs(config.approval.expiry_minutes * 60),
            config.approval.base_url.clone(),
        )
    }

    /// Creates a pending approval request and dispatches the magic-link
    /// email.
    ///
    /// The request is persisted first; a dispatch failure is reported on
    /// the returned [`CreatedRequest`] rather than rolling anything back.
    ///
    /// # Errors
    ///
    /// Returns store errors only.
    pub async fn create_request(
        &self,
        ctx: &PaymentContext,
    ) -> Result<CreatedRequest, ApprovalError> {
        let token = generate_token();
        let request_id = generate_request_id();
        let created_at = UnixTimestamp::now();
        let expires_at = created_at + self.expiry.as_secs();

        let request = ApprovalRequest {
            id: request_id.clone(),
            task_id: ctx.task_id.clone(),
            user_id: ctx.user_id.clone(),
            token: token.clone(),
            status: ApprovalStatus::Pending,
            amount: ctx.amount,
            task_description: ctx.description.clone(),
            created_at,
            expires_at,
            approved_at: None,
            denied_at: None,
        };
        self.store.insert(&request).await?;

        tracing::info!(
            request_id = %request_id,
            task_id = %ctx.task_id,
            amount = %ctx.amount,
            "approval request created"
        );

        let dispatch_error = match ApprovalEmail::compose(ctx, &self.base_url, &token) {
            Ok(email) => self.mailer.send(&email).await.err(),
            Err(e) => Some(e),
        };
        if let Some(error) = &dispatch_error {
            tracing::warn!(request_id = %request_id, %error, "approval email dispatch failed");
        }

        Ok(CreatedRequest {
            request_id,
            expires_at,
            dispatch_error,
        })
    }

    /// Redeems a magic-link token.
    ///
    /// The pending→terminal transition is a single conditional update;
    /// of two concurrent clicks on one still-valid link, exactly one
    /// succeeds and the other observes `AlreadyProcessed`.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::InvalidToken`] — no such token
    /// - [`ApprovalError::RequestExpired`] — expiry passed; the row is
    ///   flipped to `expired` as a side effect
    /// - [`ApprovalError::AlreadyProcessed`] — the request already
    ///   reached a terminal state
    pub async fn redeem(&self, token: &str, verdict: Verdict) -> Result<Redemption, ApprovalError> {
        let now = UnixTimestamp::now();
        let claimed = self.store.claim(token, verdict.target_status(), now).await?;

        let Some(request) = self.store.by_token(token).await? else {
            return Err(ApprovalError::InvalidToken);
        };

        if claimed {
            tracing::info!(
                request_id = %request.id,
                task_id = %request.task_id,
                status = %request.status,
                "approval request redeemed"
            );
            return Ok(Redemption {
                request_id: request.id,
                task_id: request.task_id,
                amount: request.amount,
                status: request.status,
                processed_at: now,
            });
        }

        if request.status == ApprovalStatus::Pending && request.is_past_expiry(now) {
            self.store.expire_by_token(token).await?;
            return Err(ApprovalError::RequestExpired);
        }
        Err(ApprovalError::AlreadyProcessed {
            status: request.status,
        })
    }

    /// Reads the current status of a request by its public id.
    ///
    /// Performs expiry-on-read: a pending request past its expiry is
    /// flipped to `expired` before the report is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::UnknownRequest`] for an unknown id, or
    /// store errors.
    pub async fn check_status(&self, request_id: &str) -> Result<StatusReport, ApprovalError> {
        let Some(mut request) = self.store.by_id(request_id).await? else {
            return Err(ApprovalError::UnknownRequest);
        };
        if request.status == ApprovalStatus::Pending
            && request.is_past_expiry(UnixTimestamp::now())
        {
            if self.store.expire_by_id(request_id).await? {
                request.status = ApprovalStatus::Expired;
            } else if let Some(fresh) = self.store.by_id(request_id).await? {
                // Lost a race with a redemption; report what actually won.
                request = fresh;
            }
        }
        Ok(StatusReport::from_request(&request))
    }

    /// The most recent request for a task, after expiry-on-read.
    ///
    /// # Errors
    ///
    /// Returns store errors; a task with no requests is `Ok(None)`.
    pub async fn latest_for_task(
        &self,
        task_id: &str,
    ) -> Result<Option<StatusReport>, ApprovalError> {
        let Some(mut request) = self.store.latest_for_task(task_id).await? else {
            return Ok(None);
        };
        if request.status == ApprovalStatus::Pending
            && request.is_past_expiry(UnixTimestamp::now())
        {
            if self.store.expire_by_id(&request.id).await? {
                request.status = ApprovalStatus::Expired;
            } else if let Some(fresh) = self.store.by_id(&request.id).await? {
                request = fresh;
            }
        }
        Ok(Some(StatusReport::from_request(&request)))
    }
}

/// 32 random bytes, hex-encoded: the single-use redemption secret.
fn generate_token() -> String {
    let bytes: [u8; 32] = rng().random();
    hex::encode(bytes)
}

/// `apr_` plus 12 random bytes: the public request id.
fn generate_request_id() -> String {
    let bytes: [u8; 12] = rng().random();
    format!("apr_{}", hex::encode(bytes))
}

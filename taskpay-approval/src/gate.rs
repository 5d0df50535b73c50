//! The approval gate: decides whether a payment may proceed to signing.
//!
//! One decision per (task, payment attempt). Costs below the configured
//! threshold go straight through; costs at or above it must first clear
//! the magic-link workflow. The gate re-reads stored status on every
//! poll — it never caches a `pending` answer, so an approval that lands
//! between polls is picked up on the next one.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use taskpay::UnixTimestamp;
use taskpay::config::EngineConfig;

use crate::email::ApprovalMailer;
use crate::error::ApprovalError;
use crate::magic_link::MagicLinkWorkflow;
use crate::request::{ApprovalStatus, PaymentContext};

/// Why a payment attempt is terminally blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The user denied the payment.
    ApprovalDenied,
    /// The approval request expired unused.
    ApprovalExpired,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApprovalDenied => f.write_str("payment approval was denied"),
            Self::ApprovalExpired => f.write_str("payment approval request expired"),
        }
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateDecision {
    /// No approval needed (or already granted); the caller may build the
    /// payment requirement and collect a signature.
    ReadyToSign,
    /// An approval request is pending; poll `request_id` and tell the
    /// user to check their email.
    AwaitingApproval {
        /// Id to poll with.
        request_id: String,
        /// When the emailed links stop working.
        expires_at: UnixTimestamp,
    },
    /// Terminal for this attempt. A fresh attempt must start a fresh
    /// approval request.
    Blocked {
        /// Why the attempt is dead.
        reason: BlockReason,
    },
}

/// Threshold-based approval gate over the magic-link workflow.
#[derive(Debug)]
pub struct ApprovalGate<M> {
    workflow: MagicLinkWorkflow<M>,
    threshold: Decimal,
}

impl<M: ApprovalMailer> ApprovalGate<M> {
    /// Creates a gate. Payments with `amount >= threshold` require
    /// approval; the boundary itself is inclusive.
    pub const fn new(workflow: MagicLinkWorkflow<M>, threshold: Decimal) -> Self {
        Self {
            workflow,
            threshold,
        }
    }

    /// Creates a gate from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig, workflow: MagicLinkWorkflow<M>) -> Self {
        Self::new(workflow, config.approval.threshold_usd)
    }

    /// Whether an amount needs human approval.
    ///
    /// Free results short-circuit: there is no payment to approve. Every
    /// other amount below the threshold still requires a signature, just
    /// not a human.
    #[must_use]
    pub fn requires_approval(&self, amount: Decimal) -> bool {
        !amount.is_zero() && amount >= self.threshold
    }

    /// The workflow this gate drives, for redemption and status calls.
    #[must_use]
    pub const fn workflow(&self) -> &MagicLinkWorkflow<M> {
        &self.workflow
    }

    /// Evaluates a payment attempt.
    ///
    /// Creates the approval request on first contact with an
    /// over-threshold payment; on later polls, re-reads the stored status
    /// and maps it to a decision. Once a request exists the task can
    /// never skip the awaiting state — there is no cached answer to go
    /// stale.
    ///
    /// # Errors
    ///
    /// Returns store errors. Email dispatch failure is not an error here:
    /// the request exists and is surfaced as awaiting; the failure itself
    /// is logged by the workflow.
    pub async fn evaluate(&self, ctx: &PaymentContext) -> Result<GateDecision, ApprovalError> {
        if !self.requires_approval(ctx.amount) {
            return Ok(GateDecision::ReadyToSign);
        }

        if let Some(report) = self.workflow.latest_for_task(&ctx.task_id).await? {
            let decision = match report.status {
                ApprovalStatus::Pending => GateDecision::AwaitingApproval {
                    request_id: report.request_id,
                    expires_at: report.expires_at,
                },
                ApprovalStatus::Approved => GateDecision::ReadyToSign,
                ApprovalStatus::Denied => GateDecision::Blocked {
                    reason: BlockReason::ApprovalDenied,
                },
                ApprovalStatus::Expired => GateDecision::Blocked {
                    reason: BlockReason::ApprovalExpired,
                },
            };
            return Ok(decision);
        }

        let created = self.workflow.create_request(ctx).await?;
        tracing::info!(
            task_id = %ctx.task_id,
            request_id = %created.request_id,
            amount = %ctx.amount,
            "payment requires approval, awaiting email confirmation"
        );
        Ok(GateDecision::AwaitingApproval {
            request_id: created.request_id,
            expires_at: created.expires_at,
        })
    }
}

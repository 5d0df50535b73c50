//! Human-approval workflow for taskpay payments.
//!
//! Payments at or above a configured USD threshold must be confirmed by a
//! person before the engine will even hand out a signable authorization.
//! Confirmation happens out-of-band: the [`magic_link`] workflow emails the
//! user a pair of single-use approve/deny links, and the [`gate`] state
//! machine tells the caller whether a given payment may proceed, is still
//! waiting, or is blocked for good.
//!
//! Approval requests are persisted in SQLite ([`store`]) and never
//! deleted; terminal rows stay behind as an audit trail.

pub mod email;
pub mod error;
pub mod gate;
pub mod magic_link;
pub mod request;
pub mod store;

pub use email::{ApprovalEmail, ApprovalMailer, LogMailer, MailerError};
pub use error::ApprovalError;
pub use gate::{ApprovalGate, BlockReason, GateDecision};
pub use magic_link::{CreatedRequest, MagicLinkWorkflow, Redemption, StatusReport, Verdict};
pub use request::{ApprovalRequest, ApprovalStatus, PaymentContext};
pub use store::ApprovalStore;

//! Core types for the taskpay payment authorization & settlement engine.
//!
//! This crate holds the pieces shared by every other taskpay crate:
//!
//! - [`timestamp::UnixTimestamp`] — authorization validity windows
//! - [`money`] — decimal USD to token minor-unit conversion
//! - [`error::PaymentError`] — the payment-path error taxonomy
//! - [`config::EngineConfig`] — engine configuration loaded from TOML
//!
//! Chain-facing logic lives in `taskpay-evm`; the approval workflow lives
//! in `taskpay-approval`.

pub mod config;
pub mod error;
pub mod money;
pub mod timestamp;

pub use config::EngineConfig;
pub use error::PaymentError;
pub use timestamp::UnixTimestamp;

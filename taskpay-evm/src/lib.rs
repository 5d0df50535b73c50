//! ERC-3009 payment authorization, verification, and settlement.
//!
//! This crate is the chain-facing half of the taskpay engine. A payment
//! flows through it in three steps:
//!
//! 1. [`requirement::RequirementBuilder`] turns a task cost into an
//!    unsigned, time-bounded authorization for the client wallet to sign.
//! 2. [`verify::verify_authorization`] recovers the signer from the
//!    returned signature without trusting the claimed payer.
//! 3. [`settle::SettlementExecutor`] runs the precondition checks in
//!    strict order and submits the transfer exactly once through a
//!    [`chain::ChainClient`].
//!
//! The payer's signature authorizes only the token transfer; the service's
//! own key pays gas, so payers never need the chain's native token.

pub mod chain;
pub mod eip155;
pub mod requirement;
pub mod settle;
pub mod typed_data;
pub mod verify;
pub mod wire;

pub use chain::{ChainClient, ReceiptOutcome};
pub use eip155::Eip155ChainClient;
pub use requirement::{PaymentRequirement, RequirementBuilder};
pub use settle::SettlementExecutor;
pub use typed_data::{AuthorizationMessage, TokenDomain};
pub use wire::{EcdsaSignature, WireAuthorization, WireSignature};

//! The settlement executor: end-to-end enforcement of a paid transfer.
//!
//! `execute` runs the checks in a fixed order — signature, validity
//! window, gas balance, payer balance, submission, receipt — and the order
//! is load-bearing twice over: signature verification must come before any
//! chain read so unauthenticated callers cannot probe balances, and
//! submission happens exactly once per call so a slow confirmation is
//! never turned into a double spend by an internal retry.

use std::time::Duration;

use alloy_primitives::{Address, TxHash};
use taskpay::config::EngineConfig;
use taskpay::{PaymentError, UnixTimestamp};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::{ChainClient, ReceiptOutcome};
use crate::typed_data::TokenDomain;
use crate::verify::verify_authorization;
use crate::wire::{WireAuthorization, WireSignature};

/// Orchestrates verification, precondition checks, submission, and receipt
/// interpretation for one payment.
#[derive(Debug)]
pub struct SettlementExecutor<C> {
    chain: C,
    domain: TokenDomain,
    operator: Address,
    receipt_timeout: Duration,
}

impl<C> SettlementExecutor<C> {
    /// Creates an executor over a chain client.
    ///
    /// `operator` is the service wallet whose native balance pays gas.
    #[must_use]
    pub const fn new(
        chain: C,
        domain: TokenDomain,
        operator: Address,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            domain,
            operator,
            receipt_timeout,
        }
    }

    /// Creates an executor from engine configuration and a chain client.
    #[must_use]
    pub fn from_config(config: &EngineConfig, chain: C) -> Self {
        Self::new(
            chain,
            TokenDomain::from_config(config),
            config.operator.address,
            Duration::from_secs(config.payment.receipt_timeout_secs),
        )
    }
}

impl<C: ChainClient + Sync> SettlementExecutor<C> {
    /// Verifies and settles one signed authorization.
    ///
    /// Exactly one submission attempt is made per call. On success the
    /// transfer is confirmed on-chain and its hash returned.
    ///
    /// # Errors
    ///
    /// Returns the [`PaymentError`] category for the first failed check;
    /// see the crate-level ordering guarantees. `TransactionUnconfirmed`
    /// is not proof of failure — the caller decides whether to keep
    /// polling or to issue a fresh authorization.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    pub async fn execute(
        &self,
        authorization: &WireAuthorization,
        signature: &WireSignature,
    ) -> Result<TxHash, PaymentError> {
        let message = authorization.decode()?;
        let signature = signature.decode()?;

        verify_authorization(&message, &signature, &self.domain)?;

        let now = UnixTimestamp::now();
        if now < message.valid_after {
            return Err(PaymentError::AuthorizationNotYetValid);
        }
        if now > message.valid_before {
            return Err(PaymentError::AuthorizationExpired);
        }

        let gas_balance = self.chain.native_balance(self.operator).await?;
        if gas_balance.is_zero() {
            return Err(PaymentError::InsufficientGas);
        }

        let payer_balance = self.chain.token_balance(message.from).await?;
        if payer_balance < message.value {
            return Err(PaymentError::InsufficientFunds);
        }

        let tx = self
            .chain
            .submit_transfer_with_authorization(&message, &signature)
            .await?;

        match self.chain.wait_for_receipt(tx, self.receipt_timeout).await? {
            ReceiptOutcome::Settled(tx) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(tx = %tx, payer = %message.from, value = %message.value, "payment settled");
                Ok(tx)
            }
            ReceiptOutcome::Reverted { tx, reason } => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(tx = %tx, reason = ?reason, "payment reverted");
                Err(PaymentError::TransactionReverted { tx, reason })
            }
            ReceiptOutcome::Unconfirmed(tx) => Err(PaymentError::TransactionUnconfirmed { tx }),
        }
    }
}

//! The chain client adapter: every ledger read and write goes through
//! [`ChainClient`].
//!
//! The trait keeps settlement logic testable against fakes and pins down
//! the failure semantics the executor relies on: transport failures are
//! retryable *by the caller* (nothing here retries), a reverted transfer is
//! permanent, and a confirmation timeout is neither — the transaction may
//! still land, so [`ReceiptOutcome::Unconfirmed`] is reported distinctly.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;
use taskpay::{PaymentError, money};

use crate::typed_data::AuthorizationMessage;
use crate::wire::EcdsaSignature;

/// Terminal classification of a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// The transfer was mined and succeeded.
    Settled(TxHash),
    /// The transfer was mined and reverted.
    Reverted {
        /// Hash of the reverted transaction.
        tx: TxHash,
        /// Revert reason, when the node exposed one.
        reason: Option<String>,
    },
    /// No receipt within the deadline; the transfer may still land.
    Unconfirmed(TxHash),
}

/// Ledger operations needed to settle an authorized transfer.
///
/// Implementations perform exactly one network operation per call and
/// surface transport failures as [`PaymentError::ChainUnavailable`];
/// settlement is at-most-once per call and retry policy belongs to the
/// caller.
pub trait ChainClient {
    /// Native-token balance of `address` (the gas currency).
    fn native_balance(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<U256, PaymentError>> + Send;

    /// Stablecoin balance of `address`, in minor units.
    fn token_balance(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<U256, PaymentError>> + Send;

    /// Current gas price in wei.
    fn gas_price(&self) -> impl Future<Output = Result<u128, PaymentError>> + Send;

    /// Account-level transaction counter of `address`.
    ///
    /// This is the sequential chain nonce, unrelated to the 32-byte
    /// authorization nonce.
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, PaymentError>> + Send;

    /// Submits `transferWithAuthorization` carrying the payer's signature,
    /// paid for by the service wallet. Exactly one submission per call.
    fn submit_transfer_with_authorization(
        &self,
        message: &AuthorizationMessage,
        signature: &EcdsaSignature,
    ) -> impl Future<Output = Result<TxHash, PaymentError>> + Send;

    /// Waits up to `timeout` for the receipt of `tx` and classifies it.
    fn wait_for_receipt(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> impl Future<Output = Result<ReceiptOutcome, PaymentError>> + Send;
}

/// Reads a human-readable stablecoin balance for a wallet.
///
/// Convenience for the wallet-facing surface; scales the minor-unit
/// balance down by the token's decimals.
///
/// # Errors
///
/// Propagates chain errors and fails on balances exceeding what a
/// [`Decimal`] can represent.
pub async fn display_balance<C: ChainClient + Sync>(
    client: &C,
    address: Address,
    decimals: u8,
) -> Result<Decimal, PaymentError> {
    let minor = client.token_balance(address).await?;
    money::minor_to_usd(minor, decimals)
}

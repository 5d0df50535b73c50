//! Error taxonomy for the payment path.
//!
//! Every failure between "client submitted a signed authorization" and
//! "transfer confirmed on-chain" maps to one [`PaymentError`] variant. The
//! API layer matches on the category (or its [`reason_code`]) and never
//! surfaces raw internals to end users.
//!
//! [`reason_code`]: PaymentError::reason_code

use alloy_primitives::{Address, TxHash};

/// Errors that can occur while building, verifying, or settling a payment.
///
/// Validation failures (`InvalidSignature`, `MalformedNonce`, the window and
/// balance checks) are detected before any chain write and are never worth
/// retrying with identical inputs. `ChainUnavailable` is retryable at the
/// caller's discretion. `TransactionUnconfirmed` means the transfer may
/// still land: resubmitting requires a fresh nonce.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PaymentError {
    /// Signature recovery did not yield the claimed payer address.
    ///
    /// Carries the recovered address when recovery itself succeeded, for
    /// diagnostics; `None` means the signature bytes were unusable.
    #[error("signature does not match the payer address")]
    InvalidSignature {
        /// Address actually recovered from the signature, if any.
        recovered: Option<Address>,
    },
    /// The authorization nonce did not decode to exactly 32 bytes.
    #[error("nonce must be exactly 32 bytes, got {len}")]
    MalformedNonce {
        /// Decoded byte length of the offending value.
        len: usize,
    },
    /// Current time is before the authorization's `validAfter`.
    #[error("payment authorization is not yet valid")]
    AuthorizationNotYetValid,
    /// Current time is past the authorization's `validBefore`.
    #[error("payment authorization has expired")]
    AuthorizationExpired,
    /// The service wallet holds no native token to pay gas with.
    ///
    /// Fatal to this attempt, not to the service.
    #[error("service wallet has no balance for gas fees")]
    InsufficientGas,
    /// The payer's token balance does not cover the authorized amount.
    #[error("payer balance does not cover the payment amount")]
    InsufficientFunds,
    /// A cost amount could not be converted to token units.
    #[error("invalid payment amount: {0}")]
    InvalidAmount(String),
    /// The ledger node could not be reached or errored at the transport
    /// level. Retryable by the caller; never retried internally.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),
    /// The transfer transaction landed on-chain and reverted.
    #[error("transaction {tx} reverted")]
    TransactionReverted {
        /// Hash of the reverted transaction.
        tx: TxHash,
        /// Revert reason, when the node exposed one.
        reason: Option<String>,
    },
    /// No receipt arrived within the confirmation deadline.
    ///
    /// Not a failure: the transaction may still be mined. The caller must
    /// not blindly resubmit the same authorization.
    #[error("transaction {tx} not confirmed within the deadline")]
    TransactionUnconfirmed {
        /// Hash of the in-flight transaction.
        tx: TxHash,
    },
}

impl PaymentError {
    /// Machine-readable reason code for API responses.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::MalformedNonce { .. } => "malformed_nonce",
            Self::AuthorizationNotYetValid => "authorization_not_yet_valid",
            Self::AuthorizationExpired => "authorization_expired",
            Self::InsufficientGas => "insufficient_gas",
            Self::InsufficientFunds => "insufficient_funds",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::ChainUnavailable(_) => "chain_unavailable",
            Self::TransactionReverted { .. } => "transaction_reverted",
            Self::TransactionUnconfirmed { .. } => "transaction_unconfirmed",
        }
    }

    /// Whether the caller may retry the same call unchanged.
    ///
    /// Only transport-level failures qualify; everything else either
    /// reproduces the same failure or risks a double submission.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ChainUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn reason_codes_are_stable() {
        let err = PaymentError::InvalidSignature {
            recovered: Some(address!("0x1111111111111111111111111111111111111111")),
        };
        assert_eq!(err.reason_code(), "invalid_signature");
        assert_eq!(
            PaymentError::MalformedNonce { len: 31 }.reason_code(),
            "malformed_nonce"
        );
        assert_eq!(
            PaymentError::TransactionUnconfirmed { tx: TxHash::ZERO }.reason_code(),
            "transaction_unconfirmed"
        );
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(PaymentError::ChainUnavailable("connection refused".into()).is_retryable());
        assert!(!PaymentError::InsufficientFunds.is_retryable());
        assert!(!PaymentError::TransactionUnconfirmed { tx: TxHash::ZERO }.is_retryable());
    }

    #[test]
    fn malformed_nonce_reports_length() {
        let err = PaymentError::MalformedNonce { len: 20 };
        assert_eq!(err.to_string(), "nonce must be exactly 32 bytes, got 20");
    }
}

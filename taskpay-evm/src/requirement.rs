//! Builds the unsigned payment authorization a client wallet must sign.
//!
//! The builder converts a task's decimal USD cost into token minor units
//! (truncating — the quoted price is a ceiling), stamps a validity window,
//! and draws a fresh random 32-byte nonce. It is deliberately not
//! idempotent: building twice for one task yields two authorizations with
//! independent nonces, each valid until one is consumed on-chain.

use std::time::Duration;

use alloy_primitives::{Address, B256};
use rand::RngExt;
use rand::rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use taskpay::config::EngineConfig;
use taskpay::{PaymentError, UnixTimestamp, money};

use crate::typed_data::TokenDomain;
use crate::wire::WireAuthorization;

/// Builder for signable payment requirements.
#[derive(Debug, Clone)]
pub struct RequirementBuilder {
    domain: TokenDomain,
    pay_to: Address,
    decimals: u8,
    currency: String,
    network: String,
    validity: Duration,
}

impl RequirementBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new(
        domain: TokenDomain,
        pay_to: Address,
        decimals: u8,
        currency: String,
        network: String,
        validity: Duration,
    ) -> Self {
        Self {
            domain,
            pay_to,
            decimals,
            currency,
            network,
            validity,
        }
    }

    /// Builds from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            TokenDomain::from_config(config),
            config.operator.address,
            config.token.decimals,
            config.token.currency.clone(),
            config.chain.network.clone(),
            Duration::from_secs(config.payment.validity_secs),
        )
    }

    /// Builds a signable requirement for a task cost.
    ///
    /// `payer` is the client's wallet when known; otherwise the message
    /// carries the zero address as a placeholder the wallet replaces with
    /// its own before signing.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] if the cost cannot be
    /// represented in token minor units.
    pub fn build(
        &self,
        task_id: &str,
        amount_usd: Decimal,
        payer: Option<Address>,
    ) -> Result<PaymentRequirement, PaymentError> {
        let minor = money::usd_to_minor(amount_usd, self.decimals)?;
        let amount_minor: u64 = minor
            .try_into()
            .map_err(|_| PaymentError::InvalidAmount(format!("amount out of range: {amount_usd}")))?;

        let nonce: [u8; 32] = rng().random();
        let nonce = B256::from(nonce);

        let valid_after = UnixTimestamp::now();
        let valid_before = valid_after + self.validity.as_secs();

        let message = WireAuthorization {
            from: payer.unwrap_or(Address::ZERO),
            to: self.pay_to,
            value: amount_minor,
            valid_after: valid_after.as_secs(),
            valid_before: valid_before.as_secs(),
            nonce: nonce.to_string(),
        };

        Ok(PaymentRequirement {
            task_id: task_id.to_owned(),
            amount_usd,
            amount_minor,
            currency: self.currency.clone(),
            network: self.network.clone(),
            chain_id: self.domain.chain_id,
            contract: self.domain.contract,
            recipient: self.pay_to,
            domain: DomainFields {
                name: self.domain.name.clone(),
                version: self.domain.version.clone(),
                chain_id: self.domain.chain_id,
                verifying_contract: self.domain.contract,
            },
            message,
        })
    }
}

/// Everything a client needs to sign and submit a payment, plus the
/// header-style advertisement the HTTP layer attaches to 402 responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// The task being paid for.
    pub task_id: String,
    /// Cost in decimal USD.
    pub amount_usd: Decimal,
    /// Cost in token minor units.
    pub amount_minor: u64,
    /// Currency code.
    pub currency: String,
    /// Human-readable network name.
    pub network: String,
    /// Numeric chain id.
    pub chain_id: u64,
    /// Token contract address.
    pub contract: Address,
    /// Payment recipient (the service wallet).
    pub recipient: Address,
    /// EIP-712 domain the wallet must sign under.
    pub domain: DomainFields,
    /// The authorization message to sign.
    pub message: WireAuthorization,
}

/// EIP-712 domain fields in their wire spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainFields {
    /// Domain `name`.
    pub name: String,
    /// Domain `version`.
    pub version: String,
    /// Domain `chainId`.
    pub chain_id: u64,
    /// Domain `verifyingContract`.
    pub verifying_contract: Address,
}

impl PaymentRequirement {
    /// The advisory `X-Payment-*` header pairs for out-of-band
    /// advertisement of this requirement.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, String); 6] {
        [
            ("X-Payment-Required", "true".to_owned()),
            ("X-Payment-Amount", self.amount_usd.to_string()),
            ("X-Payment-Currency", self.currency.clone()),
            ("X-Payment-Chain", self.network.clone()),
            ("X-Payment-Address", self.recipient.to_string()),
            ("X-Payment-Contract", self.contract.to_string()),
        ]
    }
}

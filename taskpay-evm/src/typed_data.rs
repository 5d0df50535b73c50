//! The typed-data codec: the one place authorization bytes are produced.
//!
//! Both the requirement builder (what the wallet signs) and the verifier
//! (what the recovered signature is checked against) hash the same
//! [`AuthorizationMessage`] through [`AuthorizationMessage::signing_hash`].
//! Because there is exactly one encoding path, the two sides cannot drift:
//! a mismatched domain field or a reordered struct member would otherwise
//! fail every signature with no diagnostics beyond "recovery mismatch".

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};
use taskpay::UnixTimestamp;
use taskpay::config::EngineConfig;

sol! {
    /// ERC-3009 `TransferWithAuthorization` message.
    ///
    /// Field order is part of the type hash; it must match the deployed
    /// contract's declaration exactly.
    ///
    /// Reference: <https://eips.ethereum.org/EIPS/eip-3009>
    #[allow(missing_docs)]
    #[derive(Debug)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

/// The EIP-712 domain of the deployed stablecoin contract.
///
/// All four fields must match the contract's own domain separator. Base
/// Sepolia USDC registers itself as `("USDC", "2")` — not `"USD Coin"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDomain {
    /// Domain `name`.
    pub name: String,
    /// Domain `version`.
    pub version: String,
    /// Numeric chain identifier.
    pub chain_id: u64,
    /// The token contract (`verifyingContract`).
    pub contract: Address,
}

impl TokenDomain {
    /// Builds the domain from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            name: config.token.name.clone(),
            version: config.token.version.clone(),
            chain_id: config.chain.chain_id,
            contract: config.token.contract,
        }
    }

    /// The alloy EIP-712 domain for hashing.
    #[must_use]
    pub fn eip712(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.contract,
        }
    }
}

/// A fully typed, decoded payment authorization.
///
/// The nonce is a fixed 32-byte word, never a string; wire decoding in
/// [`crate::wire`] enforces the length before a value can reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationMessage {
    /// The payer (`from`); must match the recovered signer.
    pub from: Address,
    /// The recipient (`to`); the service wallet.
    pub to: Address,
    /// Transfer amount in token minor units.
    pub value: U256,
    /// Start of the validity window (inclusive).
    pub valid_after: UnixTimestamp,
    /// End of the validity window (exclusive).
    pub valid_before: UnixTimestamp,
    /// Unique 32-byte replay-prevention nonce.
    pub nonce: B256,
}

impl AuthorizationMessage {
    /// Computes the EIP-712 signing hash of this authorization under the
    /// given domain.
    ///
    /// This is the digest the wallet signs and the digest the verifier
    /// recovers against; there is deliberately no second encoding path.
    #[must_use]
    pub fn signing_hash(&self, domain: &TokenDomain) -> B256 {
        let message = TransferWithAuthorization {
            from: self.from,
            to: self.to,
            value: self.value,
            validAfter: U256::from(self.valid_after.as_secs()),
            validBefore: U256::from(self.valid_before.as_secs()),
            nonce: self.nonce,
        };
        message.eip712_signing_hash(&domain.eip712())
    }
}

//! Wire formats and normalization for client-submitted payloads.
//!
//! Wallet frontends are sloppy about number encodings: `BigInt.toString()`
//! produces decimal strings, `ethers` produces `0x`-hex, and both show up
//! in practice. Normalization here follows one explicit contract — accept
//! `0x`-prefixed hex or plain decimal digits, reject anything else — and
//! always yields fixed 32-byte big-endian words. A nonce that does not
//! decode to exactly 32 bytes fails loudly; it is never truncated or
//! padded into something hashable.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use taskpay::{PaymentError, UnixTimestamp};

use crate::typed_data::AuthorizationMessage;

/// A payment authorization as it crosses the API boundary.
///
/// This is both the `message` a client is asked to sign (produced by the
/// requirement builder) and the payload it submits back alongside the
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAuthorization {
    /// Payer wallet address.
    pub from: Address,
    /// Recipient (service) wallet address.
    pub to: Address,
    /// Amount in token minor units.
    pub value: u64,
    /// Start of validity window, unix seconds.
    pub valid_after: u64,
    /// End of validity window, unix seconds.
    pub valid_before: u64,
    /// 32-byte nonce, `0x`-hex or decimal encoded.
    pub nonce: String,
}

impl WireAuthorization {
    /// Decodes into a typed [`AuthorizationMessage`].
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::MalformedNonce`] if the nonce does not
    /// decode to exactly 32 bytes.
    pub fn decode(&self) -> Result<AuthorizationMessage, PaymentError> {
        Ok(AuthorizationMessage {
            from: self.from,
            to: self.to,
            value: U256::from(self.value),
            valid_after: UnixTimestamp::from_secs(self.valid_after),
            valid_before: UnixTimestamp::from_secs(self.valid_before),
            nonce: parse_nonce(&self.nonce)?,
        })
    }
}

/// A split ECDSA signature as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSignature {
    /// Recovery id: 0, 1, 27, or 28.
    pub v: u8,
    /// `r` scalar, `0x`-hex or decimal string.
    pub r: String,
    /// `s` scalar, `0x`-hex or decimal string.
    pub s: String,
}

impl WireSignature {
    /// Normalizes into fixed-width signature components.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidSignature`] if `v` is not a
    /// recognized recovery id or `r`/`s` do not parse under the
    /// hex-or-decimal contract.
    pub fn decode(&self) -> Result<EcdsaSignature, PaymentError> {
        let v = match self.v {
            0 | 27 => 27,
            1 | 28 => 28,
            _ => return Err(PaymentError::InvalidSignature { recovered: None }),
        };
        let r = parse_word32(&self.r).ok_or(PaymentError::InvalidSignature { recovered: None })?;
        let s = parse_word32(&self.s).ok_or(PaymentError::InvalidSignature { recovered: None })?;
        Ok(EcdsaSignature { v, r, s })
    }
}

/// A normalized ECDSA signature: `v` canonicalized to 27/28, scalars as
/// 32-byte big-endian words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature {
    /// Recovery id, 27 or 28.
    pub v: u8,
    /// `r` scalar.
    pub r: B256,
    /// `s` scalar.
    pub s: B256,
}

/// Parses a numeric string into a 32-byte big-endian word.
///
/// Accepts `0x`-prefixed hexadecimal or plain decimal digits; anything
/// else — including unprefixed hex and empty strings — is rejected.
#[must_use]
pub fn parse_word32(input: &str) -> Option<B256> {
    let value = if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        U256::from_str_radix(hex, 16).ok()?
    } else {
        if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(input, 10).ok()?
    };
    Some(B256::from(value.to_be_bytes::<32>()))
}

/// Parses a wire nonce into exactly 32 bytes.
///
/// Hex nonces must carry all 64 digits — a short hex string is a client
/// bug, and padding it would silently change the signed bytes. Decimal
/// nonces widen to 32 bytes by construction.
///
/// # Errors
///
/// Returns [`PaymentError::MalformedNonce`] with the decoded length on any
/// size or encoding violation.
pub fn parse_nonce(input: &str) -> Result<B256, PaymentError> {
    if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) || hex.len() % 2 != 0 {
            return Err(PaymentError::MalformedNonce { len: 0 });
        }
        if hex.len() != 64 {
            return Err(PaymentError::MalformedNonce { len: hex.len() / 2 });
        }
    }
    parse_word32(input).ok_or(PaymentError::MalformedNonce { len: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn parses_decimal_strings() {
        let word = parse_word32("1500").unwrap();
        assert_eq!(U256::from_be_bytes::<32>(word.0), U256::from(1500u64));
    }

    #[test]
    fn parses_prefixed_hex() {
        let word = parse_word32("0x5dc").unwrap();
        assert_eq!(U256::from_be_bytes::<32>(word.0), U256::from(1500u64));
        assert!(parse_word32(&format!("0x{}", "ab".repeat(32))).is_some());
    }

    #[test]
    fn rejects_everything_else() {
        assert!(parse_word32("").is_none());
        assert!(parse_word32("0x").is_none());
        assert!(parse_word32("deadbeef").is_none()); // hex without prefix
        assert!(parse_word32("12x4").is_none());
        assert!(parse_word32("-15").is_none());
        assert!(parse_word32(&format!("0x{}", "ab".repeat(33))).is_none()); // > 256 bits
    }

    #[test]
    fn nonce_requires_exactly_32_bytes() {
        let full = format!("0x{}", "7e".repeat(32));
        assert!(parse_nonce(&full).is_ok());

        match parse_nonce(&format!("0x{}", "7e".repeat(20))) {
            Err(PaymentError::MalformedNonce { len }) => assert_eq!(len, 20),
            other => panic!("expected MalformedNonce, got {other:?}"),
        }
        assert!(parse_nonce("0xzz").is_err());
    }

    #[test]
    fn signature_normalizes_v() {
        let sig = WireSignature {
            v: 0,
            r: "1".to_owned(),
            s: "1".to_owned(),
        };
        assert_eq!(sig.decode().unwrap().v, 27);

        let sig = WireSignature {
            v: 28,
            r: "1".to_owned(),
            s: "1".to_owned(),
        };
        assert_eq!(sig.decode().unwrap().v, 28);

        let sig = WireSignature {
            v: 2,
            r: "1".to_owned(),
            s: "1".to_owned(),
        };
        assert!(sig.decode().is_err());
    }

    #[test]
    fn authorization_decode_carries_fields() {
        let wire = WireAuthorization {
            from: address!("0x1111111111111111111111111111111111111111"),
            to: address!("0x2222222222222222222222222222222222222222"),
            value: 1500,
            valid_after: 1_700_000_000,
            valid_before: 1_700_003_600,
            nonce: format!("0x{}", "07".repeat(32)),
        };
        let message = wire.decode().unwrap();
        assert_eq!(message.value, U256::from(1500u64));
        assert_eq!(message.nonce, B256::repeat_byte(7));
    }

    #[test]
    fn wire_serde_is_camel_case() {
        let wire = WireAuthorization {
            from: address!("0x1111111111111111111111111111111111111111"),
            to: address!("0x2222222222222222222222222222222222222222"),
            value: 1500,
            valid_after: 1_700_000_000,
            valid_before: 1_700_003_600,
            nonce: "0x00".to_owned(),
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"validAfter\":1700000000"));
        assert!(json.contains("\"validBefore\":1700003600"));
    }
}

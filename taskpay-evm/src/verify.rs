//! Pure signature verification for payment authorizations.
//!
//! No network calls: the verifier hashes the authorization through the
//! typed-data codec, recovers the signing address, and compares it to the
//! claimed payer. The claimed address is an input to the comparison, never
//! to the recovery — a client cannot assert its way past this check.

use alloy_primitives::{Signature, U256};
use taskpay::PaymentError;

use crate::typed_data::{AuthorizationMessage, TokenDomain};
use crate::wire::EcdsaSignature;

/// The secp256k1 group order `n`.
///
/// Scalars at or above `n` (and zero) are not valid signature components;
/// they must be rejected before recovery is attempted.
const SECP256K1_ORDER: U256 = U256::from_limbs([
    0xBFD2_5E8C_D036_4141,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
]);

/// Verifies that `signature` is a valid signature by `message.from` over
/// the typed-data hash of `message` under `domain`.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidSignature`] when a scalar is out of
/// range, recovery fails, or the recovered address differs from the
/// payer. The recovered address is included on the mismatch path for
/// diagnostics.
pub fn verify_authorization(
    message: &AuthorizationMessage,
    signature: &EcdsaSignature,
    domain: &TokenDomain,
) -> Result<(), PaymentError> {
    let r = U256::from_be_bytes::<32>(signature.r.0);
    let s = U256::from_be_bytes::<32>(signature.s.0);
    if r.is_zero() || s.is_zero() || r >= SECP256K1_ORDER || s >= SECP256K1_ORDER {
        return Err(PaymentError::InvalidSignature { recovered: None });
    }

    let hash = message.signing_hash(domain);
    let parsed = Signature::new(r, s, signature.v == 28);
    let recovered = parsed
        .recover_address_from_prehash(&hash)
        .map_err(|_| PaymentError::InvalidSignature { recovered: None })?;

    if recovered == message.from {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature {
            recovered: Some(recovered),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use taskpay::UnixTimestamp;

    fn domain() -> TokenDomain {
        TokenDomain {
            name: "USDC".to_owned(),
            version: "2".to_owned(),
            chain_id: 84532,
            contract: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".parse().unwrap(),
        }
    }

    fn signed_message() -> (AuthorizationMessage, EcdsaSignature) {
        let signer = PrivateKeySigner::random();
        let message = AuthorizationMessage {
            from: signer.address(),
            to: "0x2222222222222222222222222222222222222222".parse().unwrap(),
            value: alloy_primitives::U256::from(1500u64),
            valid_after: UnixTimestamp::from_secs(1_700_000_000),
            valid_before: UnixTimestamp::from_secs(1_700_003_600),
            nonce: B256::repeat_byte(7),
        };
        let signature = signer.sign_hash_sync(&message.signing_hash(&domain())).unwrap();
        let split = EcdsaSignature {
            v: 27 + u8::from(signature.v()),
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
        };
        (message, split)
    }

    #[test]
    fn recovers_the_declared_payer() {
        let (message, signature) = signed_message();
        verify_authorization(&message, &signature, &domain()).unwrap();
    }

    #[test]
    fn rejects_wrong_payer_and_reports_recovered() {
        let (mut message, signature) = signed_message();
        message.from = Address::repeat_byte(0x42);
        match verify_authorization(&message, &signature, &domain()) {
            Err(PaymentError::InvalidSignature { recovered }) => {
                let recovered = recovered.unwrap();
                assert_ne!(recovered, message.from);
            }
            other => panic!("expected InvalidSignature, got {other:?}"),
        }
    }

    #[test]
    fn rejects_any_field_mutation() {
        let (message, signature) = signed_message();

        let mut m = message.clone();
        m.value = alloy_primitives::U256::from(1501u64);
        assert!(verify_authorization(&m, &signature, &domain()).is_err());

        let mut m = message.clone();
        m.nonce = B256::repeat_byte(8);
        assert!(verify_authorization(&m, &signature, &domain()).is_err());

        let mut m = message.clone();
        m.valid_before = m.valid_before + 60;
        assert!(verify_authorization(&m, &signature, &domain()).is_err());

        let mut m = message;
        m.to = Address::repeat_byte(0x99);
        assert!(verify_authorization(&m, &signature, &domain()).is_err());
    }

    #[test]
    fn rejects_any_signature_mutation() {
        let (message, signature) = signed_message();

        let mut sig = signature;
        sig.v = if sig.v == 27 { 28 } else { 27 };
        assert!(verify_authorization(&message, &sig, &domain()).is_err());

        let mut sig = signature;
        let mut r = sig.r.0;
        r[31] ^= 0x01;
        sig.r = B256::from(r);
        assert!(verify_authorization(&message, &sig, &domain()).is_err());

        let mut sig = signature;
        let mut s = sig.s.0;
        s[0] ^= 0x80;
        sig.s = B256::from(s);
        assert!(verify_authorization(&message, &sig, &domain()).is_err());
    }

    #[test]
    fn rejects_out_of_range_scalars_before_recovery() {
        let (message, signature) = signed_message();

        let mut sig = signature;
        sig.r = B256::ZERO;
        assert!(matches!(
            verify_authorization(&message, &sig, &domain()),
            Err(PaymentError::InvalidSignature { recovered: None })
        ));

        let mut sig = signature;
        sig.s = B256::from(SECP256K1_ORDER.to_be_bytes::<32>());
        assert!(matches!(
            verify_authorization(&message, &sig, &domain()),
            Err(PaymentError::InvalidSignature { recovered: None })
        ));

        let mut sig = signature;
        sig.s = B256::repeat_byte(0xff);
        assert!(matches!(
            verify_authorization(&message, &sig, &domain()),
            Err(PaymentError::InvalidSignature { recovered: None })
        ));
    }

    #[test]
    fn rejects_random_single_bit_flips() {
        use rand::RngExt;
        use rand::rng;

        let (message, signature) = signed_message();
        let mut rng = rng();

        for _ in 0..64 {
            let mut sig = signature;
            // Flip one random bit somewhere in r || s, or toggle v.
            let bit: u16 = rng.random_range(0..513);
            if bit == 512 {
                sig.v = if sig.v == 27 { 28 } else { 27 };
            } else if bit < 256 {
                let mut r = sig.r.0;
                r[(bit / 8) as usize] ^= 1 << (bit % 8);
                sig.r = B256::from(r);
            } else {
                let bit = bit - 256;
                let mut s = sig.s.0;
                s[(bit / 8) as usize] ^= 1 << (bit % 8);
                sig.s = B256::from(s);
            }
            assert!(
                verify_authorization(&message, &sig, &domain()).is_err(),
                "mutated signature must not verify: {sig:?}"
            );
        }

        for _ in 0..16 {
            let mut m = message.clone();
            let bit: u16 = rng.random_range(0..64);
            let mut value = m.value;
            value ^= alloy_primitives::U256::from(1u64) << usize::from(bit);
            m.value = value;
            assert!(
                verify_authorization(&m, &signature, &domain()).is_err(),
                "mutated authorization must not verify"
            );
        }
    }

    #[test]
    fn rejects_signature_over_a_different_domain() {
        let (message, signature) = signed_message();
        let mut other = domain();
        other.chain_id = 8453;
        assert!(verify_authorization(&message, &signature, &other).is_err());
    }
}

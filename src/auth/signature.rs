// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet signature verification for the nonce challenge.
//!
//! The frontend asks the wallet to `personal_sign` the message returned by
//! [`sign_in_message`]. The server recovers the signer address from the
//! EIP-191 digest and compares it with the claimed wallet address.

use std::str::FromStr;

use alloy::primitives::{Address, Signature};
use ring::rand::{SecureRandom, SystemRandom};

use super::AuthError;
use crate::models::WalletAddress;

/// The exact text the wallet signs for a given nonce.
pub fn sign_in_message(nonce: u32) -> String {
    format!("I am signing my one-time nonce: {nonce}")
}

/// Draw a fresh, non-zero nonce from the system RNG.
pub fn generate_nonce() -> Result<u32, AuthError> {
    let rng = SystemRandom::new();
    loop {
        let mut bytes = [0u8; 4];
        rng.fill(&mut bytes)
            .map_err(|_| AuthError::InternalError("random number generator failed".into()))?;
        let nonce = u32::from_be_bytes(bytes);
        if nonce != 0 {
            return Ok(nonce);
        }
    }
}

/// Recover the address that produced `signature` over `message`.
pub fn recover_signer(message: &str, signature: &str) -> Result<Address, AuthError> {
    let signature = Signature::from_str(signature).map_err(|_| AuthError::InvalidSignature)?;
    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| AuthError::InvalidSignature)
}

/// Check that `wallet` signed the sign-in message for `nonce`.
pub fn verify_wallet_signature(
    wallet: &WalletAddress,
    nonce: u32,
    signature: &str,
) -> Result<(), AuthError> {
    let claimed = Address::from_str(wallet.as_str()).map_err(|_| AuthError::InvalidSignature)?;
    let recovered = recover_signer(&sign_in_message(nonce), signature)?;

    if recovered == claimed {
        Ok(())
    } else {
        tracing::debug!(
            claimed = %claimed,
            recovered = %recovered,
            "Signature recovered to a different address"
        );
        Err(AuthError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    const KEY_A: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn signer(key: &str) -> PrivateKeySigner {
        key.parse().unwrap()
    }

    fn wallet_of(signer: &PrivateKeySigner) -> WalletAddress {
        WalletAddress::parse(&signer.address().to_string()).unwrap()
    }

    fn sign(signer: &PrivateKeySigner, nonce: u32) -> String {
        let signature = signer
            .sign_message_sync(sign_in_message(nonce).as_bytes())
            .unwrap();
        alloy::hex::encode_prefixed(signature.as_bytes())
    }

    #[test]
    fn message_embeds_nonce() {
        assert_eq!(sign_in_message(42), "I am signing my one-time nonce: 42");
    }

    #[test]
    fn generated_nonces_are_non_zero() {
        for _ in 0..32 {
            assert_ne!(generate_nonce().unwrap(), 0);
        }
    }

    #[test]
    fn signature_from_wallet_key_verifies() {
        let signer = signer(KEY_A);
        let wallet = wallet_of(&signer);
        let signature = sign(&signer, 1234);

        assert!(verify_wallet_signature(&wallet, 1234, &signature).is_ok());
    }

    #[test]
    fn signature_over_other_nonce_is_rejected() {
        let signer = signer(KEY_A);
        let wallet = wallet_of(&signer);
        let signature = sign(&signer, 1234);

        assert!(matches!(
            verify_wallet_signature(&wallet, 4321, &signature),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn signature_from_other_key_is_rejected() {
        let wallet = wallet_of(&signer(KEY_A));
        let signature = sign(&signer(KEY_B), 7);

        assert!(matches!(
            verify_wallet_signature(&wallet, 7, &signature),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let wallet = wallet_of(&signer(KEY_A));
        assert!(matches!(
            verify_wallet_signature(&wallet, 7, "0xdeadbeef"),
            Err(AuthError::InvalidSignature)
        ));
    }
}

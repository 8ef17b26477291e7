//! Address derivation from raw private keys.
//!
//! # Security
//! - Secrets are borrowed for the duration of one call and never stored
//! - Secrets are never logged, formatted into errors, or transmitted
//! - Rejected input yields `None` with no side effects

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;

/// Derives a public address from secret material.
pub trait KeyDerivation: Send + Sync {
    /// `None` when the secret is not in canonical form or not a valid key.
    fn derive(&self, secret: &str) -> Option<Address>;
}

/// secp256k1 derivation: optional `0x` prefix (any case) and exactly 64 hex
/// characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Derivation;

impl Secp256k1Derivation {
    pub const KEY_HEX_LEN: usize = 64;

    fn canonical_hex(secret: &str) -> Option<&str> {
        let hex = secret
            .strip_prefix("0x")
            .or_else(|| secret.strip_prefix("0X"))
            .unwrap_or(secret);
        (hex.len() == Self::KEY_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit())).then_some(hex)
    }
}

impl KeyDerivation for Secp256k1Derivation {
    fn derive(&self, secret: &str) -> Option<Address> {
        let hex = Self::canonical_hex(secret.trim())?;
        let bytes = B256::from_str(hex).ok()?;
        // Zero and out-of-range scalars fail here.
        let signer = PrivateKeySigner::from_bytes(&bytes).ok()?;
        Some(signer.address())
    }
}

//! Address validation and error definitions.

use alloy::primitives::Address;
use std::str::FromStr;
use thiserror::Error;

/// Malformed input. Terminal: never retried, never touches the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid address format")]
    InvalidAddress,

    #[error("Invalid private key format")]
    InvalidSecret,
}

/// Transient provider or transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RPC error from {endpoint}: {message}")]
pub struct NetworkError {
    pub endpoint: String,
    pub message: String,
}

/// Outcome of a failed resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ResolveError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Network(_))
    }
}

/// Parse a `0x`-prefixed 40-hex-digit address.
///
/// Mixed-case input must match its EIP-55 checksum; all-lower and all-upper
/// hex are accepted as unchecksummed.
pub fn parse_address(input: &str) -> Result<Address, ValidationError> {
    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or(ValidationError::InvalidAddress)?;

    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress);
    }

    let address = Address::from_str(hex).map_err(|_| ValidationError::InvalidAddress)?;

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = address.to_checksum(None);
        if checksummed[2..] != *hex {
            return Err(ValidationError::InvalidAddress);
        }
    }

    Ok(address)
}

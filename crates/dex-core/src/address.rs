//! Ledger account addresses.
//!
//! Addresses are opaque 32-byte public keys. Program-owned addresses are
//! derived (see `dex-ledger`), never chosen, and compare by byte value.

use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_program::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

/// Fixed-length ledger address.
///
/// Displays and parses as base58, the ledger's canonical text form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LedgerAddress(Pubkey);

impl LedgerAddress {
    /// Native system program.
    pub const SYSTEM_PROGRAM: Self = Self(solana_program::system_program::ID);

    /// SPL Token program.
    pub const TOKEN_PROGRAM: Self = Self(solana_program::pubkey!(
        "TokenkegQfeZyiNwAJbNbGKPFXCWQBorgpQ5Ti3bY2A"
    ));

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(Pubkey::new_from_array(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn as_pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl From<Pubkey> for LedgerAddress {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }
}

impl From<LedgerAddress> for Pubkey {
    fn from(address: LedgerAddress) -> Self {
        address.0
    }
}

impl From<[u8; 32]> for LedgerAddress {
    fn from(bytes: [u8; 32]) -> Self {
        Self::new(bytes)
    }
}

impl FromStr for LedgerAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidAddress(format!("{s}: {e}")))
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerAddress({})", self.0)
    }
}

impl Serialize for LedgerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LedgerAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

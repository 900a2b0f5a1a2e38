//! Program-derived address computation.
//!
//! The validity predicate belongs to the ledger's addressing scheme and is
//! hidden behind [`AddressScheme`]. [`AddressDeriver`] only owns the search:
//! the first nonce, scanned from 255 downward, for which the scheme yields an
//! address.

use crate::error::{LedgerError, LedgerResult};
use dex_core::LedgerAddress;
use solana_program::pubkey::Pubkey;

/// Seed of the singleton `DexState` account.
pub const DEX_STATE_SEED: &[u8] = b"dex_state";

/// Ledger rule mapping (seeds, program) to an address.
pub trait AddressScheme: Send + Sync {
    /// Returns `None` when the candidate is not a valid program address
    /// (on-curve or otherwise reserved).
    fn create_address(&self, seeds: &[&[u8]], program_id: &LedgerAddress)
        -> Option<LedgerAddress>;
}

/// The ledger's program-derived-address rule (off-curve SHA-256 candidates).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramAddressScheme;

impl AddressScheme for ProgramAddressScheme {
    fn create_address(
        &self,
        seeds: &[&[u8]],
        program_id: &LedgerAddress,
    ) -> Option<LedgerAddress> {
        Pubkey::create_program_address(seeds, program_id.as_pubkey())
            .ok()
            .map(LedgerAddress::from)
    }
}

/// Deterministic address derivation.
#[derive(Debug, Clone, Default)]
pub struct AddressDeriver<S = ProgramAddressScheme> {
    scheme: S,
}

impl AddressDeriver<ProgramAddressScheme> {
    pub fn new() -> Self {
        Self {
            scheme: ProgramAddressScheme,
        }
    }
}

impl<S: AddressScheme> AddressDeriver<S> {
    pub fn with_scheme(scheme: S) -> Self {
        Self { scheme }
    }

    /// Derive the address for `seed` under `program_id`.
    ///
    /// # Errors
    /// `LedgerError::DerivationExhausted` if no nonce in `0..=255` is valid.
    pub fn derive(
        &self,
        seed: &[u8],
        program_id: &LedgerAddress,
    ) -> LedgerResult<(LedgerAddress, u8)> {
        for nonce in (0..=u8::MAX).rev() {
            let bump = [nonce];
            if let Some(address) = self.scheme.create_address(&[seed, &bump], program_id) {
                return Ok((address, nonce));
            }
        }
        Err(LedgerError::DerivationExhausted)
    }

    /// Address of the singleton `DexState` account.
    pub fn dex_state(&self, program_id: &LedgerAddress) -> LedgerResult<LedgerAddress> {
        self.derive(DEX_STATE_SEED, program_id).map(|(address, _)| address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "4YSCYC56LXXdMNtLvkigBXK2keE6M9zVaAjYvPCrJbW8";

    struct RejectAll;

    impl AddressScheme for RejectAll {
        fn create_address(&self, _: &[&[u8]], _: &LedgerAddress) -> Option<LedgerAddress> {
            None
        }
    }

    struct AcceptBelow(u8);

    impl AddressScheme for AcceptBelow {
        fn create_address(&self, seeds: &[&[u8]], _: &LedgerAddress) -> Option<LedgerAddress> {
            let nonce = seeds.last()?.first().copied()?;
            (nonce < self.0).then(|| LedgerAddress::new([nonce; 32]))
        }
    }

    #[test]
    fn test_derive_is_deterministic() {
        let program: LedgerAddress = PROGRAM.parse().unwrap();
        let deriver = AddressDeriver::new();
        let first = deriver.derive(DEX_STATE_SEED, &program).unwrap();
        for _ in 0..5 {
            assert_eq!(deriver.derive(DEX_STATE_SEED, &program).unwrap(), first);
        }
    }

    #[test]
    fn test_derive_matches_ledger_search() {
        let program: LedgerAddress = PROGRAM.parse().unwrap();
        let (expected, bump) =
            Pubkey::find_program_address(&[DEX_STATE_SEED], program.as_pubkey());
        let (address, nonce) = AddressDeriver::new()
            .derive(DEX_STATE_SEED, &program)
            .unwrap();
        assert_eq!(address, LedgerAddress::from(expected));
        assert_eq!(nonce, bump);
    }

    #[test]
    fn test_different_programs_give_different_addresses() {
        let a = AddressDeriver::new()
            .dex_state(&LedgerAddress::new([1; 32]))
            .unwrap();
        let b = AddressDeriver::new()
            .dex_state(&LedgerAddress::new([2; 32]))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_scan_starts_at_highest_nonce() {
        let deriver = AddressDeriver::with_scheme(AcceptBelow(200));
        let (address, nonce) = deriver.derive(b"seed", &LedgerAddress::default()).unwrap();
        assert_eq!(nonce, 199);
        assert_eq!(address, LedgerAddress::new([199; 32]));
    }

    #[test]
    fn test_exhausted_search_space() {
        let deriver = AddressDeriver::with_scheme(RejectAll);
        let err = deriver
            .derive(DEX_STATE_SEED, &LedgerAddress::default())
            .unwrap_err();
        assert_eq!(err, LedgerError::DerivationExhausted);
    }
}

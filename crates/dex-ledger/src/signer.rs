//! Signing provider seam.
//!
//! The client never holds key material. A wallet (or a keypair-backed
//! adapter in the CLI) implements [`TransactionSigner`] and turns an encoded
//! instruction into a signed, serialized transaction.

use std::sync::Arc;

use dex_core::LedgerAddress;
use solana_program::hash::Hash;
use thiserror::Error;

use crate::instruction::ProgramInstruction;
use crate::transport::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("Signing request rejected by wallet: {0}")]
    Rejected(String),

    #[error("Transaction build failed: {0}")]
    Build(String),
}

/// Signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// First signature, base58. Identifies the transaction on the ledger.
    pub signature: String,
    /// Wire-format transaction bytes.
    pub wire: Vec<u8>,
}

/// External signing provider.
pub trait TransactionSigner: Send + Sync {
    /// Public identity of the signer (fee payer and instruction signer).
    fn identity(&self) -> LedgerAddress;

    /// Sign a single-instruction transaction against `recent_blockhash`.
    fn sign<'a>(
        &'a self,
        instruction: &'a ProgramInstruction,
        recent_blockhash: Hash,
    ) -> BoxFuture<'a, Result<SignedTransaction, SignerError>>;
}

/// Arc wrapper for signer trait objects.
pub type DynSigner = Arc<dyn TransactionSigner>;

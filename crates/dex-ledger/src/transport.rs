//! Transport trait for reaching the ledger.
//!
//! Provides a trait-based abstraction over the network client, allowing for:
//! - Dependency injection for testing (`MockLedger`)
//! - Separation of signing from transport
//! - Alternative backends (JSON-RPC over HTTP today)

use std::pin::Pin;
use std::sync::Arc;

use dex_core::LedgerAddress;

use crate::error::LedgerResult;
use crate::instruction::ProgramInstruction;
use crate::signer::TransactionSigner;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Proof that a submitted mutation reached finality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Transaction signature (base58).
    pub signature: String,
    /// Slot the transaction was finalized in, if reported.
    pub slot: Option<u64>,
}

/// Request/response access to the ledger.
pub trait LedgerTransport: Send + Sync {
    /// Sign and submit `instruction`, resolving once the ledger reports
    /// finality for it.
    ///
    /// # Errors
    /// - `SimulationRejected`: refused before (or without) any state change
    /// - `ConfirmationTimeout`: submitted, finality not observed in time
    /// - `NetworkError`: transport failure
    /// - `Signing`: the signer refused or failed
    fn submit<'a>(
        &'a self,
        instruction: &'a ProgramInstruction,
        signer: &'a dyn TransactionSigner,
    ) -> BoxFuture<'a, LedgerResult<Confirmation>>;

    /// Read raw account data.
    ///
    /// # Errors
    /// `AccountNotFound` when the address has no ledger-side record.
    fn get_account<'a>(
        &'a self,
        address: &'a LedgerAddress,
    ) -> BoxFuture<'a, LedgerResult<Vec<u8>>>;
}

/// Arc wrapper for transport trait objects.
pub type DynTransport = Arc<dyn LedgerTransport>;

//! Ledger gateway for the order-book program.
//!
//! # Key Components
//!
//! - [`AddressDeriver`]: deterministic program-derived addresses
//! - [`DexInstruction`]: closed set of remote methods with typed account roles
//! - [`codec`]: Anchor discriminators, borsh arguments and `DexState` decoding
//! - [`LedgerTransport`]: submit/read seam, with [`RpcTransport`] (JSON-RPC over HTTP)
//!   and [`MockLedger`] (in-memory program emulation)
//! - [`LedgerGateway`]: typed call/fetch façade that classifies failures
//! - [`ProgramSchema`]: interface definition used to check account roles at startup

pub mod codec;
pub mod derive;
pub mod error;
pub mod gateway;
pub mod instruction;
pub mod mock;
pub mod rpc;
pub mod schema;
pub mod signer;
pub mod transport;

pub use derive::{AddressDeriver, AddressScheme, ProgramAddressScheme, DEX_STATE_SEED};
pub use error::{LedgerError, LedgerResult, Rejection};
pub use gateway::LedgerGateway;
pub use instruction::{
    AccountRef, DexInstruction, DexMethod, InitializeAccounts, MatchAccounts, OrderAccounts,
    ProgramInstruction,
};
pub use mock::{MockLedger, MockSigner};
pub use rpc::{RpcConfig, RpcTransport};
pub use schema::ProgramSchema;
pub use signer::{DynSigner, SignedTransaction, SignerError, TransactionSigner};
pub use transport::{BoxFuture, Confirmation, DynTransport, LedgerTransport};

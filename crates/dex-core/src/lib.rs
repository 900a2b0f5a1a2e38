//! Core domain types for the order-book ledger client.
//!
//! This crate provides the types shared by every layer of the client:
//! - `LedgerAddress`: 32-byte account/program identifier
//! - `OrderSide`, `OrderId`, `Order`: order-book entries as stored on the ledger
//! - `DexState`, `DexView`: the mirrored singleton state and its published snapshot

pub mod address;
pub mod error;
pub mod order;
pub mod state;

pub use address::LedgerAddress;
pub use error::{CoreError, Result};
pub use order::{validate_order_params, Order, OrderId, OrderSide};
pub use state::{DexSnapshot, DexState, DexView};

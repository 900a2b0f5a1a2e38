//! Ledger error taxonomy.
//!
//! Transports report raw failures as `NetworkError`, `SimulationRejected`,
//! `ConfirmationTimeout` or `AccountNotFound`. The gateway narrows
//! `SimulationRejected` into `AlreadyInitialized` / `StaleOrderReference`
//! where the method makes the meaning unambiguous.

use dex_core::{LedgerAddress, OrderId};
use std::fmt;
use thiserror::Error;

/// Details of a mutation the ledger refused.
///
/// The ledger state is unchanged when this is reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rejection {
    /// Program-specific error code (`Custom(n)`), if the ledger gave one.
    pub custom_code: Option<u32>,
    /// Ledger-provided error description.
    pub message: String,
    /// Program logs captured during simulation.
    pub logs: Vec<String>,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.custom_code = Some(code);
        self
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Build from a ledger `TransactionError` JSON value.
    ///
    /// Extracts `n` from `{"InstructionError":[idx,{"Custom":n}]}`.
    pub fn from_ledger_err(err: &serde_json::Value, logs: Vec<String>) -> Self {
        let custom_code = err
            .get("InstructionError")
            .and_then(|ie| ie.get(1))
            .and_then(|detail| detail.get("Custom"))
            .and_then(|code| code.as_u64())
            .and_then(|code| u32::try_from(code).ok());

        Self {
            custom_code,
            message: err.to_string(),
            logs,
        }
    }

    pub fn logs_contain(&self, needle: &str) -> bool {
        self.message.contains(needle) || self.logs.iter().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.custom_code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("No valid nonce found for seed within the search space")]
    DerivationExhausted,

    #[error("Simulation rejected: {0}")]
    SimulationRejected(Rejection),

    #[error("DEX state already initialized")]
    AlreadyInitialized,

    #[error("Order {0} is no longer on the book")]
    StaleOrderReference(OrderId),

    #[error("Order {order_id} belongs to {owner}")]
    NotOrderOwner {
        order_id: OrderId,
        owner: LedgerAddress,
    },

    #[error("Confirmation timeout after {waited_ms}ms (signature {signature})")]
    ConfirmationTimeout { signature: String, waited_ms: u64 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Account not found: {0}")]
    AccountNotFound(LedgerAddress),

    #[error("Account decode error: {0}")]
    Decode(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Interface definition mismatch: {0}")]
    Schema(String),
}

impl LedgerError {
    /// Safe for the caller to retry after (for stale references) a refresh.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::StaleOrderReference(_))
    }

    /// True for every refusal, including the narrowed specialisations.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SimulationRejected(_)
                | Self::AlreadyInitialized
                | Self::StaleOrderReference(_)
                | Self::NotOrderOwner { .. }
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

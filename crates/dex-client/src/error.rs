//! Client error taxonomy.

use std::fmt;

use dex_core::CoreError;
use dex_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Another mutation is already in flight")]
    OperationInProgress,

    #[error("Session lost before confirmation")]
    SessionLost,

    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] CoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Stable, payload-free classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoActiveSession,
    OperationInProgress,
    SessionLost,
    InvalidOrder,
    Config,
    DerivationExhausted,
    SimulationRejected,
    AlreadyInitialized,
    StaleOrderReference,
    NotOrderOwner,
    ConfirmationTimeout,
    NetworkError,
    AccountNotFound,
    Decode,
    Signing,
    Schema,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "no_active_session",
            Self::OperationInProgress => "operation_in_progress",
            Self::SessionLost => "session_lost",
            Self::InvalidOrder => "invalid_order",
            Self::Config => "config",
            Self::DerivationExhausted => "derivation_exhausted",
            Self::SimulationRejected => "simulation_rejected",
            Self::AlreadyInitialized => "already_initialized",
            Self::StaleOrderReference => "stale_order_reference",
            Self::NotOrderOwner => "not_order_owner",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::NetworkError => "network_error",
            Self::AccountNotFound => "account_not_found",
            Self::Decode => "decode",
            Self::Signing => "signing",
            Self::Schema => "schema",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&LedgerError> for ErrorKind {
    fn from(error: &LedgerError) -> Self {
        match error {
            LedgerError::DerivationExhausted => Self::DerivationExhausted,
            LedgerError::SimulationRejected(_) => Self::SimulationRejected,
            LedgerError::AlreadyInitialized => Self::AlreadyInitialized,
            LedgerError::StaleOrderReference(_) => Self::StaleOrderReference,
            LedgerError::NotOrderOwner { .. } => Self::NotOrderOwner,
            LedgerError::ConfirmationTimeout { .. } => Self::ConfirmationTimeout,
            LedgerError::NetworkError(_) => Self::NetworkError,
            LedgerError::AccountNotFound(_) => Self::AccountNotFound,
            LedgerError::Decode(_) => Self::Decode,
            LedgerError::Signing(_) => Self::Signing,
            LedgerError::Schema(_) => Self::Schema,
        }
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoActiveSession => ErrorKind::NoActiveSession,
            Self::OperationInProgress => ErrorKind::OperationInProgress,
            Self::SessionLost => ErrorKind::SessionLost,
            Self::InvalidOrder(_) => ErrorKind::InvalidOrder,
            Self::Config(_) => ErrorKind::Config,
            Self::Ledger(e) => ErrorKind::from(e),
        }
    }

    /// Network failures and stale references; the latter after a refresh.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether the caller must reconnect before any further mutation.
    #[must_use]
    pub fn requires_session(&self) -> bool {
        matches!(self, Self::NoActiveSession | Self::SessionLost)
    }

    /// The mutation may or may not have landed; only a fresh snapshot tells.
    #[must_use]
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            Self::SessionLost | Self::Ledger(LedgerError::ConfirmationTimeout { .. })
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

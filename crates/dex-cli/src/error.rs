//! CLI error types.

use dex_client::ClientError;
use dex_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key error: {0}")]
    Key(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dex_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LedgerError> for CliError {
    fn from(error: LedgerError) -> Self {
        Self::Client(ClientError::Ledger(error))
    }
}

impl CliError {
    /// One-line guidance for the operator, if any applies.
    pub fn hint(&self) -> Option<&'static str> {
        let Self::Client(error) = self else {
            return None;
        };
        if error.outcome_unknown() {
            return Some("the transaction may have landed; run `dex state` before retrying");
        }
        if error.requires_session() {
            return Some("check keypair_path and reconnect");
        }
        if error.is_retryable() {
            return Some("safe to retry (refresh first for stale orders)");
        }
        None
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::OrderId;

    #[test]
    fn test_hints() {
        let stale: CliError = LedgerError::StaleOrderReference(OrderId(1)).into();
        assert!(stale.hint().unwrap().contains("retry"));

        let lost = CliError::Client(ClientError::SessionLost);
        assert!(lost.hint().unwrap().contains("may have landed"));

        let rejected: CliError = LedgerError::AlreadyInitialized.into();
        assert!(rejected.hint().is_none());
        assert!(CliError::Config("x".into()).hint().is_none());
    }
}

//! Deployment addresses the pipeline builds instructions from.

use dex_core::LedgerAddress;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deployed order-book program.
    pub program_id: LedgerAddress,
    /// Token account debited/credited for the session user.
    pub user_token_account: LedgerAddress,
    /// Token account held by the exchange.
    pub dex_token_account: LedgerAddress,
    #[serde(default = "default_token_program")]
    pub token_program: LedgerAddress,
}

fn default_token_program() -> LedgerAddress {
    LedgerAddress::TOKEN_PROGRAM
}

impl ClientConfig {
    pub fn new(
        program_id: LedgerAddress,
        user_token_account: LedgerAddress,
        dex_token_account: LedgerAddress,
    ) -> Self {
        Self {
            program_id,
            user_token_account,
            dex_token_account,
            token_program: default_token_program(),
        }
    }

    /// # Errors
    /// `ClientError::Config` when token accounts coincide or an address
    /// is the all-zero default.
    pub fn validate(&self) -> ClientResult<()> {
        let zero = LedgerAddress::default();
        for (name, address) in [
            ("program_id", &self.program_id),
            ("user_token_account", &self.user_token_account),
            ("dex_token_account", &self.dex_token_account),
            ("token_program", &self.token_program),
        ] {
            if *address == zero {
                return Err(ClientError::Config(format!("{name} is not set")));
            }
        }
        if self.user_token_account == self.dex_token_account {
            return Err(ClientError::Config(
                "user_token_account and dex_token_account must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new(
            LedgerAddress::new([9; 32]),
            LedgerAddress::new([3; 32]),
            LedgerAddress::new([4; 32]),
        )
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
        assert_eq!(config().token_program, LedgerAddress::TOKEN_PROGRAM);
    }

    #[test]
    fn test_rejects_shared_token_account() {
        let mut cfg = config();
        cfg.dex_token_account = cfg.user_token_account;
        assert!(matches!(cfg.validate(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_rejects_unset_program() {
        let mut cfg = config();
        cfg.program_id = LedgerAddress::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("program_id"));
    }

    #[test]
    fn test_token_program_defaults_when_omitted() {
        let cfg: ClientConfig = toml::from_str(
            r#"
            program_id = "TokenkegQfeZyiNwAJbNbGKPFXCWQBorgpQ5Ti3bY2A"
            user_token_account = "11111111111111111111111111111112"
            dex_token_account = "SysvarC1ock11111111111111111111111111111111"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.token_program, LedgerAddress::TOKEN_PROGRAM);
        assert!(cfg.validate().is_ok());
    }
}

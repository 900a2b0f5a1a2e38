//! Configuration file for the `dex` binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dex_client::ClientConfig;
use dex_core::LedgerAddress;
use dex_ledger::RpcConfig;
use dex_telemetry::{LogFormat, LoggingOptions};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};
use crate::keypair::KeySource;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DEX_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info,dex=debug`; `RUST_LOG` wins when unset.
    #[serde(default)]
    pub filter: Option<String>,
    /// `pretty`, `compact` or `json`.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    pub program_id: LedgerAddress,
    /// Solana JSON keypair file. Ignored when `keypair_env` is set.
    #[serde(default)]
    pub keypair_path: Option<PathBuf>,
    /// Environment variable holding the keypair JSON.
    #[serde(default)]
    pub keypair_env: Option<String>,
    /// Public key the loaded keypair must have.
    #[serde(default)]
    pub expected_identity: Option<LedgerAddress>,
    pub user_token_account: LedgerAddress,
    pub dex_token_account: LedgerAddress,
    #[serde(default = "default_token_program")]
    pub token_program: LedgerAddress,
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Anchor IDL checked against the client's methods at startup.
    #[serde(default)]
    pub idl_path: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8899".to_string()
}

fn default_token_program() -> LedgerAddress {
    LedgerAddress::TOKEN_PROGRAM
}

fn default_confirm_timeout_ms() -> u64 {
    60_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// Relative `keypair_path` and `idl_path` are resolved against the
    /// directory holding the file, not the working directory.
    pub fn from_file(path: impl AsRef<Path>) -> CliResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("Failed to parse config: {e}")))?;
        config.anchor_paths(path.parent().unwrap_or_else(|| Path::new("")));
        config.validate()?;
        Ok(config)
    }

    fn anchor_paths(&mut self, base: &Path) {
        for path in [&mut self.keypair_path, &mut self.idl_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Config path: CLI arg > `DEX_CONFIG` > default.
    pub fn resolve_path(arg: Option<String>) -> String {
        arg.or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(CliError::Config("rpc_url is empty".to_string()));
        }
        for (name, value) in [
            ("confirm_timeout_ms", self.confirm_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(CliError::Config(format!("{name} must be positive")));
            }
        }
        if self.poll_interval_ms > self.confirm_timeout_ms {
            return Err(CliError::Config(
                "poll_interval_ms exceeds confirm_timeout_ms".to_string(),
            ));
        }
        if self.keypair_path.is_none() && self.keypair_env.is_none() {
            return Err(CliError::Config(
                "one of keypair_path or keypair_env is required".to_string(),
            ));
        }
        self.client_config().validate()?;
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            program_id: self.program_id,
            user_token_account: self.user_token_account,
            dex_token_account: self.dex_token_account,
            token_program: self.token_program,
        }
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            url: self.rpc_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            confirm_timeout: Duration::from_millis(self.confirm_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn key_source(&self) -> CliResult<KeySource> {
        match (&self.keypair_env, &self.keypair_path) {
            (Some(var_name), _) => Ok(KeySource::EnvVar {
                var_name: var_name.clone(),
            }),
            (None, Some(path)) => Ok(KeySource::File { path: path.clone() }),
            (None, None) => Err(CliError::Config("no keypair configured".to_string())),
        }
    }

    pub fn logging_options(&self) -> CliResult<LoggingOptions> {
        let format = self
            .logging
            .format
            .as_deref()
            .map(str::parse::<LogFormat>)
            .transpose()?;
        Ok(LoggingOptions {
            filter: self.logging.filter.clone(),
            format,
        })
    }
}

//! `dex` command-line client.
//!
//! Wires configuration, a keypair-backed signer and the JSON-RPC transport
//! into an `OrderLifecycleController`, then runs one command against it.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod keypair;
pub mod render;

pub use app::App;
pub use cli::{Cli, Command};
pub use config::AppConfig;
pub use error::{CliError, CliResult};
pub use keypair::{KeySource, KeypairSigner};

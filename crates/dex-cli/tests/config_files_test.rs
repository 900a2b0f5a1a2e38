//! The shipped configuration files load and agree with the client.

use std::path::PathBuf;

use dex_cli::AppConfig;
use dex_ledger::ProgramSchema;

fn workspace_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

#[test]
fn test_default_config_loads() {
    let config = AppConfig::from_file(workspace_file("default.toml")).unwrap();
    assert_eq!(config.confirm_timeout_ms, 60_000);
    // Relative paths in the shipped file resolve next to it, whatever the
    // working directory of the test run.
    let idl = config.idl_path.clone().expect("idl_path set");
    assert!(idl.is_file(), "{} should exist", idl.display());
    assert_eq!(idl.file_name().unwrap(), "idl.json");
    assert!(config.client_config().validate().is_ok());
}

#[test]
fn test_shipped_idl_matches_methods() {
    let schema = ProgramSchema::from_file(workspace_file("idl.json")).unwrap();
    assert_eq!(schema.name, "solana_dex");
    schema.check_all().unwrap();
}

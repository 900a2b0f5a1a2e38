//! Interface definition document (Anchor IDL).
//!
//! The document is loaded by the embedding application and handed to the
//! gateway, which checks it against the compiled-in method set once at
//! startup. Only names and signer flags are compared; argument types are
//! fixed by the codec.

use std::path::Path;

use serde::Deserialize;

use crate::error::{LedgerError, LedgerResult};
use crate::instruction::DexMethod;

#[derive(Debug, Clone, Deserialize)]
pub struct ProgramSchema {
    #[serde(default)]
    pub version: Option<String>,
    pub name: String,
    pub instructions: Vec<IdlInstruction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default)]
    pub accounts: Vec<IdlAccount>,
    #[serde(default)]
    pub args: Vec<IdlArg>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlAccount {
    pub name: String,
    #[serde(default)]
    pub is_mut: bool,
    #[serde(default)]
    pub is_signer: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlArg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: serde_json::Value,
}

impl ProgramSchema {
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Schema(format!("invalid IDL: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Schema(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    pub fn instruction(&self, method: DexMethod) -> Option<&IdlInstruction> {
        self.instructions
            .iter()
            .find(|i| i.name == method.idl_name() || i.name == method.name())
    }

    /// Check one method's account roles and argument list.
    pub fn check_method(&self, method: DexMethod) -> LedgerResult<()> {
        let instruction = self.instruction(method).ok_or_else(|| {
            LedgerError::Schema(format!("method {} missing from {}", method.idl_name(), self.name))
        })?;

        let declared: Vec<&str> = instruction.accounts.iter().map(|a| a.name.as_str()).collect();
        if declared != method.account_roles() {
            return Err(LedgerError::Schema(format!(
                "{}: account roles {declared:?} != expected {:?}",
                method.idl_name(),
                method.account_roles()
            )));
        }

        let signers: Vec<&str> = instruction
            .accounts
            .iter()
            .filter(|a| a.is_signer)
            .map(|a| a.name.as_str())
            .collect();
        if signers.len() != 1 {
            return Err(LedgerError::Schema(format!(
                "{}: expected exactly one signer, found {signers:?}",
                method.idl_name()
            )));
        }

        let args: Vec<&str> = instruction.args.iter().map(|a| a.name.as_str()).collect();
        if args != method.arg_names() {
            return Err(LedgerError::Schema(format!(
                "{}: args {args:?} != expected {:?}",
                method.idl_name(),
                method.arg_names()
            )));
        }
        Ok(())
    }

    /// Check every method the client can call.
    pub fn check_all(&self) -> LedgerResult<()> {
        DexMethod::ALL
            .into_iter()
            .try_for_each(|method| self.check_method(method))
    }
}

//! Keypair-backed transaction signer.
//!
//! Reads a Solana JSON keypair (an array of 64 bytes) from a file or an
//! environment variable. Secret bytes are zeroized after the keypair is
//! built; never log them.

use std::fmt;
use std::path::PathBuf;

use dex_core::LedgerAddress;
use dex_ledger::{
    BoxFuture, ProgramInstruction, SignedTransaction, SignerError, TransactionSigner,
};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use zeroize::Zeroizing;

use crate::error::{CliError, CliResult};

/// Where the keypair JSON comes from.
#[derive(Debug, Clone)]
pub enum KeySource {
    EnvVar { var_name: String },
    File { path: PathBuf },
}

pub struct KeypairSigner {
    keypair: Keypair,
    identity: LedgerAddress,
}

impl KeypairSigner {
    /// Load the keypair and, if given, check it is `expected`.
    pub fn load(source: &KeySource, expected: Option<LedgerAddress>) -> CliResult<Self> {
        let json: Zeroizing<String> = match source {
            KeySource::EnvVar { var_name } => Zeroizing::new(
                std::env::var(var_name)
                    .map_err(|_| CliError::Key(format!("{var_name} is not set")))?,
            ),
            KeySource::File { path } => Zeroizing::new(std::fs::read_to_string(path).map_err(
                |e| CliError::Key(format!("Failed to read {}: {e}", path.display())),
            )?),
        };
        let signer = Self::from_json(&json)?;

        if let Some(expected) = expected {
            if signer.identity != expected {
                return Err(CliError::Key(format!(
                    "keypair is {} but {expected} was expected",
                    signer.identity
                )));
            }
        }
        Ok(signer)
    }

    /// Parse the `[u8; 64]` JSON array form.
    pub fn from_json(json: &str) -> CliResult<Self> {
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_str(json.trim())
                .map_err(|e| CliError::Key(format!("Invalid keypair JSON: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> CliResult<Self> {
        let keypair =
            Keypair::from_bytes(bytes).map_err(|e| CliError::Key(format!("Invalid keypair: {e}")))?;
        let identity = LedgerAddress::from(keypair.pubkey());
        Ok(Self { keypair, identity })
    }

    fn build(
        &self,
        instruction: &ProgramInstruction,
        recent_blockhash: Hash,
    ) -> Result<SignedTransaction, SignerError> {
        let accounts = instruction
            .accounts
            .iter()
            .map(|account| {
                let pubkey = *account.address.as_pubkey();
                if account.is_writable {
                    AccountMeta::new(pubkey, account.is_signer)
                } else {
                    AccountMeta::new_readonly(pubkey, account.is_signer)
                }
            })
            .collect();
        let instruction = Instruction {
            program_id: *instruction.program_id.as_pubkey(),
            accounts,
            data: instruction.data.clone(),
        };

        let payer = self.keypair.pubkey();
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&payer),
            &[&self.keypair],
            recent_blockhash,
        );
        let signature = transaction
            .signatures
            .first()
            .ok_or_else(|| SignerError::Build("transaction has no signature".to_string()))?
            .to_string();
        let wire =
            bincode::serialize(&transaction).map_err(|e| SignerError::Build(e.to_string()))?;
        Ok(SignedTransaction { signature, wire })
    }
}

impl fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for KeypairSigner {
    fn identity(&self) -> LedgerAddress {
        self.identity
    }

    fn sign<'a>(
        &'a self,
        instruction: &'a ProgramInstruction,
        recent_blockhash: Hash,
    ) -> BoxFuture<'a, Result<SignedTransaction, SignerError>> {
        Box::pin(async move { self.build(instruction, recent_blockhash) })
    }
}

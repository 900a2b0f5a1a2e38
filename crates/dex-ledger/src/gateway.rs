//! Typed façade over the ledger transport.
//!
//! `call` submits one of the closed set of program methods and resolves at
//! finality; `fetch` reads and decodes the state account. Refusals are
//! narrowed here, where the method is known:
//! - `initialize` refused because the account exists → `AlreadyInitialized`
//! - `cancel_order` refused with `OrderNotFound` → `StaleOrderReference` when
//!   the order is gone, `NotOrderOwner` when it rests under another owner

use dex_core::{DexState, LedgerAddress, OrderId};
use tracing::{debug, info, warn};

use crate::codec::{self, ACCOUNT_IN_USE_CODE, ORDER_NOT_FOUND_CODE};
use crate::error::{LedgerError, LedgerResult, Rejection};
use crate::instruction::{DexInstruction, OrderAccounts};
use crate::schema::ProgramSchema;
use crate::signer::TransactionSigner;
use crate::transport::{Confirmation, DynTransport};

pub struct LedgerGateway {
    transport: DynTransport,
    program_id: LedgerAddress,
}

impl LedgerGateway {
    pub fn new(transport: DynTransport, program_id: LedgerAddress) -> Self {
        Self {
            transport,
            program_id,
        }
    }

    /// Check the interface definition against the compiled-in methods.
    ///
    /// # Errors
    /// `LedgerError::Schema` on any missing method or account-role mismatch.
    pub fn with_schema(self, schema: &ProgramSchema) -> LedgerResult<Self> {
        schema.check_all()?;
        info!(
            program = %schema.name,
            version = ?schema.version,
            "Interface definition matches client methods"
        );
        Ok(self)
    }

    /// Submit a mutation and wait for finality.
    pub async fn call(
        &self,
        instruction: &DexInstruction,
        signer: &dyn TransactionSigner,
    ) -> LedgerResult<Confirmation> {
        let method = instruction.method();
        let encoded = instruction.to_program_instruction(self.program_id)?;

        let identity = signer.identity();
        if encoded.signers().any(|s| *s != identity) {
            return Err(LedgerError::Signing(format!(
                "{method}: instruction signer does not match session identity {identity}"
            )));
        }

        debug!(%method, accounts = encoded.accounts.len(), "Submitting instruction");
        match self.transport.submit(&encoded, signer).await {
            Ok(confirmation) => Ok(confirmation),
            Err(error) => {
                let classified = match (classify(instruction, error), instruction) {
                    (
                        LedgerError::StaleOrderReference(order_id),
                        DexInstruction::CancelOrder { accounts, .. },
                    ) => self.narrow_order_not_found(accounts, order_id).await,
                    (classified, _) => classified,
                };
                warn!(%method, error = %classified, "Instruction failed");
                Err(classified)
            }
        }
    }

    /// Read and decode the state account at `address`.
    pub async fn fetch(&self, address: &LedgerAddress) -> LedgerResult<DexState> {
        let data = self.transport.get_account(address).await?;
        codec::decode_dex_state(&data)
    }

    /// The program answers `OrderNotFound` for foreign orders too. Re-read
    /// the book so an order still resting under another owner is not
    /// reported as stale.
    async fn narrow_order_not_found(
        &self,
        accounts: &OrderAccounts,
        order_id: OrderId,
    ) -> LedgerError {
        match self.fetch(&accounts.dex_state).await {
            Ok(state) => match state.order(order_id) {
                Some(order) if !order.is_owned_by(&accounts.user) => LedgerError::NotOrderOwner {
                    order_id,
                    owner: order.owner,
                },
                _ => LedgerError::StaleOrderReference(order_id),
            },
            Err(error) => {
                debug!(%order_id, %error, "State re-read after OrderNotFound failed");
                LedgerError::StaleOrderReference(order_id)
            }
        }
    }
}

fn classify(instruction: &DexInstruction, error: LedgerError) -> LedgerError {
    let LedgerError::SimulationRejected(rejection) = error else {
        return error;
    };
    match instruction {
        DexInstruction::Initialize(_) if is_account_in_use(&rejection) => {
            LedgerError::AlreadyInitialized
        }
        DexInstruction::CancelOrder { order_id, .. }
            if rejection.custom_code == Some(ORDER_NOT_FOUND_CODE) =>
        {
            LedgerError::StaleOrderReference(*order_id)
        }
        _ => LedgerError::SimulationRejected(rejection),
    }
}

fn is_account_in_use(rejection: &Rejection) -> bool {
    rejection.custom_code == Some(ACCOUNT_IN_USE_CODE) || rejection.logs_contain("already in use")
}

//! Mutation pipeline.
//!
//! Every mutation runs the same skeleton:
//! 1. require a connected session (`NoActiveSession`)
//! 2. derive the `dex_state` address from the program id
//! 3. build the method's account set around the session identity
//! 4. submit and wait for finality, racing against session loss
//! 5. on success, refresh the mirrored state exactly once
//!
//! Nothing is retried. A confirmation timeout forces one refresh before the
//! timeout is reported, since the mutation may have landed.

use std::sync::Arc;

use dex_core::{validate_order_params, DexView, LedgerAddress, OrderId, OrderSide};
use dex_ledger::{
    AddressDeriver, Confirmation, DexInstruction, DexMethod, InitializeAccounts, LedgerError,
    LedgerGateway, MatchAccounts, OrderAccounts,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{ActiveSession, SessionContext};
use crate::sync::StateSynchronizer;

/// Result of a confirmed mutation.
#[derive(Debug, Clone)]
pub struct MutationReceipt {
    pub method: DexMethod,
    pub confirmation: Confirmation,
    /// View published by the post-confirmation refresh, or the previous
    /// view if that refresh failed.
    pub view: DexView,
    /// Set when the post-confirmation refresh failed.
    pub refresh_error: Option<LedgerError>,
}

impl MutationReceipt {
    pub fn signature(&self) -> &str {
        &self.confirmation.signature
    }

    /// Whether `view` reflects this mutation.
    pub fn is_fresh(&self) -> bool {
        self.refresh_error.is_none()
    }
}

pub struct MutationPipeline {
    session: Arc<SessionContext>,
    gateway: Arc<LedgerGateway>,
    sync: Arc<StateSynchronizer>,
    deriver: AddressDeriver,
    config: ClientConfig,
}

impl MutationPipeline {
    pub fn new(
        session: Arc<SessionContext>,
        gateway: Arc<LedgerGateway>,
        sync: Arc<StateSynchronizer>,
        config: ClientConfig,
    ) -> Self {
        Self {
            session,
            gateway,
            sync,
            deriver: AddressDeriver::new(),
            config,
        }
    }

    /// Create the singleton state account; the session identity becomes its
    /// authority.
    pub async fn initialize(&self) -> ClientResult<MutationReceipt> {
        let session = self.session.active()?;
        let dex_state = self.dex_state()?;
        if self.sync.current().is_initialized() {
            debug!(%dex_state, "Skipping initialize: state already present");
            return Err(LedgerError::AlreadyInitialized.into());
        }

        let instruction = DexInstruction::Initialize(InitializeAccounts {
            dex_state,
            authority: session.identity(),
            system_program: LedgerAddress::SYSTEM_PROGRAM,
        });
        self.execute(&session, instruction).await
    }

    pub async fn place_order(
        &self,
        side: OrderSide,
        amount: u64,
        price: u64,
    ) -> ClientResult<MutationReceipt> {
        let session = self.session.active()?;
        validate_order_params(amount, price)?;
        let accounts = self.order_accounts(&session)?;

        let instruction = DexInstruction::PlaceOrder {
            accounts,
            side,
            amount,
            price,
        };
        self.execute(&session, instruction).await
    }

    /// Cancel one of the session's own orders that the last snapshot shows
    /// as resting.
    pub async fn cancel_order(&self, order_id: OrderId) -> ClientResult<MutationReceipt> {
        let session = self.session.active()?;
        let accounts = self.order_accounts(&session)?;
        let view = self.sync.current();
        let Some(order) = view.state().and_then(|state| state.order(order_id)) else {
            debug!(%order_id, "Cancel refused: order not in last snapshot");
            return Err(LedgerError::StaleOrderReference(order_id).into());
        };
        if !order.is_owned_by(&session.identity()) {
            debug!(%order_id, owner = %order.owner, "Cancel refused: order not owned by session");
            return Err(LedgerError::NotOrderOwner {
                order_id,
                owner: order.owner,
            }
            .into());
        }

        let instruction = DexInstruction::CancelOrder { accounts, order_id };
        self.execute(&session, instruction).await
    }

    pub async fn match_orders(&self) -> ClientResult<MutationReceipt> {
        let session = self.session.active()?;
        let instruction = DexInstruction::MatchOrders(MatchAccounts {
            dex_state: self.dex_state()?,
            authority: session.identity(),
        });
        self.execute(&session, instruction).await
    }

    fn dex_state(&self) -> ClientResult<LedgerAddress> {
        Ok(self.deriver.dex_state(&self.config.program_id)?)
    }

    fn order_accounts(&self, session: &ActiveSession) -> ClientResult<OrderAccounts> {
        Ok(OrderAccounts {
            dex_state: self.dex_state()?,
            user: session.identity(),
            user_token_account: self.config.user_token_account,
            dex_token_account: self.config.dex_token_account,
            token_program: self.config.token_program,
        })
    }

    async fn execute(
        &self,
        session: &ActiveSession,
        instruction: DexInstruction,
    ) -> ClientResult<MutationReceipt> {
        let method = instruction.method();
        info!(%method, identity = %session.identity(), "Submitting mutation");

        let outcome = tokio::select! {
            biased;
            () = self.session.lost(session.epoch()) => {
                warn!(%method, epoch = session.epoch(), "Session lost while awaiting finality");
                return Err(ClientError::SessionLost);
            }
            result = self.gateway.call(&instruction, session.signer().as_ref()) => result,
        };

        match outcome {
            Ok(confirmation) => {
                info!(
                    %method,
                    signature = %confirmation.signature,
                    slot = ?confirmation.slot,
                    "Mutation finalized"
                );
                let (view, refresh_error) = match self.sync.refresh().await {
                    Ok(view) => (view, None),
                    Err(error) => {
                        warn!(%method, %error, "Refresh after mutation failed");
                        (self.sync.current(), Some(error))
                    }
                };
                Ok(MutationReceipt {
                    method,
                    confirmation,
                    view,
                    refresh_error,
                })
            }
            Err(error @ LedgerError::ConfirmationTimeout { .. }) => {
                warn!(%method, %error, "Finality not observed; refreshing");
                if let Err(refresh) = self.sync.refresh().await {
                    warn!(%method, error = %refresh, "Refresh after timeout failed");
                }
                Err(error.into())
            }
            Err(error) => Err(error.into()),
        }
    }
}

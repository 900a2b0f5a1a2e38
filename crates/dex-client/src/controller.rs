//! Order lifecycle façade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dex_core::{DexView, OrderId, OrderSide};
use dex_ledger::{AddressDeriver, DexMethod, LedgerGateway};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pipeline::{MutationPipeline, MutationReceipt};
use crate::session::SessionContext;
use crate::sync::StateSynchronizer;

/// Entry point for callers.
///
/// At most one mutation is in flight; a second one fails immediately with
/// `OperationInProgress`. Reads never wait on mutations.
pub struct OrderLifecycleController {
    session: Arc<SessionContext>,
    sync: Arc<StateSynchronizer>,
    pipeline: MutationPipeline,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the mutation ends, including when its
/// future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OrderLifecycleController {
    /// Build a controller that has not read the ledger yet: until the first
    /// refresh, [`current_state`](Self::current_state) is `DexView::Unknown`,
    /// which reads as not initialized. Use [`open`](Self::open) to start from
    /// a fetched snapshot.
    ///
    /// # Errors
    /// `Config` for an invalid configuration, `DerivationExhausted` if the
    /// state address cannot be derived for the program.
    pub fn new(
        config: ClientConfig,
        session: Arc<SessionContext>,
        gateway: Arc<LedgerGateway>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let address = AddressDeriver::new().dex_state(&config.program_id)?;
        info!(program_id = %config.program_id, dex_state = %address, "Controller ready");

        let sync = Arc::new(StateSynchronizer::new(gateway.clone(), address));
        let pipeline = MutationPipeline::new(session.clone(), gateway, sync.clone(), config);
        Ok(Self {
            session,
            sync,
            pipeline,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Build a controller and publish its first snapshot, so a deployment
    /// that was never initialized is observed as `Uninitialized`.
    ///
    /// # Errors
    /// As [`new`](Self::new), plus any failure of the initial fetch.
    pub async fn open(
        config: ClientConfig,
        session: Arc<SessionContext>,
        gateway: Arc<LedgerGateway>,
    ) -> ClientResult<Self> {
        let controller = Self::new(config, session, gateway)?;
        controller.refresh().await?;
        Ok(controller)
    }

    pub async fn initialize(&self) -> ClientResult<MutationReceipt> {
        let _guard = self.begin(DexMethod::Initialize)?;
        self.pipeline.initialize().await
    }

    pub async fn place(
        &self,
        side: OrderSide,
        amount: u64,
        price: u64,
    ) -> ClientResult<MutationReceipt> {
        let _guard = self.begin(DexMethod::PlaceOrder)?;
        self.pipeline.place_order(side, amount, price).await
    }

    pub async fn cancel(&self, order_id: OrderId) -> ClientResult<MutationReceipt> {
        let _guard = self.begin(DexMethod::CancelOrder)?;
        self.pipeline.cancel_order(order_id).await
    }

    pub async fn match_orders(&self) -> ClientResult<MutationReceipt> {
        let _guard = self.begin(DexMethod::MatchOrders)?;
        self.pipeline.match_orders().await
    }

    /// Last published snapshot.
    pub fn current_state(&self) -> DexView {
        self.sync.current()
    }

    /// Re-read the ledger outside of any mutation.
    pub async fn refresh(&self) -> ClientResult<DexView> {
        Ok(self.sync.refresh().await?)
    }

    pub fn subscribe(&self) -> watch::Receiver<DexView> {
        self.sync.subscribe()
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn synchronizer(&self) -> &Arc<StateSynchronizer> {
        &self.sync
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self, method: DexMethod) -> ClientResult<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| {
                debug!(%method, "Mutation refused: another is in flight");
                ClientError::OperationInProgress
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::LedgerAddress;
    use dex_ledger::MockLedger;

    fn config() -> ClientConfig {
        ClientConfig::new(
            LedgerAddress::new([9; 32]),
            LedgerAddress::new([3; 32]),
            LedgerAddress::new([4; 32]),
        )
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut cfg = config();
        cfg.dex_token_account = cfg.user_token_account;
        let gateway = Arc::new(LedgerGateway::new(
            Arc::new(MockLedger::new()),
            cfg.program_id,
        ));
        let result =
            OrderLifecycleController::new(cfg, Arc::new(SessionContext::new("x")), gateway);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_reads_before_any_mutation() {
        let cfg = config();
        let gateway = Arc::new(LedgerGateway::new(
            Arc::new(MockLedger::new()),
            cfg.program_id,
        ));
        let controller =
            OrderLifecycleController::new(cfg, Arc::new(SessionContext::new("x")), gateway)
                .unwrap();
        assert_eq!(controller.current_state(), DexView::Unknown);
        assert!(!controller.current_state().is_initialized());
        assert!(!controller.is_busy());
        assert_eq!(controller.refresh().await.unwrap(), DexView::Uninitialized);
    }

    #[tokio::test]
    async fn test_open_publishes_first_snapshot() {
        let cfg = config();
        let ledger = Arc::new(MockLedger::new());
        let gateway = Arc::new(LedgerGateway::new(ledger.clone(), cfg.program_id));
        let controller =
            OrderLifecycleController::open(cfg, Arc::new(SessionContext::new("x")), gateway)
                .await
                .unwrap();
        assert_eq!(controller.current_state(), DexView::Uninitialized);
        assert_eq!(ledger.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_open_surfaces_fetch_failure() {
        let cfg = config();
        let ledger = Arc::new(MockLedger::new());
        ledger.fail_next_fetch(dex_ledger::LedgerError::NetworkError("refused".into()));
        let gateway = Arc::new(LedgerGateway::new(ledger, cfg.program_id));
        let err = OrderLifecycleController::open(cfg, Arc::new(SessionContext::new("x")), gateway)
            .await
            .err()
            .unwrap();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_guard_clears_busy_flag() {
        let cfg = config();
        let gateway = Arc::new(LedgerGateway::new(
            Arc::new(MockLedger::new()),
            cfg.program_id,
        ));
        let controller =
            OrderLifecycleController::new(cfg, Arc::new(SessionContext::new("x")), gateway)
                .unwrap();

        let guard = controller.begin(DexMethod::PlaceOrder).unwrap();
        assert!(controller.is_busy());
        assert_eq!(
            controller.begin(DexMethod::CancelOrder).err(),
            Some(ClientError::OperationInProgress)
        );
        // Polling the flag never takes it.
        assert!(controller.is_busy());
        drop(guard);
        assert!(!controller.is_busy());
        assert!(controller.begin(DexMethod::MatchOrders).is_ok());
    }
}

//! Mirrored ledger state.
//!
//! The synchronizer is the only writer of the published [`DexView`]. Every
//! refresh replaces the snapshot wholesale; each one takes a ticket so a slow
//! fetch that completes after a newer one is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dex_core::{DexView, LedgerAddress};
use dex_ledger::{LedgerError, LedgerGateway, LedgerResult};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct StateSynchronizer {
    gateway: Arc<LedgerGateway>,
    address: LedgerAddress,
    view: watch::Sender<DexView>,
    /// Last ticket handed out.
    issued: AtomicU64,
    /// Ticket of the published view.
    published: Mutex<u64>,
    refresh_count: AtomicU64,
}

impl StateSynchronizer {
    pub fn new(gateway: Arc<LedgerGateway>, address: LedgerAddress) -> Self {
        let (view, _) = watch::channel(DexView::Unknown);
        Self {
            gateway,
            address,
            view,
            issued: AtomicU64::new(0),
            published: Mutex::new(0),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Fetch the state account and publish it.
    ///
    /// A missing account publishes `Uninitialized`. On any other failure the
    /// published view is left untouched.
    pub async fn refresh(&self) -> LedgerResult<DexView> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_count.fetch_add(1, Ordering::SeqCst);

        let view = match self.gateway.fetch(&self.address).await {
            Ok(state) => DexView::ready(state),
            Err(LedgerError::AccountNotFound(_)) => DexView::Uninitialized,
            Err(error) => {
                warn!(ticket, %error, "State refresh failed");
                return Err(error);
            }
        };

        if self.publish(ticket, view) {
            let current = self.current();
            info!(
                ticket,
                initialized = current.is_initialized(),
                orders = current.orders().len(),
                "State refreshed"
            );
        }
        Ok(self.current())
    }

    /// Last published view.
    pub fn current(&self) -> DexView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DexView> {
        self.view.subscribe()
    }

    /// Number of refreshes started.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    fn publish(&self, ticket: u64, view: DexView) -> bool {
        let mut published = self.published.lock();
        if ticket < *published {
            debug!(ticket, newer = *published, "Discarding out-of-order refresh");
            return false;
        }
        *published = ticket;
        self.view.send_replace(view);
        true
    }
}

//! Wallet session lifecycle.
//!
//! `Disconnected → Connecting → Connected → Disconnected`, driven by the
//! external wallet provider and broadcast on a watch channel. Each
//! `connected` call opens a new epoch; a mutation started under one epoch
//! treats any later transition as loss of its session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dex_core::LedgerAddress;
use dex_ledger::DynSigner;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// A connected signer, pinned to the epoch it was connected in.
#[derive(Clone)]
pub struct ActiveSession {
    identity: LedgerAddress,
    signer: DynSigner,
    epoch: u64,
}

impl ActiveSession {
    pub fn identity(&self) -> LedgerAddress {
        self.identity
    }

    pub fn signer(&self) -> &DynSigner {
        &self.signer
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("identity", &self.identity)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(ActiveSession),
}

/// Payload-free form of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Disconnected => SessionStatus::Disconnected,
            Self::Connecting => SessionStatus::Connecting,
            Self::Connected(_) => SessionStatus::Connected,
        }
    }

    fn is_epoch(&self, epoch: u64) -> bool {
        matches!(self, Self::Connected(active) if active.epoch == epoch)
    }
}

/// Active signer and configured endpoint.
#[derive(Debug)]
pub struct SessionContext {
    endpoint: String,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
}

impl SessionContext {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            endpoint: endpoint.into(),
            state,
            epoch: AtomicU64::new(0),
        }
    }

    /// RPC endpoint the session talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    /// Wallet approval requested.
    pub fn begin_connect(&self) {
        let changed = self.state.send_if_modified(|state| match state {
            SessionState::Disconnected => {
                *state = SessionState::Connecting;
                true
            }
            _ => false,
        });
        if changed {
            debug!(endpoint = %self.endpoint, "Session connecting");
        } else {
            warn!(status = ?self.status(), "begin_connect ignored: not disconnected");
        }
    }

    /// Wallet approved; `signer` becomes the active identity.
    ///
    /// Replacing an already connected signer starts a new epoch, so any
    /// mutation in flight under the previous one is lost.
    pub fn connected(&self, signer: DynSigner) -> LedgerAddress {
        let identity = signer.identity();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.state.send_replace(SessionState::Connected(ActiveSession {
            identity,
            signer,
            epoch,
        }));
        if let SessionState::Connected(old) = previous {
            warn!(old = %old.identity, new = %identity, "Session signer replaced");
        }
        info!(%identity, epoch, endpoint = %self.endpoint, "Session connected");
        identity
    }

    pub fn disconnect(&self) {
        let previous = self.state.send_replace(SessionState::Disconnected);
        match previous {
            SessionState::Connected(active) => {
                info!(identity = %active.identity, epoch = active.epoch, "Session disconnected");
            }
            SessionState::Connecting => debug!("Connection attempt abandoned"),
            SessionState::Disconnected => {}
        }
    }

    /// Identity of the connected signer.
    ///
    /// # Errors
    /// `NoActiveSession` unless connected.
    pub fn current_identity(&self) -> ClientResult<LedgerAddress> {
        self.active().map(|active| active.identity)
    }

    /// The connected session.
    ///
    /// # Errors
    /// `NoActiveSession` unless connected.
    pub fn active(&self) -> ClientResult<ActiveSession> {
        match &*self.state.borrow() {
            SessionState::Connected(active) => Ok(active.clone()),
            _ => Err(ClientError::NoActiveSession),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolves once the session of `epoch` is no longer the connected one.
    ///
    /// Resolves immediately if that is already the case.
    pub async fn lost(&self, epoch: u64) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so `wait_for` can only fail once we are gone.
        let _ = rx.wait_for(|state| !state.is_epoch(epoch)).await;
    }
}

//! Wiring and command execution.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use dex_client::{OrderLifecycleController, SessionContext};
use dex_core::{LedgerAddress, OrderId};
use dex_ledger::{DynSigner, DynTransport, LedgerGateway, ProgramSchema, RpcTransport};
use tracing::{debug, info, warn};

use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::CliResult;
use crate::keypair::KeypairSigner;
use crate::render::{render_receipt, render_view};

pub struct App {
    controller: OrderLifecycleController,
    session: Arc<SessionContext>,
}

impl App {
    /// Build the RPC stack and controller from configuration.
    pub async fn new(config: &AppConfig) -> CliResult<Self> {
        let transport: DynTransport = Arc::new(RpcTransport::new(config.rpc_config())?);
        Self::with_transport(config, transport).await
    }

    /// Build against an arbitrary transport. The first snapshot is fetched
    /// here, so mutations check their preconditions against ledger state.
    pub async fn with_transport(config: &AppConfig, transport: DynTransport) -> CliResult<Self> {
        let mut gateway = LedgerGateway::new(transport, config.program_id);
        if let Some(path) = &config.idl_path {
            let schema = ProgramSchema::from_file(path)?;
            gateway = gateway.with_schema(&schema)?;
        }

        let session = Arc::new(SessionContext::new(config.rpc_url.clone()));
        let gateway = Arc::new(gateway);
        let controller =
            OrderLifecycleController::open(config.client_config(), session.clone(), gateway)
                .await?;
        Ok(Self {
            controller,
            session,
        })
    }

    /// Connect a signer as the session identity.
    pub fn connect(&self, signer: DynSigner) -> LedgerAddress {
        self.session.begin_connect();
        self.session.connected(signer)
    }

    /// Load the configured keypair and connect it.
    pub fn connect_keypair(&self, config: &AppConfig) -> CliResult<LedgerAddress> {
        let signer = KeypairSigner::load(&config.key_source()?, config.expected_identity)?;
        Ok(self.connect(Arc::new(signer)))
    }

    pub fn controller(&self) -> &OrderLifecycleController {
        &self.controller
    }

    /// Run one command, writing its output to `out`.
    pub async fn run(&self, command: Command, out: &mut impl Write) -> CliResult<()> {
        let me = self.session.current_identity().ok();
        let receipt = match command {
            Command::State => {
                let view = self.controller.refresh().await?;
                write!(out, "{}", render_view(&view, me.as_ref()))?;
                return Ok(());
            }
            Command::Watch { interval } => {
                return self.watch(Duration::from_secs(interval.max(1)), me, out).await;
            }
            Command::Initialize => self.controller.initialize().await?,
            Command::Place {
                side,
                amount,
                price,
            } => self.controller.place(side, amount, price).await?,
            Command::Cancel { order_id } => self.controller.cancel(OrderId(order_id)).await?,
            Command::Match => self.controller.match_orders().await?,
        };

        write!(out, "{}", render_receipt(&receipt))?;
        write!(out, "{}", render_view(&receipt.view, me.as_ref()))?;
        Ok(())
    }

    async fn watch(
        &self,
        interval: Duration,
        me: Option<LedgerAddress>,
        out: &mut impl Write,
    ) -> CliResult<()> {
        let mut rx = self.controller.subscribe();
        let mut ticker = tokio::time::interval(interval);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        info!(interval_secs = interval.as_secs(), "Watching state");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupted, stopping watch");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(error) = self.controller.refresh().await {
                        if error.is_retryable() {
                            warn!(%error, "Refresh failed, will retry");
                        } else {
                            return Err(error.into());
                        }
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        debug!("State channel closed");
                        return Ok(());
                    }
                    let view = rx.borrow_and_update().clone();
                    write!(out, "{}", render_view(&view, me.as_ref()))?;
                    out.flush()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_client::ClientError;
    use dex_core::{DexView, OrderSide};
    use dex_ledger::{MockLedger, MockSigner};

    fn config() -> AppConfig {
        toml::from_str(
            r#"
            program_id = "SysvarRent111111111111111111111111111111111"
            keypair_path = "/unused"
            user_token_account = "SysvarC1ock11111111111111111111111111111111"
            dex_token_account = "Sysvar1nstructions1111111111111111111111111"
            "#,
        )
        .unwrap()
    }

    async fn run(app: &App, command: Command) -> CliResult<String> {
        let mut out = Vec::new();
        app.run(command, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_commands_against_mock_ledger() {
        let app = App::with_transport(&config(), Arc::new(MockLedger::new()))
            .await
            .unwrap();
        app.connect(Arc::new(MockSigner::new(LedgerAddress::new([2; 32]))));

        assert!(run(&app, Command::State).await.unwrap().contains("not initialized"));

        let out = run(&app, Command::Initialize).await.unwrap();
        assert!(out.contains("initialize finalized"));

        let place = Command::Place {
            side: OrderSide::Buy,
            amount: 100,
            price: 10,
        };
        let out = run(&app, place).await.unwrap();
        assert!(out.contains("#0 buy 100 @ 10"));
        assert!(out.contains(" *"));

        let out = run(&app, Command::Cancel { order_id: 0 }).await.unwrap();
        assert!(out.contains("orders: 0"));
    }

    #[tokio::test]
    async fn test_mutation_without_signer() {
        let app = App::with_transport(&config(), Arc::new(MockLedger::new()))
            .await
            .unwrap();
        let err = run(&app, Command::Match).await.unwrap_err();
        assert!(matches!(
            err,
            crate::CliError::Client(ClientError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_missing_idl_file() {
        let mut cfg = config();
        cfg.idl_path = Some("/nonexistent/idl.json".into());
        let ledger = Arc::new(MockLedger::new());
        assert!(App::with_transport(&cfg, ledger.clone()).await.is_err());
        assert_eq!(ledger.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_startup_fetches_state_once() {
        let ledger = Arc::new(MockLedger::new());
        let app = App::with_transport(&config(), ledger.clone()).await.unwrap();
        assert_eq!(app.controller().current_state(), DexView::Uninitialized);
        assert_eq!(ledger.fetch_count(), 1);

        app.connect(Arc::new(MockSigner::new(LedgerAddress::new([2; 32]))));
        run(&app, Command::Initialize).await.unwrap();
        assert_eq!(ledger.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_keypair_must_match_expected_identity() {
        let mut cfg = config();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        let keypair = solana_sdk::signature::Keypair::new();
        std::fs::write(&path, serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap())
            .unwrap();
        cfg.keypair_path = Some(path);
        cfg.expected_identity = Some(LedgerAddress::new([7; 32]));

        let app = App::with_transport(&cfg, Arc::new(MockLedger::new()))
            .await
            .unwrap();
        assert!(matches!(app.connect_keypair(&cfg), Err(crate::CliError::Key(_))));
        assert!(app.session.current_identity().is_err());
    }
}

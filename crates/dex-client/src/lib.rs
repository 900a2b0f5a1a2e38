//! Client-side order lifecycle controller.
//!
//! Drives the remote order-book program and keeps a mirrored view of its
//! state:
//! - [`SessionContext`]: active signer and endpoint, connect/disconnect lifecycle
//! - [`MutationPipeline`]: derive → build accounts → submit → await finality → refresh
//! - [`StateSynchronizer`]: single owner of the published `DexView`
//! - [`OrderLifecycleController`]: façade that allows one mutation in flight
//!
//! # Retry policy
//!
//! Nothing retries automatically. `NetworkError` and `StaleOrderReference`
//! are safe to retry (the latter after a refresh); see [`ClientError::is_retryable`].

pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod sync;

pub use config::ClientConfig;
pub use controller::OrderLifecycleController;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use pipeline::{MutationPipeline, MutationReceipt};
pub use session::{ActiveSession, SessionContext, SessionState, SessionStatus};
pub use sync::StateSynchronizer;

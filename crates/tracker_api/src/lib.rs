//! REST API for the manager tracker.
//!
//! Serves per-manager sheets and the call log. Cell saves and new managers
//! require the `admin` role (sent in the `X-Role` header); cell saves are
//! recorded in the log.
//!
//! # Example
//!
//! ```ignore
//! use tracker_api::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     serve(ServerConfig::default(), std::future::pending()).await
//! }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod router;
pub mod sheets;

pub use audit::{AuditLog, LogEntry, LogFilter, NewLogEntry};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use router::{router, AppState, ADMIN_ROLE};
pub use sheets::{Sheet, SheetStore, SheetSummary, MAX_COLS, MAX_ROWS};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve(
    config: ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.socket_addr()).await?;
    serve_on(listener, Arc::new(AppState::new()), shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("Tracker API listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Tracker API stopped");
    Ok(())
}

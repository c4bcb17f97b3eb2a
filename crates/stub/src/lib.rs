//! Pavlo API stub
//!
//! An in-memory stand-in for the Pavlo HTTP API. It answers every endpoint
//! of the contract with canonical shapes and canned scrape/location data so
//! the scenario suite can run without the real server. Nothing is
//! persisted and nothing is scraped.

pub mod catalog;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use pavlo_contract::AuthRequest;
use tokio::task::JoinHandle;
use tracing::info;

pub use state::StubState;

/// Stub configuration
#[derive(Debug, Clone, Default)]
pub struct StubConfig {
    /// Accounts created with `isAdmin = true` at startup
    pub admins: Vec<AuthRequest>,
}

pub struct StubServer {
    state: Arc<StubState>,
}

impl StubServer {
    pub fn new(cfg: StubConfig) -> anyhow::Result<Self> {
        let state = Arc::new(StubState::new());
        for admin in &cfg.admins {
            state.create_account(&admin.email, &admin.password, true)?;
            info!("Seeded admin account {}", admin.email);
        }
        Ok(Self { state })
    }

    pub fn state(&self) -> Arc<StubState> {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Serve until the process exits
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Stub API listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// A stub running on a background task; aborted on drop
pub struct StubHandle {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubHandle {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind `addr` (port 0 for an ephemeral port) and serve in the background
pub async fn spawn(addr: SocketAddr, cfg: StubConfig) -> anyhow::Result<StubHandle> {
    let server = StubServer::new(cfg)?;
    let state = server.state();
    let router = server.router();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Stub server stopped: {}", e);
        }
    });

    Ok(StubHandle { addr, state, task })
}

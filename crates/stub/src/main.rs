use std::net::SocketAddr;

use pavlo_contract::AuthRequest;
use pavlo_stub::{StubConfig, StubServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr: SocketAddr = std::env::var("PAVLO_STUB_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;

    // An admin account is seeded only when both variables are set
    let admins = match (
        std::env::var("PAVLO_STUB_ADMIN_EMAIL"),
        std::env::var("PAVLO_STUB_ADMIN_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) if !email.trim().is_empty() => {
            vec![AuthRequest { email, password }]
        }
        _ => Vec::new(),
    };

    StubServer::new(StubConfig { admins })?.serve(addr).await
}

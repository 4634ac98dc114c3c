use std::sync::Arc;

use rand::RngCore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kanjislots_core::MachineConfig;

mod app;

use app::{router, AppState};

fn load_config() -> anyhow::Result<MachineConfig> {
    match std::env::var("KANJISLOTS_CONFIG") {
        Ok(path) => {
            info!(%path, "loading machine config");
            Ok(MachineConfig::load(&path)?)
        }
        Err(_) => Ok(MachineConfig::default()),
    }
}

fn server_seed() -> String {
    std::env::var("SERVER_SEED").unwrap_or_else(|_| {
        warn!("SERVER_SEED not set, using a random seed for this process");
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let state = Arc::new(AppState::new(config, server_seed())?);
    info!(server_seed_hash = state.server_seed_hash(), "machine ready");

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

//! waykvm injector entry point.
//!
//! Creates the virtual keyboard, binds the TCP listener, and serves
//! relay connections until a shutdown signal arrives.
//!
//! Exit code is nonzero when the virtual device cannot be created or the
//! listener cannot bind; everything after that is resilient, a broken
//! connection or a failed injection only costs the affected event.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use waykvm_injector::application::inject::InjectKeyUseCase;
use waykvm_injector::infrastructure::config;
use waykvm_injector::infrastructure::server::run_listener;
use waykvm_injector::infrastructure::uinput::UinputKeyboard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("failed to load configuration")?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone())),
        )
        .init();

    info!("waykvm injector starting");

    let keyboard = UinputKeyboard::create(&cfg.device_name)
        .context("failed to create the virtual keyboard (is /dev/uinput writable?)")?;
    let use_case = Arc::new(Mutex::new(InjectKeyUseCase::new(keyboard)));

    let addr = cfg.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind relay listener on {addr}"))?;
    info!(%addr, "relay listener ready");

    tokio::select! {
        _ = run_listener(listener, use_case) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    info!("waykvm injector stopped");
    Ok(())
}

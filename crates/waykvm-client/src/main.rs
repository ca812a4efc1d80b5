//! waykvm capture client entry point.
//!
//! Wires together the compositor link, the shared-memory pool, the relay
//! forwarder, and the dispatcher task, then runs until the session ends.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ config::load()           -- TOML config, all fields defaulted
//!  └─ CompositorLink::connect() -- $XDG_RUNTIME_DIR/$WAYLAND_DISPLAY
//!  └─ RelayForwarder::connect() -- TCP to the injector
//!  └─ ShmPool::allocate()       -- memfd + mmap, sized to one frame
//!  └─ reader thread ─▶ Session::run ─▶ key queue ─▶ forwarder task
//! ```
//!
//! Exit code is nonzero when the compositor socket, the relay
//! connection, or the pixel pool cannot be set up, and when the server
//! reports a display error; a closed window or a shutdown signal is a
//! clean exit.

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use waykvm_client::application::session::Session;
use waykvm_client::application::state::{ConnectionState, EndReason};
use waykvm_client::infrastructure::compositor::CompositorLink;
use waykvm_client::infrastructure::config;
use waykvm_client::infrastructure::relay::RelayForwarder;
use waykvm_client::infrastructure::shm::ShmPool;

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

    info!("waykvm client starting");

    let geometry = cfg.surface.geometry();
    let link = CompositorLink::connect().context("failed to open the compositor socket")?;

    let (shutdown_tx, _shutdown_rx) = watch::channel(false);

    let forwarder = RelayForwarder::connect(&cfg.relay.addr(), shutdown_tx.clone())
        .await
        .context("failed to connect to the injector")?;

    let pool = ShmPool::allocate(geometry.pool_size() as usize)
        .context("failed to allocate the shared-memory pool")?;

    // Bounded queues: reader -> dispatcher -> forwarder.
    let (chunk_tx, chunk_rx) = mpsc::channel(32);
    let (key_tx, key_rx) = mpsc::channel(64);

    link.spawn_reader(chunk_tx)
        .context("failed to spawn the compositor reader")?;
    let forwarder_task = tokio::spawn(forwarder.run(key_rx));

    let state = ConnectionState::new(geometry);
    let session = Session::new(state, link, pool, key_tx, shutdown_tx.clone());

    let outcome = tokio::select! {
        end = session.run(chunk_rx) => Some(end),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            None
        }
    };

    let _ = forwarder_task.await;

    match outcome {
        Some(Ok(EndReason::DisplayError(error))) => Err(anyhow::anyhow!(
            "display error on object {} (code {}): {}",
            error.object_id,
            error.code,
            error.message
        )),
        Some(Ok(reason)) => {
            info!("session ended: {reason:?}");
            Ok(())
        }
        Some(Err(e)) => Err(e).context("control socket failure"),
        None => Ok(()),
    }
}

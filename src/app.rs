//! App — process wiring shared by every prop binary.
//!
//! LIFECYCLE
//! =========
//! 1. Binary parses `--mock`, loads settings and prop config, opens hardware
//! 2. `run` spawns the actor and (if configured) the Room Controller bridge
//! 3. HTTP + WebSocket server on `0.0.0.0:PORT`
//! 4. SIGINT/SIGTERM → bridge told to go offline, actor stopped (which closes
//!    every client socket), server drains, hardware released last

use std::future::pending;
use std::io;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::bridge::{self, BridgeConfig};
use crate::config::{ConfigError, PropSettings};
use crate::hardware::InputGuard;
use crate::prop::Prop;
use crate::routes::{self, AppState};
use crate::runtime::{self, PropHandle, RuntimeOptions};

const ROOM_UPDATE_CAPACITY: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(about = "Escape-room prop controller")]
pub struct Cli {
    /// Simulated input from display clients instead of GPIO.
    #[arg(long)]
    pub mock: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: io::Error },
    #[error("server failed: {0}")]
    Serve(io::Error),
}

/// Serve one prop until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn run<P: Prop>(
    settings: PropSettings,
    mock: bool,
    machine: P,
    inputs: mpsc::Receiver<P::Input>,
    guard: InputGuard,
) -> Result<(), AppError> {
    info!(prop_id = %settings.prop_id, port = settings.port, mock, gpio_inputs = !guard.is_empty(), "prop starting");

    let (updates_tx, updates_rx) = match settings.room_controller_url {
        Some(_) => {
            let (tx, rx) = mpsc::channel(ROOM_UPDATE_CAPACITY);
            (Some(tx), Some(rx))
        }
        None => (None, None),
    };
    let (handle, actor) = runtime::spawn(machine, inputs, RuntimeOptions { mock, room_updates: updates_tx });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bridge = match (settings.room_controller_url.clone(), updates_rx) {
        (Some(url), Some(updates)) => {
            let config = BridgeConfig::new(url, settings.prop_id.clone(), settings.room_update_interval);
            Some(bridge::spawn(config, handle.clone(), updates, shutdown_rx))
        }
        _ => {
            info!("room controller not configured, running standalone");
            None
        }
    };

    let state = AppState { handle: handle.clone(), prop_id: settings.prop_id.clone() };
    let router = routes::app(state, &settings.public_dir);
    let port = settings.port;
    let listener = TcpListener::bind(("0.0.0.0", port)).await.map_err(|source| AppError::Bind { port, source })?;
    info!(%port, public_dir = %settings.public_dir.display(), "prop listening");

    let served = axum::serve(listener, router).with_graceful_shutdown(stop_on_signal(handle, shutdown_tx)).await;

    if let Some(bridge) = bridge {
        if timeout(SHUTDOWN_GRACE, bridge).await.is_err() {
            warn!("bridge did not stop in time");
        }
    }
    if timeout(SHUTDOWN_GRACE, actor).await.is_err() {
        warn!("runtime did not stop in time");
    }
    drop(guard);
    info!("prop stopped");
    served.map_err(AppError::Serve)
}

async fn stop_on_signal(handle: PropHandle, shutdown: watch::Sender<bool>) {
    shutdown_signal().await;
    info!("shutdown requested");
    let _ = shutdown.send(true);
    handle.shutdown().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

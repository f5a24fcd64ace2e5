//! Top-level drivers for the refresh controller.
//!
//! Two modes, mirroring how the controller is deployed:
//!
//! - `keep_alive`: daemon mode, run until SIGINT/SIGTERM;
//! - `tick_and_refresh`: one-shot mode, poll the completion flag every
//!   five seconds and exit once the refresh has landed.

use crate::controller::{PodEventSource, RefreshController};
use crate::error::ControllerError;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// How often the one-shot driver polls the completion flag.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(_) => {
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

fn join_run(
    result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    result.map_err(|e| ControllerError::Watch(format!("Controller task panicked: {}", e)))?
}

fn spawn_run(
    controller: &Arc<RefreshController>,
    source: Box<dyn PodEventSource>,
    workers: usize,
    stop: watch::Receiver<bool>,
) -> JoinHandle<Result<(), ControllerError>> {
    let controller = Arc::clone(controller);
    tokio::spawn(async move { controller.run(source, workers, stop).await })
}

/// Daemon mode: run the controller until a termination signal arrives.
pub async fn keep_alive(
    controller: Arc<RefreshController>,
    source: Box<dyn PodEventSource>,
    workers: usize,
) -> Result<(), ControllerError> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut run = spawn_run(&controller, source, workers, stop_rx);

    tokio::select! {
        result = &mut run => return join_run(result),
        _ = shutdown_signal() => {
            info!("Received termination signal, shutting down");
        }
    }

    stop_tx.send_replace(true);
    join_run(run.await)
}

/// One-shot mode: run the controller, poll the completion flag every five
/// seconds, and shut down once the refresh has completed (or on signal).
pub async fn tick_and_refresh(
    controller: Arc<RefreshController>,
    source: Box<dyn PodEventSource>,
    workers: usize,
) -> Result<(), ControllerError> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut done = controller.done_receiver();
    let mut run = spawn_run(&controller, source, workers, stop_rx);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            // Controller ended on its own (e.g. sync timeout): surface it.
            result = &mut run => return join_run(result),
            res = done.wait_for(|d| *d) => {
                if res.is_ok() {
                    info!("Stack refresh completed");
                }
                break;
            }
            _ = &mut shutdown => {
                info!("Received termination signal, shutting down");
                break;
            }
            _ = ticker.tick() => {
                print!(".");
                let _ = std::io::stdout().flush();
            }
        }
    }

    stop_tx.send_replace(true);
    join_run(run.await)
}

use std::sync::Arc;

use dial::DialBackend;
use dial_pppd::{PppdBackend, check_prerequisites};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::ConfigArgs;
use crate::activate::Activator;
use crate::api::{self, AppState};
use crate::config;
use crate::error::ActivatorResult;
use crate::netconf;
use crate::records::JsonlSink;

/// Load config, check the host, and serve until SIGINT/SIGTERM.
pub async fn run_serve(args: ConfigArgs) -> ActivatorResult<()> {
    let config = config::load(&args.config).await?;
    let pppd = config.pppd_config();
    check_prerequisites(&pppd, &config.lock_dir).await?;

    // The network file is edited at runtime; a bad one only fails calls.
    match netconf::load(&config.network_config)
        .await
        .and_then(|network| network.candidates())
    {
        Ok(candidates) => info!(candidates = candidates.len(), "network configuration loaded"),
        Err(e) => warn!(error = %e, "network configuration unusable, calls will fail until fixed"),
    }

    let backend = Arc::new(PppdBackend::new(pppd));
    let logs = backend.logs().clone();
    let backend_name = backend.name().to_string();
    let sink = Arc::new(JsonlSink::new(config.records_path.clone()));
    let activator = Arc::new(Activator::new(backend, sink, &config));
    activator.allocator().ensure_dir()?;

    let app = api::build_router(AppState { activator, logs }, config.max_body_bytes);
    let listener = TcpListener::bind(config.listen).await?;
    info!(
        listen = %config.listen,
        backend = %backend_name,
        lock_policy = ?config.lock_policy,
        records = %config.records_path.display(),
        "activator listening"
    );

    api::serve(listener, app, shutdown_signal()).await?;
    info!("activator stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).ok();
    let mut sigint = signal(SignalKind::interrupt()).ok();

    tokio::select! {
        _ = recv_signal(&mut sigterm) => {
            info!("received SIGTERM, shutting down");
        }
        _ = recv_signal(&mut sigint) => {
            info!("received SIGINT, shutting down");
        }
    }
}

/// Await a signal if registered, or pend forever if registration failed.
async fn recv_signal(sig: &mut Option<tokio::signal::unix::Signal>) {
    match sig {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending().await,
    }
}

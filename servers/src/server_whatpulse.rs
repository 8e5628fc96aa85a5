use std::sync::Arc;

use anyhow::Result;
use lib_whatpulse::adapter::Adapter;
use lib_whatpulse::loggers::{setup_logging, LoggingOptions};
use tokio::signal;
use tracing::{error, info, warn};

mod whatpulse_logic;
use whatpulse_logic::{config, downstream, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let _guard = setup_logging(&LoggingOptions {
        app_name: "server_whatpulse".to_string(),
        log_dir: config.log_dir(),
        log_level: config.log_level(),
    })?;

    let settings = config.adapter_config().validate().inspect_err(|e| {
        error!(error = %e, "Invalid WhatPulse configuration, not starting");
    })?;
    info!("{}", settings);

    let adapter = Arc::new(Adapter::setup(settings)?);
    let registry = Arc::new(state::EntityRegistry::default());
    let poller = adapter.poller(registry.clone());
    let app_state = state::AppState::new(adapter, registry);

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let poller_handle = tokio::spawn(poller.run(shutdown_tx.subscribe()));

    let mut downstream_handle = tokio::spawn(downstream::run(
        config.port(),
        app_state,
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal, or for the HTTP surface to die on its own
    let mut downstream_result = None;
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = terminate() => {
            info!("SIGTERM received, initiating shutdown.");
        }
        result = &mut downstream_handle => {
            error!("Downstream server stopped unexpectedly, initiating shutdown.");
            downstream_result = Some(result);
        }
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    if let Err(e) = poller_handle.await {
        warn!(error = %e, "Poller task ended abnormally");
    }
    let downstream_result = match downstream_result {
        Some(result) => result,
        None => downstream_handle.await,
    };
    match downstream_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %format!("{e:#}"), "Downstream server failed");
            return Err(e);
        }
        Err(e) => warn!(error = %e, "Downstream task ended abnormally"),
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn terminate() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        // On non-unix platforms, just wait forever.
        std::future::pending::<()>().await;
    }
}

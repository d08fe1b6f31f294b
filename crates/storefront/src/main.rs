//! Storefront entry point.

use std::process::ExitCode;

use storefront::{Config, Storefront, StorefrontError};
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn run() -> Result<(), StorefrontError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env()?;
    storefront::telemetry::init(&config)?;

    // 2. Open the database, migrate and seed
    let storefront = Storefront::open(&config).await?;

    // 3. Report the current state
    let stats = storefront.dashboard().await?;
    tracing::info!(
        products = stats.total_products,
        critical_stock = stats.critical_stock,
        out_of_stock = stats.out_of_stock,
        accounts = stats.total_accounts,
        orders = stats.total_orders,
        pending = stats.orders_by_status.pending,
        "storefront ready"
    );

    // 4. Reclaim abandoned cart holds until shutdown
    let sweeper = storefront.spawn_hold_sweeper(config.hold_sweep_interval);
    shutdown_signal().await;

    sweeper.abort();
    storefront.close().await;
    tracing::info!("storefront shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "storefront failed");
            eprintln!("storefront: {e}");
            ExitCode::FAILURE
        }
    }
}

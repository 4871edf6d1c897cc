use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod middleware;
mod router;

use cache_cell::BoundedTtlCache;
use performance_cell::{Housekeeping, PerformanceMonitor};
use resilience_cell::ConnectionManager;
use router::AppState;
use shared_config::AppConfig;
use shared_database::{DatabaseProbe, DisabledDatabase, PerformanceSink, SupabaseClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API server");

    // Load configuration
    let config = AppConfig::from_env();

    let (probe, sink): (Arc<dyn DatabaseProbe>, Arc<dyn PerformanceSink>) =
        if config.is_database_configured() {
            let client = Arc::new(SupabaseClient::new(&config));
            (client.clone(), client)
        } else {
            warn!("Database not configured, metrics will not be persisted");
            (Arc::new(DisabledDatabase), Arc::new(DisabledDatabase))
        };

    // Create shared state
    let monitor = Arc::new(PerformanceMonitor::new(&config, sink));
    let state = AppState {
        cache: Arc::new(BoundedTtlCache::new(config.cache_max_size)),
        connections: Arc::new(ConnectionManager::new(&config, probe.clone())),
        monitor: monitor.clone(),
    };

    let housekeeping = Housekeeping::for_environment(&config, monitor, probe);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(housekeeping) = housekeeping {
        housekeeping.shutdown().await;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

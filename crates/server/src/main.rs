use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gondola_core::config::LoggingConfig;
use gondola_core::{
    load_config, validate_config, CatalogSnapshot, ImageAcquirer, ImageResolver, ProductCatalog,
    SqliteCatalog,
};
use gondola_server::api::create_router;
use gondola_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Credentials may come from a .env file next to the binary
    dotenvy::dotenv().ok();

    // Determine config path
    let config_path = std::env::var("GONDOLA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_tracing(&config.logging);
    info!("Loaded configuration from {:?}", config_path);

    // Validate configuration
    let warnings = validate_config(&config).context("Configuration validation failed")?;
    for warning in &warnings {
        warn!("{}", warning);
    }

    info!("Database path: {:?}", config.database.path);
    info!("Image directory: {:?}", config.images.dir);

    // Open the catalog
    let catalog: Arc<dyn ProductCatalog> = Arc::new(
        SqliteCatalog::new(&config.database.path, &config.catalog)
            .context("Failed to open product catalog")?,
    );
    let snapshot = Arc::new(CatalogSnapshot::new(
        catalog,
        Duration::from_secs(config.catalog.snapshot_ttl_secs),
    ));
    info!(
        branches = ?config.catalog.branches,
        ttl_secs = config.catalog.snapshot_ttl_secs,
        "Product catalog initialized"
    );

    // Image download and persistence
    let acquirer = Arc::new(
        ImageAcquirer::new(&config.images, Arc::clone(&snapshot))
            .context("Failed to create image acquirer")?,
    );

    // Image search (disabled when credentials are missing)
    let resolver = Arc::new(ImageResolver::from_config(&config, acquirer));
    if resolver.is_search_configured() {
        info!(
            max_calls = config.quota.max_calls,
            window_secs = config.quota.window_secs,
            "Image search enabled"
        );
    } else {
        warn!("Image search not configured; searches will report it");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), snapshot, resolver));
    spawn_session_sweeper(
        Arc::clone(&state),
        Duration::from_secs(config.sessions.sweep_interval_secs),
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Periodically close sessions left idle past their timeout.
fn spawn_session_sweeper(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            let closed = state.sessions().sweep_idle().await;
            if closed > 0 {
                debug!(closed, "Idle sessions swept");
            }
        }
    });
}

/// Install the global subscriber. `RUST_LOG` overrides the configured filter.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

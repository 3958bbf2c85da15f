use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use perfolio_core::widgets::{MemoryWidgetCache, TypeRegistry, WidgetEngine};
use perfolio_db::{PgUserDirectory, PgWidgetStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use perfolio_api::background;
use perfolio_api::config::ServerConfig;
use perfolio_api::router::build_app_router;
use perfolio_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "perfolio_api=debug,perfolio_core=info,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = perfolio_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    perfolio_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    perfolio_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Widget engine ---
    let registry = Arc::new(TypeRegistry::builtin());
    let cache = Arc::new(MemoryWidgetCache::new(Duration::from_secs(
        config.cache_ttl_secs,
    )));
    let engine = WidgetEngine::new(
        Arc::clone(&registry),
        Arc::new(PgWidgetStore::new(pool.clone())),
        Arc::new(PgUserDirectory::new(pool.clone())),
        cache.clone(),
        config.engine_config(),
    )
    .expect("Failed to build widget engine");
    tracing::info!(
        widget_types = registry.list_all().len(),
        store_timeout_secs = config.store_timeout_secs,
        "Widget engine ready"
    );

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::cache_sweep::run(
        Arc::clone(&cache),
        Duration::from_secs(config.cache_sweep_interval_secs),
        cancel.clone(),
    ));

    // --- App state & router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        engine: Arc::new(engine),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(shutdown_timeout, sweep_handle)
        .await
        .is_err()
    {
        tracing::warn!("Cache sweep did not stop within the shutdown timeout");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

//! HTTP server bootstrap for the CropChain gateway.
//!
//! This module wires together:
//! - configuration
//! - database connection pool
//! - identity store, network bootstrap and connection manager
//! - off-chain collaborators (projection, content, reference data)
//! - the Axum router

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::connection::{ConnectMode, ConnectionManager};
use crate::coordinator::HybridCoordinator;
use crate::identity::FileSystemIdentityStore;
use crate::infra::{shutdown_signal, ShutdownHooks};
use crate::ledger::ProfileBootstrap;
use crate::metrics::MetricsRegistry;
use crate::offchain::{
    ContentStore, HttpReferenceData, IpfsContentStore, PgProjectionStore, ReferenceDataSource,
    StaticReferenceData,
};
use crate::query::QueryAdapter;

const SHUTDOWN_HOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<ConnectionManager>,
    pub coordinator: Arc<HybridCoordinator>,
    pub queries: Arc<QueryAdapter>,
    pub content: Arc<dyn ContentStore>,
    pub metrics: Arc<MetricsRegistry>,
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!("Starting CropChain gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Connection profile: {}", config.connection_profile.display());
    info!("  Channel/contract: {}/{}", config.channel_name, config.contract_name);
    info!("  Connect mode: {:?}", config.connect_mode);

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to PostgreSQL");

    if config.migrate_on_startup {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    let metrics = Arc::new(MetricsRegistry::new());

    let bootstrap = Arc::new(ProfileBootstrap::new(
        config.connection_profile.clone(),
        config.ca_name.clone(),
        config.ca_tls_verify,
        config.call_timeout,
    ));
    let store = Arc::new(FileSystemIdentityStore::new(config.wallet_path.clone()));
    let connection = Arc::new(ConnectionManager::new(
        bootstrap,
        store,
        config.connection_settings(),
        metrics.clone(),
    ));

    let reference: Arc<dyn ReferenceDataSource> = match &config.market_api_url {
        Some(url) => Arc::new(HttpReferenceData::new(url.clone(), config.call_timeout)?),
        None => {
            info!("Reference data fetching disabled (MARKET_API_URL=off)");
            Arc::new(StaticReferenceData::empty())
        }
    };
    let content: Arc<dyn ContentStore> = Arc::new(IpfsContentStore::new(
        config.ipfs_api_url.clone(),
        config.call_timeout,
    )?);

    let coordinator = Arc::new(HybridCoordinator::new(
        connection.clone(),
        Arc::new(PgProjectionStore::new(pool.clone())),
        reference,
        metrics.clone(),
        config.call_timeout,
    ));
    let queries = Arc::new(QueryAdapter::new(
        connection.clone(),
        metrics.clone(),
        config.call_timeout,
    ));

    if config.connect_mode == ConnectMode::Eager {
        info!("Connecting to the ledger before serving (LEDGER_CONNECT_MODE=eager)");
        connection.connect().await?;
    }

    let hooks = ShutdownHooks::new();
    {
        let connection = connection.clone();
        hooks.register(async move { connection.reset().await }).await;
    }
    hooks.register(async move { pool.close().await }).await;

    let state = AppState {
        connection,
        coordinator,
        queries,
        content,
        metrics,
    };
    let app = build_router(state, config.cors_allow_origins.as_deref())?;

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("CropChain gateway is ready to accept connections");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Closing ledger session and database pool");
    hooks.run(SHUTDOWN_HOOK_TIMEOUT).await;

    if let Err(e) = &served {
        error!(error = %e, "HTTP server stopped with an error");
    }
    served?;
    Ok(())
}

/// Install the global subscriber. Filter comes from `RUST_LOG`, default `info`.
pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Assemble the full router: `/api`, health, readiness and metrics.
pub fn build_router(state: AppState, cors_origins: Option<&str>) -> anyhow::Result<Router> {
    let ledger = crate::api::ledger_router().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        crate::api::require_connected,
    ));
    let api = crate::api::router().merge(ledger);

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_snapshot))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer(cors_origins)? {
        router = router.layer(cors_layer);
    }

    Ok(router.with_state(state))
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origins) = origins.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(None);
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}

/// Liveness: the process is up, whatever the ledger connection is doing.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cropchain-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: 200 only while the ledger connection is `Connected`.
async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let snapshot = state.connection.state();
    let attempt = match snapshot.phase {
        crate::connection::ConnectionPhase::Connecting { attempt } => Some(attempt),
        _ => None,
    };

    let (status, label) = if snapshot.phase.is_connected() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    let body = serde_json::json!({
        "status": label,
        "phase": snapshot.phase.name(),
        "attempt": attempt,
        "lastError": snapshot.last_error,
    });

    (status, Json(body))
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut metrics = state.metrics.to_json().await;
    if let Some(object) = metrics.as_object_mut() {
        object.insert(
            "connection".to_string(),
            serde_json::json!({ "phase": state.connection.phase().name() }),
        );
    }
    Json(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_parsing() {
        assert!(cors_layer(None).unwrap().is_none());
        assert!(cors_layer(Some("  ")).unwrap().is_none());
        assert!(cors_layer(Some("*")).unwrap().is_some());
        assert!(cors_layer(Some("https://a.example, https://b.example"))
            .unwrap()
            .is_some());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}

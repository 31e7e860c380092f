//! lsk-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config,
//! picks the storage and gateway wiring, spawns the sweeps, and starts the
//! HTTP server. All route handlers live in `routes.rs`; all shared state
//! types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use lsk_config::{AppConfig, LoadedConfig};
use lsk_daemon::{
    routes,
    state::{AppState, BusNotifier, Wiring},
};
use lsk_directory::DevVault;
use lsk_lock::LocalLockService;
use lsk_payment::{HttpGateway, HttpGatewayConfig, PaymentGateway, UnconfiguredGateway};
use lsk_scheduler::{spawn_sweeps, NotificationSink, SchedulerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = load_config()?;
    let config = loaded.config;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let signing_key = match config.gateway.signing_key() {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "no gateway signing key in env; using the dev key (webhooks from a real provider will NOT verify)");
            b"dev-signing-key".to_vec()
        }
    };

    let gateway: Arc<dyn PaymentGateway> =
        match (&config.gateway.endpoint, &config.gateway.app_id) {
            (Some(endpoint), Some(app_id)) => Arc::new(
                HttpGateway::new(HttpGatewayConfig {
                    endpoint: endpoint.clone(),
                    app_id: app_id.clone(),
                    timeout: Duration::from_secs(config.gateway.timeout_secs),
                })
                .context("building gateway client")?,
            ),
            _ => {
                warn!("payment gateway not configured; checkouts fall back to the hosted simulation page");
                Arc::new(UnconfiguredGateway)
            }
        };

    let state = assemble_state(&config, signing_key, gateway).await?;

    lsk_daemon::state::spawn_heartbeat(state.bus.clone(), Duration::from_secs(1));

    let sink: Arc<dyn NotificationSink> = Arc::new(BusNotifier(state.bus.clone()));
    spawn_sweeps(
        Arc::clone(&state.orders),
        sink,
        SchedulerConfig {
            expiry_period_secs: config.scheduler.expiry_period_secs,
            reminder_period_secs: config.scheduler.reminder_period_secs,
            reminder_lookahead_secs: config.scheduler.reminder_lookahead_secs,
            stale_period_secs: config.scheduler.stale_period_secs,
            unpaid_timeout_secs: config.scheduler.unpaid_timeout_secs,
        },
    );

    let app = routes::build_router(Arc::clone(&state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = config
        .daemon
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.daemon.bind))?;
    info!("lsk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

/// Postgres-backed wiring when LSK_DATABASE_URL is set, in-memory
/// otherwise. The in-memory mode is an explicit single-node configuration,
/// lock service included.
async fn assemble_state(
    config: &AppConfig,
    signing_key: Vec<u8>,
    gateway: Arc<dyn PaymentGateway>,
) -> Result<Arc<AppState>> {
    if std::env::var(lsk_db::ENV_DB_URL).is_ok() {
        let pool = lsk_db::connect_from_env().await?;
        lsk_db::migrate(&pool).await?;
        info!("storage: postgres");
        Ok(AppState::assemble(Wiring {
            order_store: Arc::new(lsk_db::PgOrderStore::new(pool.clone())),
            payment_store: Arc::new(lsk_db::PgPaymentStore::new(pool.clone())),
            appeal_store: Arc::new(lsk_db::PgAppealStore::new(pool.clone())),
            directory: Arc::new(lsk_db::PgResourceDirectory::new(pool)),
            vault: Arc::new(DevVault::new()),
            locks: Arc::new(LocalLockService::new()),
            gateway,
            signing_key,
            config: config.clone(),
        }))
    } else {
        warn!("LSK_DATABASE_URL not set; running with in-memory stores and the in-process lock");
        Ok(AppState::assemble(Wiring {
            order_store: Arc::new(lsk_orders::MemoryOrderStore::new()),
            payment_store: Arc::new(lsk_payment::MemoryPaymentStore::new()),
            appeal_store: Arc::new(lsk_dispute::MemoryAppealStore::new()),
            directory: Arc::new(lsk_directory::MemoryDirectory::new()),
            vault: Arc::new(DevVault::new()),
            locks: Arc::new(LocalLockService::new()),
            gateway,
            signing_key,
            config: config.clone(),
        }))
    }
}

fn load_config() -> Result<LoadedConfig> {
    match std::env::var("LSK_CONFIG") {
        Ok(path) => lsk_config::load_layered_yaml(&[path.as_str()]),
        Err(_) => lsk_config::load_layered_yaml_from_strings(&["{}"]),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

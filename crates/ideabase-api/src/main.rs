//! ideabase-api - HTTP API server for IdeaBase

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ideabase_api::{build_router, AppState, CommitProtocol, ServerConfig, StorageSettings};
use ideabase_core::defaults;
use ideabase_db::{Database, FilesystemBackend, HttpObjectStore, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "ideabase_api=debug,ideabase_db=info,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ideabase_api=debug,ideabase_db=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("ideabase-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;

    // Database
    let pool =
        ideabase_db::create_pool_with_config(&config.database_url, config.pool.clone()).await?;
    let db = Database::with_session_ttl(pool, config.session_ttl);
    db.migrate().await?;
    info!(subsystem = "db", "Migrations applied");

    match db.accounts.cleanup_expired().await {
        Ok(removed) => info!(subsystem = "db", result_count = removed, "Expired sessions removed"),
        Err(e) => warn!(subsystem = "db", error = %e, "Session cleanup failed"),
    }

    // Object storage
    let storage: Arc<dyn StorageBackend> = match &config.storage {
        StorageSettings::Filesystem { path } => {
            let backend = FilesystemBackend::new(path.clone());
            if let Err(e) = backend.validate().await {
                anyhow::bail!("File storage at {} is unusable: {}", path.display(), e);
            }
            Arc::new(backend)
        }
        StorageSettings::Http(http) => Arc::new(HttpObjectStore::new(http.clone())?),
    };
    info!(
        subsystem = "storage",
        backend = storage.name(),
        bucket = %config.gateway.bucket,
        max_file_size = config.gateway.max_file_size,
        verify_content = config.gateway.verify_content,
        commit_protocol = config.gateway.commit_protocol.as_str(),
        "Upload gateway configured"
    );

    let state = AppState::from_database(&db, storage, config.gateway.clone());

    if config.gateway.commit_protocol == CommitProtocol::TwoPhase {
        let cutoff = Utc::now() - Duration::minutes(defaults::PENDING_RECONCILE_AFTER_MINUTES);
        match state.gateway.reconcile_pending(cutoff).await {
            Ok(report) if report.examined > 0 => info!(
                subsystem = "api",
                examined = report.examined,
                removed = report.removed,
                "Abandoned uploads reconciled at startup"
            ),
            Ok(_) => {}
            Err(e) => warn!(subsystem = "api", error = %e, "Startup reconciliation failed"),
        }
    }

    let app = build_router(state, &config.allowed_origins);

    // Start server
    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

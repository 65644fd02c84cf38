#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use room_sync_core::auth::{BearerForwardingVerifier, StaticTokenVerifier, TokenVerifier};
use room_sync_core::config;
use room_sync_core::metrics::RoomMetrics;
use room_sync_core::server::{self, SyncServer};
use room_sync_core::store::{InMemoryMetadataStore, MetadataStore};
use std::net::SocketAddr;
use std::sync::Arc;

/// room-sync-core -- synchronization and signaling server for a video
/// co-watching product
#[derive(Parser, Debug)]
#[command(name = "room-sync-core")]
#[command(about = "Synchronization and signaling core for a video co-watching product")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!(
                    "  Storage backend: {}",
                    if cfg.database_url.is_some() {
                        "Postgres"
                    } else {
                        "InMemory"
                    }
                );
                println!(
                    "  Identity provider: {}",
                    cfg.identity_provider_url
                        .as_deref()
                        .unwrap_or("static (development)")
                );
                println!(
                    "  Metrics auth required: {}",
                    cfg.metrics_auth_token.is_some()
                );
                println!("  Room id length: {}", cfg.room_id_length);
                println!(
                    "  Host reconnect grace: {}s",
                    cfg.host_reconnect_grace.as_secs()
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    let _logging_guard = room_sync_core::logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "starting room-sync-core");

    let store: Arc<dyn MetadataStore> = build_store(&cfg).await?;
    let token_verifier: Arc<dyn TokenVerifier> = build_token_verifier(&cfg);
    let metrics = Arc::new(RoomMetrics::new());

    let sync_server = SyncServer::new(cfg.clone(), store, token_verifier, metrics);
    server::spawn_maintenance(sync_server.clone());

    let app = room_sync_core::websocket::create_router(&cfg.cors_origins)
        .with_state(sync_server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn build_store(
    cfg: &room_sync_core::config::RoomSyncConfig,
) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match &cfg.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = room_sync_core::store::PostgresMetadataStore::connect(url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            tracing::warn!(
                "DATABASE_URL is set but the \"postgres\" feature is not enabled, falling back to in-memory storage"
            );
            Ok(Arc::new(InMemoryMetadataStore::new()))
        }
        None => Ok(Arc::new(InMemoryMetadataStore::new())),
    }
}

fn build_token_verifier(cfg: &room_sync_core::config::RoomSyncConfig) -> Arc<dyn TokenVerifier> {
    match &cfg.identity_provider_url {
        Some(url) => Arc::new(BearerForwardingVerifier::new(url.clone())),
        None => {
            tracing::warn!(
                "IDENTITY_PROVIDER_URL is unset, running with a static in-memory token verifier (development only)"
            );
            Arc::new(StaticTokenVerifier::new(Vec::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}

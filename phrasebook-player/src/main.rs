//! Phrasebook Player - Main entry point
//!
//! Pronunciation playback service for the phrasebook vocabulary app:
//! serves the clip catalog, plays one pronunciation clip at a time
//! through the shared audio output, and streams playback events to
//! clients over SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phrasebook_common::catalog::Catalog;
use phrasebook_common::config::resolve_manifest_path;
use phrasebook_player::api::{self, AppState};
use phrasebook_player::audio::CpalBackend;
use phrasebook_player::session::{PlaybackSession, SoloFocusArbiter};
use phrasebook_player::state::SharedState;

/// Command-line arguments for phrasebook-player
#[derive(Parser, Debug)]
#[command(name = "phrasebook-player")]
#[command(about = "Pronunciation playback service for phrasebook")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "PHRASEBOOK_PORT")]
    port: u16,

    /// Path to the catalog manifest (TOML)
    #[arg(short, long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phrasebook_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let manifest = resolve_manifest_path(args.catalog.as_deref(), "PHRASEBOOK_CATALOG")
        .context("Failed to resolve catalog manifest path")?;
    info!("Catalog manifest: {}", manifest.display());

    let catalog = Arc::new(
        Catalog::load(&manifest)
            .with_context(|| format!("Failed to load catalog from {}", manifest.display()))?,
    );
    info!(
        "Loaded catalog: {} categories, {} clips",
        catalog.categories().len(),
        catalog.clip_count()
    );

    let shared = Arc::new(SharedState::new());
    let arbiter = Arc::new(SoloFocusArbiter::new());
    let backend = Arc::new(CpalBackend::new().context("Failed to initialize audio output")?);

    let session = PlaybackSession::spawn(
        Arc::clone(&catalog),
        arbiter,
        backend,
        Arc::clone(&shared),
    );
    info!("Playback session initialized");

    let app = api::create_router(AppState {
        session: session.clone(),
        catalog,
        state: shared,
        port: args.port,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Release playback and focus before exiting
    let _ = session.stop().await;
    session.shutdown();

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

//! Enviro Service - sensor hub REST API, WebSocket fan-out, and device link.
//!
//! Run with: `cargo run -p enviro-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use enviro_service::{AppState, Config, api, link, recorder, simulator, ws};
use enviro_store::SensorStore;

/// Enviro Service - environmental sensor hub.
#[derive(Parser, Debug)]
#[command(name = "enviro-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Start the synthetic-data simulator regardless of config.
    #[arg(long)]
    simulate: bool,

    /// Never connect the cloud device link, even with complete credentials.
    #[arg(long)]
    no_link: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("enviro_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.simulate {
        config.simulator.enabled = true;
    }

    config.validate()?;

    // Create application state around a fresh store; the process entry
    // point owns the lifecycle, everything else gets a handle.
    let store = SensorStore::new(config.store.max_history_size);
    let state = AppState::new(store, config.clone());

    // Periodic history recorder
    recorder::spawn(Arc::clone(&state));

    // Synthetic-data simulator
    if config.simulator.enabled {
        simulator::start(Arc::clone(&state));
    }

    // Cloud device link (skipped silently when credentials are incomplete)
    if args.no_link {
        info!("device link disabled by flag");
    } else {
        link::auto_start(&state).await;
    }

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse()?;

    info!("Starting server on {}", addr);

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

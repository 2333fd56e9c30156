//! ContractFlow Server
//!
//! REST front end for bulk contract generation. Each stage of the flow is
//! its own endpoint so a browser client can drive the four steps:
//!
//! - Template intake (field discovery)
//! - Dataset intake and field auto-mapping
//! - Bulk generation through the document-generation API
//! - AI summary through the Gemini API
//! - Zip bundling of the results
//!
//! Provider credentials come from the environment (a `.env` file is loaded
//! when present).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use contractflow_core::{DocumentGenerator, Summarizer};
use contractflow_providers::{DocGenClient, GeminiClient, ProviderConfig};

mod api;
mod error;

use api::{
    handle_bundle_zip, handle_dataset, handle_generate_contracts, handle_health, handle_mapping,
    handle_summarize, handle_template,
};

/// Command-line arguments for the ContractFlow server
#[derive(Parser, Debug)]
#[command(name = "contractflow-server")]
#[command(about = "ContractFlow server for bulk contract generation")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Maximum request body size in megabytes
    #[arg(long, default_value = "50")]
    body_limit_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn DocumentGenerator>,
    pub summarizer: Arc<dyn Summarizer>,
}

/// All routes, without the per-IP rate limiter
pub fn router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/template", post(handle_template))
        .route("/api/dataset", post(handle_dataset))
        .route("/api/mapping", post(handle_mapping))
        .route("/api/generate-contracts", post(handle_generate_contracts))
        .route("/api/summarize", post(handle_summarize))
        .route("/api/bundle-zip", post(handle_bundle_zip))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ContractFlow server on {}:{}", args.host, args.port);

    let config = ProviderConfig::from_env().context("Failed to load provider configuration")?;
    let state = AppState {
        generator: Arc::new(DocGenClient::new(&config.docgen, config.timeout)?),
        summarizer: Arc::new(GeminiClient::new(&config.gemini, config.timeout)?),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .context("Failed to create rate limiter config")?,
    );

    let app = router(state, args.body_limit_mb * 1024 * 1024).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Body limit: {} MB", args.body_limit_mb);
    info!("Gemini model: {}", config.gemini.model);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use noscalp_core::{logging, Config};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn};

mod handlers;
mod state;

use state::AppState;

const API_BASE: &str = "/api/noScalpDapp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_config_path(&args)?;
    let config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default_config(),
    };

    logging::init_from_config(&config.logging);
    if config_path.is_none() {
        warn!("No --config given, using the built-in demo network");
    }

    let state = Arc::new(AppState::new(config.clone())?);
    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind(&config.node.listen_addr).await?;
    info!(
        node = %state.node.identity().name,
        addr = %config.node.listen_addr,
        peers = config.network.peers.len(),
        "NoScalp node listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/me", get(handlers::whoami))
        .route("/peers", get(handlers::peers))
        .route("/distributions", get(handlers::distributions))
        .route("/create-distribution", post(handlers::create_distribution));

    Router::new()
        .route("/health", get(health_check))
        .nest(API_BASE, api)
        .with_state(state)
        .layer(ServiceBuilder::new().into_inner())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "noscalp-node",
        "node": state.config.node.legal_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn parse_config_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let mut args_iter = args.iter();
    while let Some(arg) = args_iter.next() {
        if arg == "--config" {
            return match args_iter.next() {
                Some(path) => Ok(Some(PathBuf::from(path))),
                None => Err(anyhow::anyhow!("--config was provided without a path")),
            };
        }
    }
    Ok(None)
}

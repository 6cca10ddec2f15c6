use anyhow::Context;
use axum::{extract::State, http::HeaderValue, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    config::{Config, LogFormat},
    controllers, AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let json_logs = config.app.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!("Starting cinema booking API ({})", config.app.environment);

    // БД, миграции, Redis и сервисы ядра
    let app_state = AppState::new(config.clone())
        .await
        .context("failed to initialise application state")?;

    let origin = config
        .app
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .context("CORS_ALLOWED_ORIGIN must be a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let host: std::net::IpAddr = config
        .app
        .host
        .parse()
        .context("HOST must be an IP address")?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match sqlx::query("SELECT 1").execute(&state.db.pool).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "DB unavailable")
        }
    }
}

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conference_registration::{
    config::{Config, LogFormat},
    controllers, AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    let registry = tracing_subscriber::registry().with(filter);

    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    match &config.app.cors_allowed_origin {
        Some(origin) => Ok(CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any)),
        None => Ok(CorsLayer::permissive()),
    }
}

// База и Redis должны отвечать
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db.pool).await.is_ok();
    let redis_ok = state.redis.ping().await;

    if db_ok && redis_ok {
        (StatusCode::OK, "OK")
    } else {
        tracing::warn!(db_ok, redis_ok, "Health check failed");
        (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    init_tracing(&config);
    info!(environment = %config.app.environment, "Starting Conference Registration API");

    let cors = cors_layer(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port).parse()?;

    let app_state = AppState::new(config).await?;

    let app = Router::new()
        .route("/", get(|| async { "Conference Registration API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

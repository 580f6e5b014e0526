use postlogs_portal::{
    AppState,
    api::{ApiClientState, HttpApiClient},
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, builds the PostLogs API client and
/// serves the portal.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "postlogs_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal starting in {:?} mode", config.env);
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        api_url = %config.api_url,
        verified_sessions = config.session_secret.is_some(),
        expiry_unit = ?config.expiry_unit,
        match_mode = ?config.routes.matching,
        "Session guard configured"
    );

    // 3. PostLogs API client
    let client = HttpApiClient::new(&config.api_url, config.api_timeout)
        .expect("FATAL: Failed to build the PostLogs API client.");
    let api = Arc::new(client) as ApiClientState;

    // 4. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(api, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API description available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}

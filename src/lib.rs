use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, StatusCode},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod session;

pub mod routes;
use routes::{protected, public};

// --- Public Re-exports ---

pub use api::{ApiClient, ApiClientState, HttpApiClient};
pub use config::AppConfig;
pub use guard::{GuardState, RouteGuard};

/// ApiDoc
///
/// OpenAPI description of the portal's pages and actions, served at
/// `/api-docs/openapi.json` for whoever builds the rendering layer.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page, handlers::register_page, handlers::login, handlers::register,
        handlers::logout, handlers::home, handlers::get_profile, handlers::update_profile,
        handlers::delete_profile, handlers::new_post_page, handlers::create_post,
        handlers::get_post, handlers::update_post, handlers::like_post
    ),
    components(
        schemas(
            models::User, models::Post, models::HomeFeed, models::Page, models::LoginRequest,
            models::RegisterRequest, models::UpdateUserRequest, models::PostRequest,
        )
    ),
    tags(
        (name = "postlogs-portal", description = "PostLogs client-facing pages and actions")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Client for the PostLogs API.
    pub api: ApiClientState,
    /// Route guard, also consulted by the session extractors.
    pub guard: GuardState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the guard from `config` so the middleware and the extractors
    /// always agree on what a live session is.
    pub fn new(api: ApiClientState, config: AppConfig) -> Self {
        let guard = std::sync::Arc::new(config.route_guard());
        Self { api, guard, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ApiClientState {
    fn from_ref(app_state: &AppState) -> ApiClientState {
        app_state.api.clone()
    }
}

impl FromRef<AppState> for GuardState {
    fn from_ref(app_state: &AppState) -> GuardState {
        app_state.guard.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the portal's routes and wraps the whole router, fallback
/// included, in the route guard, so every request path goes through it.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected::protected_routes())
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state.clone());

    base_router
        // The guard sits inside the tracing layers so its redirects are logged
        // under the request's span.
        .layer(middleware::from_fn_with_state(
            state.guard.clone(),
            guard::route_guard,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for each HTTP request, tagged with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = %request.uri().path(),
        req_id = %request_id,
    )
}

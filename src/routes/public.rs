use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages and actions reachable without a session. Note that `/` is also an
/// auth-only route: the route guard redirects visitors with a live session
/// to the home page before these handlers run.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Sign-in page.
        .route("/", get(handlers::login_page))
        // GET/POST /register
        // Sign-up page and form submission.
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        // POST /login
        // Exchanges credentials for the `session` cookie.
        .route("/login", post(handlers::login))
        // POST /logout
        // Drops the `session` cookie.
        .route("/logout", post(handlers::logout))
}

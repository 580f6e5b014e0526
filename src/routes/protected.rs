use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Protected Router Module
///
/// Pages and actions that act on behalf of the signed-in user. The route
/// guard already keeps sessionless requests away from these paths; each
/// handler still resolves the session through the `Session`/`CurrentUser`
/// extractors to obtain the token it forwards to the PostLogs API.
pub fn protected_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /home
        // Post feed plus the signed-in user.
        .route("/home", get(handlers::home))
        // GET/PUT/DELETE /profile
        // Profile page, profile form, account deletion.
        .route(
            "/profile",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        // GET/POST /post
        // New-post page and form submission.
        .route(
            "/post",
            get(handlers::new_post_page).post(handlers::create_post),
        )
        // GET/PUT /post/{id}
        // Edit page for a single post and its form submission.
        .route(
            "/post/{id}",
            get(handlers::get_post).put(handlers::update_post),
        )
        // POST /post/{id}/like
        .route("/post/{id}/like", post(handlers::like_post))
}

use crate::{
    AppState,
    auth::{CurrentUser, Session},
    error::AppError,
    models::{
        HomeFeed, LoginRequest, Page, Post, PostRequest, RegisterRequest, UpdateUserRequest, User,
    },
    session::{SESSION_COOKIE, removal_cookie},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::info;
use uuid::Uuid;

// --- Public pages and actions ---

/// login_page
///
/// [Public Route] Data for the sign-in page. A visitor with a live session
/// never gets here: the route guard sends them home first.
#[utoipa::path(get, path = "/", responses((status = 200, body = Page)))]
pub async fn login_page() -> Json<Page> {
    Json(Page::named("login"))
}

#[utoipa::path(get, path = "/register", responses((status = 200, body = Page)))]
pub async fn register_page() -> Json<Page> {
    Json(Page::named("register"))
}

/// login
///
/// [Public Route] Exchanges credentials for a session token and stores it in
/// the `session` cookie, then sends the browser to the home page.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 303, description = "Signed in, redirect to /home"),
        (status = 401, description = "Wrong credentials"),
        (status = 422, description = "Invalid form")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Redirect), AppError> {
    let payload = payload.prepare()?;
    let token = state.api.login(&payload).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    info!("User signed in");
    Ok((jar.add(cookie), Redirect::to(&state.config.routes.home)))
}

/// register
///
/// [Public Route] Creates an account. The user signs in separately afterwards.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses((status = 201, description = "Account created"), (status = 422, description = "Invalid form"))
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<StatusCode, AppError> {
    let payload = payload.prepare()?;
    state.api.register(&payload).await?;
    info!(nick = %payload.nick, "Account registered");
    Ok(StatusCode::CREATED)
}

/// logout
///
/// Drops the session cookie. Works with or without a live session.
#[utoipa::path(post, path = "/logout", responses((status = 303, description = "Redirect to /")))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    (
        jar.add(removal_cookie()),
        Redirect::to(&state.config.routes.login),
    )
}

// --- Protected pages and actions ---

/// home
///
/// [Protected Route] The signed-in user and the post feed.
#[utoipa::path(get, path = "/home", responses((status = 200, body = HomeFeed)))]
pub async fn home(
    CurrentUser { id, session }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<HomeFeed>, AppError> {
    let posts = state.api.get_posts(&session.token).await?;
    let user = state.api.get_user(&session.token, id).await?;
    Ok(Json(HomeFeed { user, posts }))
}

#[utoipa::path(get, path = "/profile", responses((status = 200, body = User)))]
pub async fn get_profile(
    CurrentUser { id, session }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = state.api.get_user(&session.token, id).await?;
    Ok(Json(user))
}

/// update_profile
///
/// [Protected Route] Saves the profile form for the signed-in user.
#[utoipa::path(
    put,
    path = "/profile",
    request_body = UpdateUserRequest,
    responses((status = 204, description = "Updated"), (status = 422, description = "Invalid form"))
)]
pub async fn update_profile(
    CurrentUser { id, session }: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<StatusCode, AppError> {
    let payload = payload.prepare()?;
    state.api.update_user(&session.token, id, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_profile
///
/// [Protected Route] Deletes the account, then ends the session the same
/// way logout does.
#[utoipa::path(delete, path = "/profile", responses((status = 303, description = "Account deleted, redirect to /")))]
pub async fn delete_profile(
    CurrentUser { id, session }: CurrentUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    state.api.delete_user(&session.token, id).await?;
    info!(user_id = %id, "Account deleted");
    Ok((
        jar.add(removal_cookie()),
        Redirect::to(&state.config.routes.login),
    ))
}

#[utoipa::path(get, path = "/post", responses((status = 200, body = Page)))]
pub async fn new_post_page(_session: Session) -> Json<Page> {
    Json(Page::named("new_post"))
}

#[utoipa::path(
    post,
    path = "/post",
    request_body = PostRequest,
    responses((status = 201, description = "Post created"), (status = 422, description = "Invalid form"))
)]
pub async fn create_post(
    session: Session,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<StatusCode, AppError> {
    let payload = payload.prepare()?;
    state.api.create_post(&session.token, &payload).await?;
    Ok(StatusCode::CREATED)
}

/// get_post
///
/// [Protected Route] A single post, used to prefill the edit form.
#[utoipa::path(
    get,
    path = "/post/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 200, body = Post), (status = 404, description = "Not Found"))
)]
pub async fn get_post(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let post = state.api.get_post(&session.token, id).await?;
    Ok(Json(post))
}

/// update_post
///
/// [Protected Route] Saves the edit form. Ownership is enforced by the API.
#[utoipa::path(
    put,
    path = "/post/{id}",
    request_body = PostRequest,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 204, description = "Updated"), (status = 403, description = "Not the author"))
)]
pub async fn update_post(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostRequest>,
) -> Result<StatusCode, AppError> {
    let payload = payload.prepare()?;
    state.api.update_post(&session.token, id, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/post/{id}/like",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 204, description = "Liked"))
)]
pub async fn like_post(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.api.like_post(&session.token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use postlogs_portal::{
    api::{ApiClient, ApiError, HttpApiClient},
    models::{LoginRequest, PostRequest, RegisterRequest, UpdateUserRequest},
};
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;
use uuid::Uuid;

const TOKEN: &str = "tok-123";
const USER_ID: Uuid = Uuid::from_u128(7);
// Belongs to an account that has no posts in its feed yet.
const FRESH_TOKEN: &str = "tok-fresh";

// --- Stand-in for the PostLogs API ---

/// Every request the stand-in received, as `"<METHOD> <path> <bearer|->"`.
type Seen = Arc<Mutex<Vec<String>>>;

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("-")
        .to_string()
}

fn authorized(headers: &HeaderMap) -> bool {
    bearer(headers) == TOKEN
}

async fn login(State(seen): State<Seen>, Json(body): Json<Value>) -> impl IntoResponse {
    seen.lock().unwrap().push(format!("POST /api/login {}", body["email"]));
    if body["password"] == "secret" {
        (StatusCode::OK, Json(json!({ "id": USER_ID, "token": TOKEN }))).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, r#"{"error":"wrong password"}"#).into_response()
    }
}

async fn create_user(State(seen): State<Seen>, Json(body): Json<Value>) -> StatusCode {
    seen.lock()
        .unwrap()
        .push(format!("POST /api/users {}", body["nick"]));
    StatusCode::CREATED
}

async fn user(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<Uuid>) -> impl IntoResponse {
    seen.lock()
        .unwrap()
        .push(format!("GET /api/users/{id} {}", bearer(&headers)));
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "id": id,
        "name": "Ana",
        "nick": "ana",
        "email": "ana@example.com",
        "created_at": "2024-03-01T12:00:00Z"
    }))
    .into_response()
}

async fn update_user(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> StatusCode {
    seen.lock()
        .unwrap()
        .push(format!("PUT /api/users/{id} {} {}", bearer(&headers), body["nick"]));
    StatusCode::NO_CONTENT
}

async fn delete_user(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<Uuid>) -> StatusCode {
    seen.lock()
        .unwrap()
        .push(format!("DELETE /api/users/{id} {}", bearer(&headers)));
    StatusCode::NO_CONTENT
}

async fn posts(State(seen): State<Seen>, headers: HeaderMap) -> impl IntoResponse {
    seen.lock()
        .unwrap()
        .push(format!("GET /api/posts {}", bearer(&headers)));
    if bearer(&headers) == FRESH_TOKEN {
        return Json(Value::Null).into_response();
    }
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "token contains an invalid number of segments")
            .into_response();
    }
    Json(json!([{
        "id": Uuid::from_u128(1),
        "title": "Hello",
        "content": "First",
        "authorId": USER_ID,
        "authorNick": "ana",
        "likes": 2,
        "createdAt": "2024-03-01T12:00:00Z"
    }]))
    .into_response()
}

async fn create_post(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    seen.lock()
        .unwrap()
        .push(format!("POST /api/posts {} {}", bearer(&headers), body["title"]));
    StatusCode::CREATED
}

async fn post_by_id(State(seen): State<Seen>, Path(id): Path<Uuid>) -> impl IntoResponse {
    seen.lock().unwrap().push(format!("GET /api/posts/{id}"));
    if id == Uuid::from_u128(1) {
        Json(json!({ "id": id, "title": "Hello", "content": "First", "likes": 0 })).into_response()
    } else {
        (StatusCode::NOT_FOUND, "post not found").into_response()
    }
}

async fn update_post(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> StatusCode {
    seen.lock()
        .unwrap()
        .push(format!("PUT /api/posts/{id} {} {}", bearer(&headers), body["content"]));
    StatusCode::NO_CONTENT
}

async fn like(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<Uuid>) -> StatusCode {
    seen.lock()
        .unwrap()
        .push(format!("POST /api/posts/{id}/like {}", bearer(&headers)));
    StatusCode::NO_CONTENT
}

async fn spawn_remote() -> (HttpApiClient, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route("/api/login", post(login))
        .route("/api/users", post(create_user))
        .route(
            "/api/users/{id}",
            get(user).put(update_user).delete(delete_user),
        )
        .route("/api/posts", get(posts).post(create_post))
        .route("/api/posts/{id}", get(post_by_id).put(update_post))
        .route("/api/posts/{id}/like", post(like))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}/", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = HttpApiClient::new(&address, Duration::from_secs(5)).unwrap();
    (client, seen)
}

fn seen(log: &Seen) -> Vec<String> {
    log.lock().unwrap().clone()
}

// --- Tests ---

#[tokio::test]
async fn test_login_returns_token() {
    let (client, log) = spawn_remote().await;

    let token = client
        .login(&LoginRequest {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(token, TOKEN);
    assert_eq!(seen(&log), vec![r#"POST /api/login "ana@example.com""#.to_string()]);
}

#[tokio::test]
async fn test_login_failure_carries_remote_message() {
    let (client, _) = spawn_remote().await;

    let err = client
        .login(&LoginRequest {
            email: "ana@example.com".to_string(),
            password: "nope".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, r#"{"error":"wrong password"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_register_posts_to_users() {
    let (client, log) = spawn_remote().await;

    client
        .register(&RegisterRequest {
            email: "bia@example.com".to_string(),
            name: "Bia".to_string(),
            nick: "bia".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(seen(&log), vec![r#"POST /api/users "bia""#.to_string()]);
}

#[tokio::test]
async fn test_user_calls_send_bearer_token() {
    let (client, log) = spawn_remote().await;

    let user = client.get_user(TOKEN, USER_ID).await.unwrap();
    assert_eq!(user.id, USER_ID);
    assert_eq!(user.nick, "ana");
    assert!(user.created_at.is_some());

    client
        .update_user(
            TOKEN,
            USER_ID,
            &UpdateUserRequest {
                name: "Ana".to_string(),
                nick: "anam".to_string(),
                email: "ana@example.com".to_string(),
            },
        )
        .await
        .unwrap();
    client.delete_user(TOKEN, USER_ID).await.unwrap();

    assert_eq!(
        seen(&log),
        vec![
            format!("GET /api/users/{USER_ID} {TOKEN}"),
            format!(r#"PUT /api/users/{USER_ID} {TOKEN} "anam""#),
            format!("DELETE /api/users/{USER_ID} {TOKEN}"),
        ]
    );
}

#[tokio::test]
async fn test_post_calls() {
    let (client, log) = spawn_remote().await;
    let post_id = Uuid::from_u128(1);

    let feed = client.get_posts(TOKEN).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].author_id, USER_ID);
    assert_eq!(feed[0].author_nick, "ana");
    assert_eq!(feed[0].likes, 2);

    let post = client.get_post(TOKEN, post_id).await.unwrap();
    assert_eq!(post.title, "Hello");

    let form = PostRequest {
        title: "Hello".to_string(),
        content: "Edited".to_string(),
    };
    client.create_post(TOKEN, &form).await.unwrap();
    client.update_post(TOKEN, post_id, &form).await.unwrap();
    client.like_post(TOKEN, post_id).await.unwrap();

    assert_eq!(
        seen(&log),
        vec![
            format!("GET /api/posts {TOKEN}"),
            format!("GET /api/posts/{post_id}"),
            format!(r#"POST /api/posts {TOKEN} "Hello""#),
            format!(r#"PUT /api/posts/{post_id} {TOKEN} "Edited""#),
            format!("POST /api/posts/{post_id}/like {TOKEN}"),
        ]
    );
}

#[tokio::test]
async fn test_null_feed_is_empty() {
    let (client, _) = spawn_remote().await;

    let feed = client.get_posts(FRESH_TOKEN).await.unwrap();

    assert!(feed.is_empty());
}

#[tokio::test]
async fn test_rejected_token_maps_to_status_error() {
    let (client, _) = spawn_remote().await;

    let err = client.get_posts("stale").await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_missing_post_maps_to_not_found() {
    let (client, _) = spawn_remote().await;

    let err = client.get_post(TOKEN, Uuid::nil()).await.unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "post not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = HttpApiClient::new(&address, Duration::from_secs(2)).unwrap();
    let err = client.get_posts(TOKEN).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
}

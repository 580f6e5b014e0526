#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use postlogs_portal::{
    AppConfig, AppState, create_router,
    api::{ApiClient, ApiError},
    models::{LoginRequest, Post, PostRequest, RegisterRequest, UpdateUserRequest, User},
    session::Claims,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-value-1234567890";
pub const TEST_USER_ID: Uuid = Uuid::from_u128(1);
pub const TEST_TOKEN: &str = "tok-123";

// --- Token helpers ---

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// HS256 token with the given claims, signed with [`TEST_SECRET`].
pub fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn session_token(user_id: Option<Uuid>, exp: Option<i64>) -> String {
    let claims = Claims {
        user_id: user_id.map(|id| id.to_string()),
        sub: None,
        exp,
    };
    sign(&claims, TEST_SECRET)
}

/// Token for [`TEST_USER_ID`] that stays valid for an hour.
pub fn live_token() -> String {
    session_token(Some(TEST_USER_ID), Some(now() + 3600))
}

pub fn expired_token() -> String {
    session_token(Some(TEST_USER_ID), Some(now() - 60))
}

// --- Stub PostLogs API ---

/// StubApi
///
/// Records every call as `"<operation>:<detail>"` and answers from canned data.
pub struct StubApi {
    pub calls: Mutex<Vec<String>>,
    /// Token handed out by `login`; `None` makes login fail with 401.
    pub login_token: Option<String>,
    pub user: User,
    pub posts: Vec<Post>,
    /// When set, every call except `login` fails with this remote status.
    pub fail_status: Option<u16>,
    /// When set, every call except `login` fails as an undecodable reply.
    pub broken: bool,
}

impl Default for StubApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            login_token: Some(TEST_TOKEN.to_string()),
            user: User {
                id: TEST_USER_ID,
                name: "Ana".to_string(),
                nick: "ana".to_string(),
                email: "ana@example.com".to_string(),
                created_at: None,
            },
            posts: vec![Post {
                id: Uuid::from_u128(42),
                title: "Hello".to_string(),
                content: "First post".to_string(),
                author_id: TEST_USER_ID,
                author_nick: "ana".to_string(),
                likes: 3,
                created_at: None,
            }],
            fail_status: None,
            broken: false,
        }
    }
}

impl StubApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.broken {
            return Err(ApiError::Decode("expected value at line 1".to_string()));
        }
        match self.fail_status {
            Some(status) => Err(ApiError::Status {
                status,
                message: format!("remote said {status}"),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ApiClient for StubApi {
    async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        self.record(format!("register:{}", req.nick))
    }

    async fn login(&self, req: &LoginRequest) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push(format!("login:{}", req.email));
        self.login_token.clone().ok_or(ApiError::Status {
            status: 401,
            message: "crypto/bcrypt: hashedPassword is not the hash of the given password"
                .to_string(),
        })
    }

    async fn get_user(&self, token: &str, id: Uuid) -> Result<User, ApiError> {
        self.record(format!("get_user:{id}:{}", token.len()))?;
        Ok(self.user.clone())
    }

    async fn update_user(
        &self,
        _token: &str,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<(), ApiError> {
        self.record(format!("update_user:{id}:{}", req.nick))
    }

    async fn delete_user(&self, _token: &str, id: Uuid) -> Result<(), ApiError> {
        self.record(format!("delete_user:{id}"))
    }

    async fn get_posts(&self, _token: &str) -> Result<Vec<Post>, ApiError> {
        self.record("get_posts".to_string())?;
        Ok(self.posts.clone())
    }

    async fn get_post(&self, _token: &str, id: Uuid) -> Result<Post, ApiError> {
        self.record(format!("get_post:{id}"))?;
        self.posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: "post not found".to_string(),
            })
    }

    async fn create_post(&self, _token: &str, req: &PostRequest) -> Result<(), ApiError> {
        self.record(format!("create_post:{}", req.title))
    }

    async fn update_post(&self, _token: &str, id: Uuid, req: &PostRequest) -> Result<(), ApiError> {
        self.record(format!("update_post:{id}:{}", req.title))
    }

    async fn like_post(&self, _token: &str, id: Uuid) -> Result<(), ApiError> {
        self.record(format!("like_post:{id}"))
    }
}

// --- Router helpers ---

pub fn app(api: Arc<StubApi>) -> Router {
    app_with_config(api, AppConfig::default())
}

pub fn app_with_config(api: Arc<StubApi>, config: AppConfig) -> Router {
    create_router(AppState::new(api, config))
}

pub fn request(method: &str, path: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(
    method: &str,
    path: &str,
    session: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// True when the response tells the browser to drop the `session` cookie.
pub fn clears_session(response: &Response<Body>) -> bool {
    set_cookies(response)
        .iter()
        .any(|cookie| cookie.starts_with("session=;") && cookie.contains("Max-Age=0"))
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

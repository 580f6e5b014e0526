use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    AuthResponse, LoginRequest, Post, PostRequest, RegisterRequest, UpdateUserRequest, User,
};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status. `message` is the raw response text.
    #[error("PostLogs API responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("PostLogs API unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("PostLogs API returned an unexpected body: {0}")]
    Decode(String),
}

/// ApiClient
///
/// Every call the portal makes to the PostLogs API. Authenticated calls take
/// the raw session token, which is forwarded as a bearer credential.
///
/// Handlers only see this trait, so tests swap in a stub without a network.
#[async_trait]
pub trait ApiClient: Send + Sync {
    // --- Accounts ---
    async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError>;
    // Exchanges credentials for a session token.
    async fn login(&self, req: &LoginRequest) -> Result<String, ApiError>;
    async fn get_user(&self, token: &str, id: Uuid) -> Result<User, ApiError>;
    async fn update_user(
        &self,
        token: &str,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<(), ApiError>;
    async fn delete_user(&self, token: &str, id: Uuid) -> Result<(), ApiError>;

    // --- Posts ---
    async fn get_posts(&self, token: &str) -> Result<Vec<Post>, ApiError>;
    async fn get_post(&self, token: &str, id: Uuid) -> Result<Post, ApiError>;
    async fn create_post(&self, token: &str, req: &PostRequest) -> Result<(), ApiError>;
    async fn update_post(&self, token: &str, id: Uuid, req: &PostRequest) -> Result<(), ApiError>;
    async fn like_post(&self, token: &str, id: Uuid) -> Result<(), ApiError>;
}

pub type ApiClientState = Arc<dyn ApiClient>;

/// HttpApiClient
///
/// `reqwest` implementation of [`ApiClient`]. One pooled client is shared by
/// all requests.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Sends the request and turns any non-2xx reply into [`ApiError::Status`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "PostLogs API replied");

        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "PostLogs API rejected request");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("users")).json(req))
            .await?;
        Ok(())
    }

    async fn login(&self, req: &LoginRequest) -> Result<String, ApiError> {
        let auth: AuthResponse = self
            .json(self.client.post(self.url("login")).json(req))
            .await?;
        Ok(auth.token)
    }

    async fn get_user(&self, token: &str, id: Uuid) -> Result<User, ApiError> {
        self.json(self.client.get(self.url(&format!("users/{id}"))).bearer_auth(token))
            .await
    }

    async fn update_user(
        &self,
        token: &str,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<(), ApiError> {
        self.send(
            self.client
                .put(self.url(&format!("users/{id}")))
                .bearer_auth(token)
                .json(req),
        )
        .await?;
        Ok(())
    }

    async fn delete_user(&self, token: &str, id: Uuid) -> Result<(), ApiError> {
        self.send(
            self.client
                .delete(self.url(&format!("users/{id}")))
                .bearer_auth(token),
        )
        .await?;
        Ok(())
    }

    async fn get_posts(&self, token: &str) -> Result<Vec<Post>, ApiError> {
        // The API encodes an empty feed as `null`.
        let posts: Option<Vec<Post>> = self
            .json(self.client.get(self.url("posts")).bearer_auth(token))
            .await?;
        Ok(posts.unwrap_or_default())
    }

    async fn get_post(&self, token: &str, id: Uuid) -> Result<Post, ApiError> {
        self.json(self.client.get(self.url(&format!("posts/{id}"))).bearer_auth(token))
            .await
    }

    async fn create_post(&self, token: &str, req: &PostRequest) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("posts")).bearer_auth(token).json(req))
            .await?;
        Ok(())
    }

    async fn update_post(&self, token: &str, id: Uuid, req: &PostRequest) -> Result<(), ApiError> {
        self.send(
            self.client
                .put(self.url(&format!("posts/{id}")))
                .bearer_auth(token)
                .json(req),
        )
        .await?;
        Ok(())
    }

    async fn like_post(&self, token: &str, id: Uuid) -> Result<(), ApiError> {
        self.send(
            self.client
                .post(self.url(&format!("posts/{id}/like")))
                .bearer_auth(token),
        )
        .await?;
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationError;

// --- Resources returned by the PostLogs API ---

/// User
///
/// A registered account as the PostLogs API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub nick: String,
    pub email: String,
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Post
///
/// A short text post with its like counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub author_nick: String,
    pub likes: u64,
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
}

/// AuthResponse
///
/// Body of a successful `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub token: String,
}

// --- Page data ---

/// HomeFeed
///
/// Everything the home page shows: the signed-in user and the post feed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HomeFeed {
    pub user: User,
    pub posts: Vec<Post>,
}

/// Page
///
/// Data for pages that only render a form. The rendering layer picks the
/// template by `name`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Page {
    pub name: String,
}

impl Page {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

// --- Form payloads ---

/// LoginRequest
///
/// Credentials submitted by the login form. Forwarded as-is to the API.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// Sign-up form. The password is only passed through to the API and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub nick: String,
    pub password: String,
}

/// UpdateUserRequest
///
/// Profile form. Password changes are not part of it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: String,
    pub nick: String,
    pub email: String,
}

/// PostRequest
///
/// Create and edit form for a post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
}

// --- Preparation: trim, then validate ---

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    Ok(trimmed.to_string())
}

fn email(value: &str) -> Result<String, ValidationError> {
    let email = required("email", value)?;
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None)
            if !local.is_empty() && !domain.is_empty() && !domain.contains(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

impl LoginRequest {
    pub fn prepare(self) -> Result<Self, ValidationError> {
        let email = email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::Blank("password"));
        }
        Ok(Self {
            email,
            password: self.password,
        })
    }
}

impl RegisterRequest {
    /// Passwords are checked for presence only, never trimmed.
    pub fn prepare(self) -> Result<Self, ValidationError> {
        let name = required("name", &self.name)?;
        let nick = required("nick", &self.nick)?;
        let email = email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::Blank("password"));
        }
        Ok(Self {
            email,
            name,
            nick,
            password: self.password,
        })
    }
}

impl UpdateUserRequest {
    pub fn prepare(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", &self.name)?,
            nick: required("nick", &self.nick)?,
            email: email(&self.email)?,
        })
    }
}

impl PostRequest {
    pub fn prepare(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: required("title", &self.title)?,
            content: required("content", &self.content)?,
        })
    }
}

use axum_extra::extract::cookie::Cookie;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::debug;

/// Name of the cookie carrying the session token issued by the remote API.
pub const SESSION_COOKIE: &str = "session";

/// Claims
///
/// The decoded payload of a session token. Only the fields the portal reads are
/// modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier as written by the PostLogs API.
    #[serde(
        rename = "userId",
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Standard subject claim, used when `userId` is absent.
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,
    /// Expiry timestamp, floored to a whole unit. Its unit is decided by
    /// [`ExpiryUnit`]. A non-numeric `exp` reads as absent.
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
}

/// Strings and numbers are kept as text; any other JSON type reads as absent.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

/// Any JSON number, fractional ones floored. Flooring keeps the strict
/// `now > exp` comparison exact for whole-unit clocks.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(exp) => exp
            .as_i64()
            .or_else(|| exp.as_f64().map(|exp| exp.floor() as i64)),
        _ => None,
    })
}

impl Claims {
    /// The user this session belongs to, if the issuer wrote one.
    pub fn subject(&self) -> Option<&str> {
        self.user_id.as_deref().or(self.sub.as_deref())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("token is not in compact JWS form")]
    Format,
    #[error("token payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("token claims are not valid JSON: {0}")]
    Claims(#[from] serde_json::Error),
    #[error("token rejected: {0}")]
    Signature(#[from] jsonwebtoken::errors::Error),
}

/// SessionDecoder
///
/// Capability that turns a raw session token into [`Claims`]. The guard only
/// ever talks to this trait, so a verifying implementation can replace the
/// default unverified one without touching the guard's control flow.
pub trait SessionDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<Claims, SessionError>;
}

pub type DecoderState = Arc<dyn SessionDecoder>;

/// UnverifiedDecoder
///
/// Reads the payload segment of a compact JWS without checking the signature.
/// The issuer is trusted; this layer only needs the expiry.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedDecoder;

impl SessionDecoder for UnverifiedDecoder {
    fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(SessionError::Format);
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// VerifyingDecoder
///
/// HS256 decoder backed by `jsonwebtoken`. Expiry is not enforced
/// here: [`SessionPolicy`] owns the expiry rule for both decoders.
pub struct VerifyingDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl VerifyingDecoder {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl SessionDecoder for VerifyingDecoder {
    fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

/// ExpiryUnit
///
/// Unit of the `exp` claim. Registered JWT claims use seconds; the PostLogs API
/// writes milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryUnit {
    #[default]
    Seconds,
    Millis,
}

impl ExpiryUnit {
    pub fn timestamp(self, now: DateTime<Utc>) -> i64 {
        match self {
            ExpiryUnit::Seconds => now.timestamp(),
            ExpiryUnit::Millis => now.timestamp_millis(),
        }
    }
}

impl FromStr for ExpiryUnit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Ok(ExpiryUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(ExpiryUnit::Millis),
            other => Err(format!("unknown expiry unit '{other}'")),
        }
    }
}

/// State of the session cookie at a given instant. Everything except `Valid`
/// counts as unauthenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Valid,
    Absent,
    Malformed,
    MissingExpiry,
    Expired,
}

impl SessionState {
    pub fn is_valid(self) -> bool {
        self == SessionState::Valid
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Valid => "valid",
            SessionState::Absent => "absent",
            SessionState::Malformed => "malformed",
            SessionState::MissingExpiry => "missing_expiry",
            SessionState::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inspection {
    pub state: SessionState,
    pub claims: Option<Claims>,
}

/// SessionPolicy
///
/// Pairs a decoder with the expiry unit and answers one question: is this token
/// a live session right now?
#[derive(Clone)]
pub struct SessionPolicy {
    decoder: DecoderState,
    unit: ExpiryUnit,
}

impl SessionPolicy {
    pub fn new(decoder: DecoderState, unit: ExpiryUnit) -> Self {
        Self { decoder, unit }
    }

    /// Classify `token` at instant `now`.
    ///
    /// An empty cookie value counts as absent. A token without `exp` is never
    /// valid. `now == exp` is still valid: the session only lapses once the
    /// clock is strictly past its expiry.
    pub fn inspect(&self, token: Option<&str>, now: DateTime<Utc>) -> Inspection {
        let Some(token) = token.filter(|value| !value.is_empty()) else {
            return Inspection {
                state: SessionState::Absent,
                claims: None,
            };
        };

        let claims = match self.decoder.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Session token could not be decoded");
                return Inspection {
                    state: SessionState::Malformed,
                    claims: None,
                };
            }
        };

        let state = match claims.exp {
            None => SessionState::MissingExpiry,
            Some(exp) if self.unit.timestamp(now) > exp => SessionState::Expired,
            Some(_) => SessionState::Valid,
        };

        Inspection {
            state,
            claims: Some(claims),
        }
    }
}

/// Cookie that, once sent in `Set-Cookie`, makes the browser drop the session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

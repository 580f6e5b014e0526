use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::{
    guard::{MatchMode, RouteGuard, RouteTable},
    session::{DecoderState, ExpiryUnit, SessionPolicy, UnverifiedDecoder, VerifyingDecoder},
};

/// AppConfig
///
/// Holds the portal's entire configuration. Immutable once loaded and pulled
/// into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and fail-fast rules.
    pub env: Env,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the PostLogs API (users, posts, login).
    pub api_url: String,
    // Per-request timeout for calls to the PostLogs API.
    pub api_timeout: Duration,
    // Shared HS256 secret. When set, session tokens are signature-checked.
    pub session_secret: Option<String>,
    // Unit of the `exp` claim inside session tokens.
    pub expiry_unit: ExpiryUnit,
    // Route classification and landing pages used by the route guard.
    pub routes: RouteTable,
}

/// Env
///
/// Runtime context: pretty logs and relaxed defaults locally, JSON logs and
/// mandatory settings in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const DEFAULT_API_URL: &str = "http://localhost:9000";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for tests: local environment, unverified
    /// decoding, second-based expiry and the standard route table.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            session_secret: None,
            expiry_unit: ExpiryUnit::Seconds,
            routes: RouteTable::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `API_URL` is not set; the portal is useless
    /// without the API behind it.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_url = match env {
            Env::Production => {
                env::var("API_URL").expect("FATAL: API_URL must be set in production.")
            }
            Env::Local => env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };

        let defaults = RouteTable::default();
        let routes = RouteTable {
            protected: list_var("PROTECTED_ROUTES").unwrap_or(defaults.protected),
            auth: list_var("AUTH_ROUTES").unwrap_or(defaults.auth),
            public: list_var("PUBLIC_ROUTES").unwrap_or(defaults.public),
            matching: parsed_var("ROUTE_MATCH").unwrap_or(MatchMode::Segment),
            home: env::var("HOME_ROUTE").unwrap_or(defaults.home),
            login: env::var("LOGIN_ROUTE").unwrap_or(defaults.login),
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            api_url,
            api_timeout: Duration::from_secs(
                parsed_var("API_TIMEOUT_SECS").unwrap_or(DEFAULT_API_TIMEOUT_SECS),
            ),
            session_secret: env::var("SESSION_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty()),
            expiry_unit: parsed_var("SESSION_EXP_UNIT").unwrap_or_default(),
            routes,
        }
    }

    /// The session decoder this configuration asks for: verifying when a
    /// secret is configured, payload-only otherwise.
    pub fn decoder(&self) -> DecoderState {
        match &self.session_secret {
            Some(secret) => Arc::new(VerifyingDecoder::new(secret)),
            None => Arc::new(UnverifiedDecoder),
        }
    }

    /// Settings that load fine but are probably a deployment mistake. Logged
    /// at startup.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.expiry_unit == ExpiryUnit::Seconds {
            warnings.push(
                "SESSION_EXP_UNIT is seconds, but the PostLogs API writes millisecond \
                 expiries, so its tokens would never lapse. Set SESSION_EXP_UNIT=millis \
                 for that issuer.",
            );
        }
        warnings
    }

    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(
            self.routes.clone(),
            SessionPolicy::new(self.decoder(), self.expiry_unit),
        )
    }
}

/// Comma-separated list variable. Unset or blank falls back to the caller's default.
fn list_var(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    (!items.is_empty()).then_some(items)
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.trim().parse().ok()
}

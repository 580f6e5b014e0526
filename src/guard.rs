use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use std::{str::FromStr, sync::Arc};
use tracing::{debug, info};

use crate::session::{SESSION_COOKIE, SessionPolicy, SessionState, removal_cookie};

/// MatchMode
///
/// How a route pattern is compared against a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Plain string equality.
    Exact,
    /// Equality, or the path continues the pattern at a `/` boundary, so
    /// `/post` covers `/post/42` but not `/posts`. The root pattern `/` only
    /// ever matches `/`. A trailing slash on the path is ignored.
    #[default]
    Segment,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "segment" | "prefix" => Ok(MatchMode::Segment),
            other => Err(format!("unknown route match mode '{other}'")),
        }
    }
}

/// RouteTable
///
/// Static classification of the portal's path space plus the two landing
/// routes the guard redirects to. A path may sit in several sets at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    /// Reachable only with a live session.
    pub protected: Vec<String>,
    /// Reachable only without a live session.
    pub auth: Vec<String>,
    /// Reachable regardless. Informational; the guard never consults it.
    pub public: Vec<String>,
    pub matching: MatchMode,
    /// Authenticated landing page.
    pub home: String,
    /// Public landing page.
    pub login: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            protected: to_owned_list(&["/profile", "/home", "/post"]),
            auth: to_owned_list(&["/"]),
            public: to_owned_list(&["/", "/register"]),
            matching: MatchMode::Segment,
            home: "/home".to_string(),
            login: "/".to_string(),
        }
    }
}

impl RouteTable {
    pub fn is_protected(&self, path: &str) -> bool {
        self.matches_any(&self.protected, path)
    }

    pub fn is_auth(&self, path: &str) -> bool {
        self.matches_any(&self.auth, path)
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.matches_any(&self.public, path)
    }

    fn matches_any(&self, patterns: &[String], path: &str) -> bool {
        patterns
            .iter()
            .any(|pattern| route_matches(self.matching, pattern, path))
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn route_matches(mode: MatchMode, pattern: &str, path: &str) -> bool {
    match mode {
        MatchMode::Exact => pattern == path,
        MatchMode::Segment => {
            let pattern = trim_trailing_slash(pattern);
            let path = trim_trailing_slash(path);
            if pattern == "/" {
                return path == "/";
            }
            path.strip_prefix(pattern)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        }
    }
}

/// What the guard wants done with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision<'a> {
    /// Hand the request to the router untouched.
    Pass,
    /// Live session on an auth-only route: send the user to the authenticated landing.
    Authenticated { location: &'a str },
    /// Dead session on a protected route: drop the cookie and send the user to
    /// the public landing.
    Invalidated {
        location: &'a str,
        reason: SessionState,
    },
}

/// RouteGuard
///
/// Decides, per request, between pass-through and the two redirects. Holds
/// only immutable configuration, so one instance serves every request
/// concurrently.
pub struct RouteGuard {
    routes: RouteTable,
    policy: SessionPolicy,
}

pub type GuardState = Arc<RouteGuard>;

impl RouteGuard {
    pub fn new(routes: RouteTable, policy: SessionPolicy) -> Self {
        Self { routes, policy }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// decide
    ///
    /// Pure function of the path, the session cookie value and the clock.
    /// The auth-route check runs first, so a path that is both auth-only and
    /// protected redirects home with a live session and is invalidated without one.
    pub fn decide(&self, path: &str, token: Option<&str>, now: DateTime<Utc>) -> GuardDecision<'_> {
        let state = self.policy.inspect(token, now).state;

        if self.routes.is_auth(path) && state.is_valid() {
            return GuardDecision::Authenticated {
                location: &self.routes.home,
            };
        }

        if self.routes.is_protected(path) && !state.is_valid() {
            return GuardDecision::Invalidated {
                location: &self.routes.login,
                reason: state,
            };
        }

        GuardDecision::Pass
    }
}

/// route_guard
///
/// Axum middleware wrapping the whole router. Applies [`RouteGuard::decide`]
/// to every request. On invalidation the session cookie is removed from the
/// inbound request and an expiring `Set-Cookie` is attached to the redirect.
pub async fn route_guard(
    State(guard): State<GuardState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());
    let path = request.uri().path().to_owned();

    match guard.decide(&path, token.as_deref(), Utc::now()) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::Authenticated { location } => {
            debug!(path = %path, location, "Live session on auth route, redirecting");
            redirect(request.method(), location).into_response()
        }
        GuardDecision::Invalidated { location, reason } => {
            info!(
                path = %path,
                reason = reason.as_str(),
                "Session rejected on protected route, clearing cookie"
            );
            // Only observable if the request were forwarded; it is dropped here.
            strip_cookie(request.headers_mut(), SESSION_COOKIE);
            (jar.add(removal_cookie()), redirect(request.method(), location)).into_response()
        }
    }
}

/// GET and HEAD keep a 307. Anything else gets a 303 so the browser follows
/// up with a GET instead of replaying a form submission on the landing page.
pub fn redirect(method: &Method, location: &str) -> Redirect {
    if method == Method::GET || method == Method::HEAD {
        Redirect::temporary(location)
    } else {
        Redirect::to(location)
    }
}

/// Remove every `name=...` pair from the request's `Cookie` headers, dropping
/// headers that end up empty. Works on raw bytes, so other cookies in a
/// header that is not valid UTF-8 survive.
pub fn strip_cookie(headers: &mut HeaderMap, name: &str) {
    let kept: Vec<HeaderValue> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| {
            let pairs: Vec<&[u8]> = value
                .as_bytes()
                .split(|byte| *byte == b';')
                .map(<[u8]>::trim_ascii)
                .filter(|pair| !pair.is_empty() && cookie_name(pair) != name.as_bytes())
                .collect();
            if pairs.is_empty() {
                return None;
            }
            HeaderValue::from_bytes(&pairs.join(&b"; "[..])).ok()
        })
        .collect();

    headers.remove(header::COOKIE);
    for value in kept {
        headers.append(header::COOKIE, value);
    }
}

fn cookie_name(pair: &[u8]) -> &[u8] {
    pair.split(|byte| *byte == b'=')
        .next()
        .map(<[u8]>::trim_ascii)
        .unwrap_or_default()
}

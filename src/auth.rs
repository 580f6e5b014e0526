use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    guard::GuardState,
    session::{Claims, SESSION_COOKIE, removal_cookie},
};

/// Session
///
/// The live session behind a request. Handlers that call the PostLogs API on
/// the user's behalf take this as an argument and forward `token` as the
/// bearer credential.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

/// CurrentUser
///
/// A live session whose claims name a user. Needed by the profile actions,
/// which address the API's `/users/{id}` resources.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub session: Session,
}

/// Rejection for both extractors: drop the cookie and go back to the public
/// landing page, the same outcome the route guard produces.
#[derive(Debug)]
pub struct SessionRejection {
    jar: CookieJar,
    location: String,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        (self.jar.add(removal_cookie()), Redirect::to(&self.location)).into_response()
    }
}

/// Session Extractor Implementation
///
/// Reads the `session` cookie and classifies it with the guard's own
/// [`crate::session::SessionPolicy`], so a handler never sees a session the
/// guard would have rejected.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    GuardState: FromRef<S>,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = GuardState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());
        let inspection = guard.policy().inspect(token.as_deref(), Utc::now());

        match (token, inspection.claims) {
            (Some(token), Some(claims)) if inspection.state.is_valid() => {
                Ok(Session { token, claims })
            }
            _ => {
                debug!(
                    reason = inspection.state.as_str(),
                    "Handler requires a session, rejecting"
                );
                Err(SessionRejection {
                    jar,
                    location: guard.routes().login.clone(),
                })
            }
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    GuardState: FromRef<S>,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;

        match session.claims.subject().map(Uuid::parse_str) {
            Some(Ok(id)) => Ok(CurrentUser { id, session }),
            _ => {
                debug!("Session carries no usable user id, rejecting");
                let guard = GuardState::from_ref(state);
                Err(SessionRejection {
                    jar: CookieJar::from_headers(&parts.headers),
                    location: guard.routes().login.clone(),
                })
            }
        }
    }
}

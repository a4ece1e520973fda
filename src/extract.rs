//! Axum extractors for route-level authorization.
//!
//! ```ignore
//! // 401 unless the request carries a session that resolved to a user
//! async fn profile(Authenticated(auth): Authenticated<User>) -> Json<User> {
//!     Json(auth.identity)
//! }
//!
//! // never rejects
//! async fn home(MaybeAuthenticated(auth): MaybeAuthenticated<User>) -> String {
//!     match auth {
//!         Some(auth) => format!("Hello, {}!", auth.identity.name),
//!         None => "Hello, guest!".to_string(),
//!     }
//! }
//!
//! // start a session on a route that is excluded from authentication
//! async fn login(handle: SessionHandle, Json(data): Json<SessionData>) -> StatusCode {
//!     match handle.set_session(&data) {
//!         Ok(()) => StatusCode::CREATED,
//!         Err(_) => StatusCode::PAYLOAD_TOO_LARGE,
//!     }
//! }
//! ```

use std::{convert::Infallible, ops::Deref};

use axum_core::{
    extract::FromRequestParts,
    response::{IntoResponse, Response},
};
use http::{StatusCode, request::Parts};

use crate::{
    auth::{AuthResult, Authentication},
    handle::SessionHandle,
};

/// Rejection for the session extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("no valid session")]
    Unauthenticated,
    #[error("session authentication layer is not installed")]
    MissingLayer,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::MissingLayer => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Requires a session that resolved to a user of type `U`.
#[derive(Debug, Clone)]
pub struct Authenticated<U>(pub AuthResult<U>);

impl<U> Deref for Authenticated<U> {
    type Target = AuthResult<U>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, U> FromRequestParts<S> for Authenticated<U>
where
    S: Send + Sync,
    U: Clone + Send + Sync + 'static,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication<U>>() {
            Some(Authentication::Authenticated(result)) => Ok(Self(result.clone())),
            Some(_) => Err(AuthRejection::Unauthenticated),
            None => Err(AuthRejection::MissingLayer),
        }
    }
}

/// The resolved user, if there is one.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated<U>(pub Option<AuthResult<U>>);

impl<U> Deref for MaybeAuthenticated<U> {
    type Target = Option<AuthResult<U>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, U> FromRequestParts<S> for MaybeAuthenticated<U>
where
    S: Send + Sync,
    U: Clone + Send + Sync + 'static,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let result = parts
            .extensions
            .get::<Authentication<U>>()
            .and_then(Authentication::result)
            .cloned();
        Ok(Self(result))
    }
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or(AuthRejection::MissingLayer)
    }
}

//! The per-request authentication pipeline.
//!
//! ```text
//! Unchecked ─┬─ excluded path ──────────────────────────────▶ Excluded
//!            ├─ no chunk cookies ───────────────────────────▶ NoSession
//!            ├─ reassembly/decrypt/expiry failure ──────────▶ InvalidSession
//!            └─ valid session ─┬─ user found ───────────────▶ Authenticated
//!                              ├─ no user ──────────────────▶ UserNotFound
//!                              └─ callback error ───────────▶ UserResolutionFailed
//! ```
//!
//! Every terminal state is a normal outcome; none of them is an error for the request
//! pipeline.

use std::sync::Arc;

use http::{Request, header};
use tower_cookies::{Cookie, Cookies};

use crate::{
    chunk::{self, ChunkSlots},
    codec,
    config::SessionAuthConfig,
    error::{ConfigurationError, SessionError},
    handle::SessionHandle,
    retrieve::RetrieveUser,
    secret::Secret,
    session::SessionData,
};

/// A session that decoded and resolved to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult<U> {
    pub identity: U,
    pub session: SessionData,
}

/// Why a request that was checked ended up without a user.
#[derive(Debug, Clone, PartialEq)]
pub enum Unauthenticated {
    NoSession,
    InvalidSession(SessionError),
    UserNotFound,
    UserResolutionFailed(String),
}

/// Outcome of authenticating one request. Inserted into the request extensions by the layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Authentication<U> {
    /// The path is on the exclusion list; cookies were not inspected.
    Excluded,
    Unauthenticated(Unauthenticated),
    Authenticated(AuthResult<U>),
}

impl<U> Authentication<U> {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn result(&self) -> Option<&AuthResult<U>> {
        match self {
            Self::Authenticated(result) => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&U> {
        self.result().map(|result| &result.identity)
    }

    #[must_use]
    pub fn into_result(self) -> Option<AuthResult<U>> {
        match self {
            Self::Authenticated(result) => Some(result),
            _ => None,
        }
    }

    /// The client holds session cookies that can never authenticate again.
    pub(crate) fn invalidates_session(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated(Unauthenticated::InvalidSession(_) | Unauthenticated::UserNotFound)
        )
    }
}

/// Immutable state shared by every request: validated config and key.
#[derive(Debug)]
pub(crate) struct SessionSettings {
    pub(crate) config: SessionAuthConfig,
    pub(crate) secret: Secret,
}

/// Session authentication independent of any particular service stack.
pub struct SessionAuth<R> {
    settings: Arc<SessionSettings>,
    retrieve: Arc<R>,
}

impl<R> Clone for SessionAuth<R> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            retrieve: self.retrieve.clone(),
        }
    }
}

impl<R> std::fmt::Debug for SessionAuth<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuth")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<R: RetrieveUser> SessionAuth<R> {
    #[must_use]
    pub fn new(secret: Secret, retrieve: R) -> Self {
        Self {
            settings: Arc::new(SessionSettings {
                config: SessionAuthConfig::default(),
                secret,
            }),
            retrieve: Arc::new(retrieve),
        }
    }

    /// Replace the configuration.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the configuration is unusable.
    pub fn with_config(self, config: SessionAuthConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            settings: Arc::new(SessionSettings {
                config,
                secret: self.settings.secret.clone(),
            }),
            retrieve: self.retrieve,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SessionAuthConfig {
        &self.settings.config
    }

    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.settings.config.exclude.is_excluded(path)
    }

    /// Reassemble and decrypt the session carried by `cookies`.
    pub fn load_session<I, N, V>(&self, cookies: I) -> Result<SessionData, SessionError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let config = self.config();
        chunk::reassemble(config.name(), cookies, config.chunk_limits())?
            .open(|sealed| codec::decode(sealed, &self.settings.secret))
    }

    /// Run the full pipeline for a request to `path` carrying `cookies`.
    pub async fn authenticate<I, N, V>(&self, path: &str, cookies: I) -> Authentication<R::User>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        if self.is_excluded(path) {
            tracing::debug!(path, "path excluded from session authentication");
            return Authentication::Excluded;
        }

        match self.load_session(cookies) {
            Ok(session) => self.resolve(session).await,
            Err(err) if err.is_absent() => {
                tracing::debug!(path, "no session cookie");
                Authentication::Unauthenticated(Unauthenticated::NoSession)
            }
            Err(err) => {
                tracing::warn!(err = %err, path, "session cookie rejected");
                Authentication::Unauthenticated(Unauthenticated::InvalidSession(err))
            }
        }
    }

    /// Authenticate straight from a request's `Cookie` headers.
    pub async fn authenticate_request<B>(&self, req: &Request<B>) -> Authentication<R::User> {
        let path = req.uri().path().to_owned();
        let cookies = request_cookies(req);
        self.authenticate(&path, cookies).await
    }

    /// Hand a decoded session to the user-resolution callback.
    pub async fn resolve(&self, session: SessionData) -> Authentication<R::User> {
        match self.retrieve.retrieve_user(&session).await {
            Ok(Some(identity)) => Authentication::Authenticated(AuthResult { identity, session }),
            Ok(None) => {
                tracing::debug!("session does not resolve to a user");
                Authentication::Unauthenticated(Unauthenticated::UserNotFound)
            }
            Err(err) => {
                tracing::warn!(err = %err, "user resolution failed");
                Authentication::Unauthenticated(Unauthenticated::UserResolutionFailed(
                    err.to_string(),
                ))
            }
        }
    }

    pub(crate) fn handle(&self, cookies: Cookies, slots: ChunkSlots) -> SessionHandle {
        SessionHandle::new(cookies, self.settings.clone(), slots)
    }
}

fn request_cookies<B>(req: &Request<B>) -> Vec<(String, String)> {
    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value))
        .filter_map(Result::ok)
        .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
        .collect()
}

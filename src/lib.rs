//! Stateless session authentication for `tower` and `axum`, carried entirely in cookies.
//!
//! A session is a small JSON mapping. It is sealed with AES-GCM under a 128, 192 or 256-bit
//! [`Secret`], base64 encoded, and split across as many cookies as the browser's per-cookie
//! limit requires. On every request [`SessionAuthLayer`] reassembles and verifies those cookies
//! and asks the application's [`RetrieveUser`] callback which user the session belongs to.
//!
//! ```ignore
//! let retrieve = retrieve_user_fn(|session: SessionData| async move {
//!     let id: Option<String> = session.get("id")?;
//!     Ok::<_, serde_json::Error>(id.and_then(|id| USERS.get(&id).cloned()))
//! });
//! let config = SessionAuthConfig::default().with_exclude(["/login", "/schema"]);
//! let layer = SessionAuthLayer::new(Secret::generate(), retrieve).with_config(config)?;
//!
//! let app = Router::new()
//!     .route("/login", post(login))
//!     .route("/me", get(|Authenticated(auth): Authenticated<User>| async move { Json(auth.identity) }))
//!     .layer(layer);
//! ```
//!
//! # Security
//! Tampered, truncated, expired or foreign cookies are indistinguishable from no cookie at all
//! as far as handlers are concerned: the request is simply unauthenticated. The session
//! contents are encrypted, but the client still holds them; never put anything in a session
//! that must survive a server-side revocation.

mod auth;
pub mod chunk;
pub mod codec;
mod config;
mod error;
pub mod exclude;
#[cfg(feature = "axum-core")]
mod extract;
mod handle;
pub mod layer;
mod openapi;
mod retrieve;
mod secret;
mod session;

pub use tower_cookies::cookie::SameSite;

pub use crate::auth::{AuthResult, Authentication, SessionAuth, Unauthenticated};
pub use crate::config::{
    DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_CHUNKS,
    DEFAULT_SECURITY_SCHEME_NAME, SessionAuthConfig,
};
pub use crate::error::{ConfigurationError, SessionError};
pub use crate::exclude::{ExclusionList, ExclusionPattern};
pub use crate::handle::SessionHandle;
pub use crate::layer::SessionAuthLayer;
pub use crate::openapi::SecurityScheme;
pub use crate::retrieve::{RetrieveUser, RetrieveUserFn, retrieve_user_fn};
pub use crate::secret::Secret;
pub use crate::session::SessionData;

#[cfg(feature = "axum-core")]
pub use crate::extract::{AuthRejection, Authenticated, MaybeAuthenticated};

//! The application-supplied capability that maps a decoded session to a user.

use std::{fmt::Display, future::Future};

use async_trait::async_trait;

use crate::session::SessionData;

/// Resolves the user a valid session belongs to.
///
/// Called at most once per request, and only when the session decoded successfully.
/// Returning `Ok(None)` (no such user) or `Err(_)` both leave the request unauthenticated.
#[async_trait]
pub trait RetrieveUser: Send + Sync + 'static {
    type User: Clone + Send + Sync + 'static;
    type Error: Display + Send;

    async fn retrieve_user(&self, session: &SessionData)
    -> Result<Option<Self::User>, Self::Error>;
}

/// [`RetrieveUser`] backed by a closure. Built with [`retrieve_user_fn`].
#[derive(Debug, Clone, Copy)]
pub struct RetrieveUserFn<F>(F);

/// Adapt a closure returning a future into a [`RetrieveUser`].
///
/// ```ignore
/// let retrieve = retrieve_user_fn(|session: SessionData| async move {
///     let id: Option<String> = session.get("id")?;
///     Ok::<_, serde_json::Error>(id.map(User::new))
/// });
/// ```
pub fn retrieve_user_fn<F, Fut, U, E>(f: F) -> RetrieveUserFn<F>
where
    F: Fn(SessionData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<U>, E>> + Send + 'static,
    U: Clone + Send + Sync + 'static,
    E: Display + Send + 'static,
{
    RetrieveUserFn(f)
}

#[async_trait]
impl<F, Fut, U, E> RetrieveUser for RetrieveUserFn<F>
where
    F: Fn(SessionData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<U>, E>> + Send + 'static,
    U: Clone + Send + Sync + 'static,
    E: Display + Send + 'static,
{
    type User = U;
    type Error = E;

    async fn retrieve_user(&self, session: &SessionData) -> Result<Option<U>, E> {
        (self.0)(session.clone()).await
    }
}

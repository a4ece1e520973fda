use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::{CookieManager, Cookies};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    auth::SessionAuth,
    chunk::ChunkSlots,
    config::SessionAuthConfig,
    error::ConfigurationError,
    retrieve::RetrieveUser,
    secret::Secret,
};

/// Authenticates every request from its session cookies.
///
/// Inserts an [`Authentication`](crate::Authentication) for `R::User` and a
/// [`SessionHandle`](crate::SessionHandle) into each request's extensions. Requests are never
/// rejected here; routes that need a user use the [`Authenticated`](crate::Authenticated)
/// extractor or inspect the extension themselves.
#[derive(Debug)]
pub struct SessionAuthLayer<R> {
    auth: SessionAuth<R>,
}

impl<R> Clone for SessionAuthLayer<R> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl<R: RetrieveUser> SessionAuthLayer<R> {
    #[must_use]
    pub fn new(secret: Secret, retrieve_user: R) -> Self {
        Self {
            auth: SessionAuth::new(secret, retrieve_user),
        }
    }

    /// Build a layer from raw key bytes.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidSecretLength`] unless the key is 16, 24 or 32 bytes.
    pub fn from_secret_bytes(
        secret: impl AsRef<[u8]>,
        retrieve_user: R,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new(Secret::new(secret)?, retrieve_user))
    }

    /// Replace the configuration.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] if the configuration is unusable.
    pub fn with_config(self, config: SessionAuthConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            auth: self.auth.with_config(config)?,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SessionAuthConfig {
        self.auth.config()
    }

    /// The authenticator this layer drives, for use outside a tower stack.
    #[must_use]
    pub fn authenticator(&self) -> &SessionAuth<R> {
        &self.auth
    }
}

#[derive(Debug)]
pub struct SessionAuthService<S, R> {
    inner: S,
    auth: SessionAuth<R>,
}

impl<S: Clone, R> Clone for SessionAuthService<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl<S, R> Layer<S> for SessionAuthLayer<R> {
    type Service = CookieManager<SessionAuthService<S, R>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(SessionAuthService {
            inner,
            auth: self.auth.clone(),
        })
    }
}

impl<ReqBody, ResBody, S, R> Service<Request<ReqBody>> for SessionAuthService<S, R>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    R: RetrieveUser,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let auth = self.auth.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let cookies = match req.extensions().get::<Cookies>().cloned() {
                Some(cookies) => cookies,
                None => {
                    tracing::error!("cookie manager missing from request extensions");
                    let mut res = Response::default();
                    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                    return Ok(res);
                }
            };

            let config = auth.config();
            let jar: Vec<(String, String)> = cookies
                .list()
                .iter()
                .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
                .collect();
            let slots = ChunkSlots::observe(
                config.name(),
                jar.iter().map(|(name, _)| name),
                config.max_chunks,
            );
            let handle = auth.handle(cookies, slots);

            let path = req.uri().path().to_owned();
            let authentication = auth.authenticate(&path, jar).await;

            if config.clear_on_invalid && authentication.invalidates_session() {
                handle.clear_session();
            }

            req.extensions_mut().insert(handle);
            req.extensions_mut().insert(authentication);

            inner.call(req).await
        })
    }
}

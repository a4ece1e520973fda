#![allow(dead_code)]

// Shared helpers for integration tests.
//
// `Browser` mimics a user agent's cookie jar: it applies `Set-Cookie` headers from responses
// (including removals) and sends the surviving cookies back on the next request.
use std::collections::BTreeMap;

use axum::{
    Json, Router,
    body::Body,
    http::StatusCode,
    routing::{get, post},
};
use http::{HeaderMap, Request, Response, header};
use http_body_util::BodyExt as _;
use serde::{Deserialize, Serialize};
use time::Duration;
use tower::ServiceExt as _;
use tower_cookies::Cookie;
use tower_cookie_session_auth::{
    Authenticated, MaybeAuthenticated, RetrieveUser, Secret, SessionAuthConfig, SessionAuthLayer,
    SessionData, SessionError, SessionHandle, retrieve_user_fn,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

pub fn known_user() -> User {
    User {
        id: "9b2f6c1e-user".to_string(),
        name: "Moishe Zuchmir".to_string(),
        email: "moishe@zuchmir.com".to_string(),
    }
}

pub fn stranger() -> User {
    User {
        id: "0000-unknown".to_string(),
        name: "Sigfried Lamago".to_string(),
        email: "llamago@zigi.com".to_string(),
    }
}

pub fn user_session(user: &User) -> SessionData {
    match serde_json::to_value(user).expect("user serializes") {
        serde_json::Value::Object(map) => map.into(),
        other => panic!("user serialized to {other}"),
    }
}

/// Resolves only [`known_user`].
pub fn retrieve_known_user() -> impl RetrieveUser<User = User> + Clone {
    retrieve_user_fn(|session: SessionData| async move {
        let id: Option<String> = session.get("id")?;
        let user = known_user();
        Ok::<_, serde_json::Error>(id.filter(|id| *id == user.id).map(|_| user))
    })
}

pub fn test_config() -> SessionAuthConfig {
    SessionAuthConfig::default()
        .with_secure(false)
        .with_max_age(Duration::hours(1))
        .with_exclude(["/login", "/signup", "/schema"])
}

pub fn make_layer(
    secret: Secret,
    config: SessionAuthConfig,
) -> SessionAuthLayer<impl RetrieveUser<User = User> + Clone> {
    SessionAuthLayer::new(secret, retrieve_known_user())
        .with_config(config)
        .expect("config is valid")
}

pub fn routes() -> Router {
    Router::new()
        .route(
            "/login",
            post(
                |handle: SessionHandle, Json(data): Json<SessionData>| async move {
                    match handle.set_session(&data) {
                        Ok(()) => StatusCode::CREATED,
                        Err(SessionError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
                        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    }
                },
            ),
        )
        .route(
            "/user",
            get(|Authenticated(auth): Authenticated<User>| async move { Json(auth.identity) })
                .delete(
                    |_: Authenticated<User>, handle: SessionHandle| async move {
                        handle.clear_session();
                        StatusCode::NO_CONTENT
                    },
                ),
        )
        .route(
            "/schema",
            get(|MaybeAuthenticated(auth): MaybeAuthenticated<User>| async move {
                match auth {
                    Some(auth) => format!("schema for {}", auth.identity.name),
                    None => "schema".to_string(),
                }
            }),
        )
        .route(
            "/whoami",
            get(|MaybeAuthenticated(auth): MaybeAuthenticated<User>| async move {
                auth.map(|auth| auth.identity.name)
                    .unwrap_or_else(|| "guest".to_string())
            }),
        )
}

pub fn app(config: SessionAuthConfig) -> Router {
    routes().layer(make_layer(Secret::generate(), config))
}

pub async fn body_string(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let value = value.to_str().expect("set-cookie header is valid utf-8");
            Cookie::parse_encoded(value)
                .expect("set-cookie parses successfully")
                .into_owned()
        })
        .collect()
}

pub fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.max_age() == Some(Duration::ZERO)
}

#[derive(Debug, Clone, Default)]
pub struct Browser {
    jar: BTreeMap<String, String>,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.jar.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.jar.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.jar.remove(name);
    }

    pub fn absorb(&mut self, res: &Response<Body>) {
        for cookie in set_cookies(res.headers()) {
            if is_removal(&cookie) {
                self.jar.remove(cookie.name());
            } else {
                self.jar
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }

    /// `Cookie` header value, emitting cookies in the given name order.
    pub fn header_in_order(&self, names: &[&str]) -> String {
        names
            .iter()
            .filter_map(|name| self.jar.get(*name).map(|value| format!("{name}={value}")))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn header(&self) -> String {
        self.jar
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn request(&self, method: &str, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.jar.is_empty() {
            builder = builder.header(header::COOKIE, self.header());
        }
        builder.body(Body::empty()).expect("request builds successfully")
    }

    pub fn json_request(&self, uri: &str, body: &impl Serialize) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if !self.jar.is_empty() {
            builder = builder.header(header::COOKIE, self.header());
        }
        let body = serde_json::to_vec(body).expect("body serializes");
        builder.body(Body::from(body)).expect("request builds successfully")
    }

    /// Send `req` through `app` and keep whatever cookies the response sets.
    pub async fn send(&mut self, app: &Router, req: Request<Body>) -> Response<Body> {
        let res = self.send_detached(app, req).await;
        self.absorb(&res);
        res
    }

    /// Send `req` through `app` without touching the jar.
    pub async fn send_detached(&self, app: &Router, req: Request<Body>) -> Response<Body> {
        app.clone()
            .oneshot(req)
            .await
            .expect("service call succeeds")
    }
}

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::Duration;
use tower_cookie_session_auth::{
    Authenticated, MaybeAuthenticated, SameSite, Secret, SessionAuthConfig, SessionAuthLayer,
    SessionData, SessionHandle, retrieve_user_fn,
};

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u32,
    name: String,
}

type Users = Arc<HashMap<u32, User>>;

#[derive(Debug, Deserialize)]
struct Login {
    name: String,
}

async fn login(
    State(users): State<Users>,
    handle: SessionHandle,
    Json(login): Json<Login>,
) -> StatusCode {
    let Some(user) = users.values().find(|user| user.name == login.name) else {
        return StatusCode::UNAUTHORIZED;
    };

    let mut session = SessionData::new();
    if session.insert("user_id", user.id).is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    match handle.set_session(&session) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn me(Authenticated(auth): Authenticated<User>) -> Json<User> {
    Json(auth.identity)
}

async fn index(MaybeAuthenticated(auth): MaybeAuthenticated<User>) -> String {
    match auth {
        Some(auth) => format!("Hello, {}!", auth.identity.name),
        None => "Hello, guest!".to_string(),
    }
}

async fn logout(_: Authenticated<User>, handle: SessionHandle) -> StatusCode {
    handle.clear_session();
    StatusCode::NO_CONTENT
}

#[tokio::main]
async fn main() {
    let users: Users = Arc::new(
        [(1, "alice"), (2, "bob")]
            .into_iter()
            .map(|(id, name)| {
                (
                    id,
                    User {
                        id,
                        name: name.to_string(),
                    },
                )
            })
            .collect(),
    );

    let directory = users.clone();
    let retrieve = retrieve_user_fn(move |session: SessionData| {
        let directory = directory.clone();
        async move {
            let id: Option<u32> = session.get("user_id")?;
            Ok::<_, serde_json::Error>(id.and_then(|id| directory.get(&id).cloned()))
        }
    });

    let config = SessionAuthConfig::default()
        // Default: "session"
        .with_name("session")
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Lax
        .with_same_site(SameSite::Lax)
        // Default: 14 days
        .with_max_age(Duration::hours(1))
        // Default: true (set to false for local HTTP development)
        .with_secure(false)
        // Default: "/"
        .with_path("/")
        // Default: 4093
        .with_max_chunk_size(4093)
        // Default: 8
        .with_max_chunks(8)
        // Default: true
        .with_clear_on_invalid(true)
        // Default: nothing excluded
        .with_exclude(["/login", "/openapi.json"]);
    let openapi: Value = json!({
        "openapi": "3.1.0",
        "components": config.openapi_components(),
        "security": [config.security_requirement()],
    });

    let session_layer = SessionAuthLayer::new(Secret::generate(), retrieve)
        .with_config(config)
        .expect("session config is valid");

    let app = Router::new()
        .route("/", get(index))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/openapi.json", get(move || async move { Json(openapi) }))
        .layer(session_layer)
        .with_state(users);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}

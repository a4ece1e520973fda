// End-to-end tests using an Axum `Router` layered with `SessionAuthLayer`.
// These walk through the login, access and logout lifecycle the way a browser would.
mod common;

use axum::{Router, body::Body, routing::get};
use common::{
    Browser, app, body_string, known_user, make_layer, routes, set_cookies, stranger,
    test_config, user_session,
};
use http::{Request, StatusCode, header};
use tower::ServiceExt as _;
use tower_cookie_session_auth::{Authenticated, Secret, SessionAuthConfig};

#[tokio::test]
async fn login_access_logout_lifecycle() {
    let app = app(test_config());
    let mut browser = Browser::new();

    let res = browser.send(&app, browser.request("GET", "/user")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let user = known_user();
    let res = browser
        .send(&app, browser.json_request("/login", &user_session(&user)))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(browser.names(), ["session"]);

    let res = browser.send(&app, browser.request("GET", "/user")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(res.into_body()).await).expect("body is json");
    assert_eq!(body, serde_json::to_value(&user).expect("user serializes"));

    let res = browser.send(&app, browser.request("DELETE", "/user")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(browser.names().is_empty());

    let res = browser.send(&app, browser.request("GET", "/user")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_for_unknown_user_is_rejected_and_cleared() {
    let app = app(test_config());
    let mut browser = Browser::new();

    let res = browser
        .send(&app, browser.json_request("/login", &user_session(&stranger())))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(browser.names(), ["session"]);

    let res = browser.send(&app, browser.request("GET", "/user")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(browser.names().is_empty());
}

#[tokio::test]
async fn excluded_path_ignores_cookies() {
    let app = app(test_config());
    let mut browser = Browser::new();
    browser.set("session", "not-a-real-session");

    let res = browser.send(&app, browser.request("GET", "/schema")).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(res.headers()).is_empty());
    assert_eq!(body_string(res.into_body()).await, "schema");
    assert_eq!(browser.get("session"), Some("not-a-real-session"));
}

#[tokio::test]
async fn excluded_path_never_sees_a_user() {
    let app = app(test_config());
    let mut browser = Browser::new();
    browser
        .send(&app, browser.json_request("/login", &user_session(&known_user())))
        .await;

    let res = browser.send(&app, browser.request("GET", "/schema")).await;

    assert_eq!(body_string(res.into_body()).await, "schema");
}

#[tokio::test]
async fn request_without_cookies_is_a_guest() {
    let app = app(test_config());
    let mut browser = Browser::new();

    let res = browser.send(&app, browser.request("GET", "/whoami")).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(res.headers()).is_empty());
    assert_eq!(body_string(res.into_body()).await, "guest");
}

#[tokio::test]
async fn optional_routes_see_the_user() {
    let app = app(test_config());
    let mut browser = Browser::new();
    browser
        .send(&app, browser.json_request("/login", &user_session(&known_user())))
        .await;

    let res = browser.send(&app, browser.request("GET", "/whoami")).await;

    assert_eq!(body_string(res.into_body()).await, known_user().name);
}

#[tokio::test]
async fn unrelated_cookies_are_ignored() {
    let app = app(test_config());
    let mut browser = Browser::new();
    browser.set("theme", "dark");
    browser.set("sessionid", "abc");
    browser
        .send(&app, browser.json_request("/login", &user_session(&known_user())))
        .await;

    let res = browser.send(&app, browser.request("GET", "/user")).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(res.headers()).is_empty());
    assert_eq!(browser.names(), ["session", "sessionid", "theme"]);
}

#[tokio::test]
async fn custom_cookie_name() {
    let app = app(test_config().with_name("auth"));
    let mut browser = Browser::new();

    browser
        .send(&app, browser.json_request("/login", &user_session(&known_user())))
        .await;
    assert_eq!(browser.names(), ["auth"]);

    let res = browser.send(&app, browser.request("GET", "/user")).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn glob_exclusions() {
    let config = test_config().with_exclude(["/login", "/public/*"]);
    let app = routes()
        .route("/public/{page}", get(|| async { "public" }))
        .layer(make_layer(Secret::generate(), config));
    let mut browser = Browser::new();
    browser.set("session", "garbage");

    let res = browser.send(&app, browser.request("GET", "/public/about")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(res.headers()).is_empty());

    let res = browser.send(&app, browser.request("GET", "/whoami")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(set_cookies(res.headers()).len(), 1);
    assert!(browser.names().is_empty());
}

#[tokio::test]
async fn extractor_without_layer_is_a_server_error() {
    let app = Router::new().route(
        "/user",
        get(|Authenticated(auth): Authenticated<common::User>| async move { auth.identity.name }),
    );

    let req = Request::builder()
        .uri("/user")
        .header(header::COOKIE, "session=whatever")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn openapi_components_follow_config() {
    let config = SessionAuthConfig::default().with_security_scheme_name("cookieAuth");
    let components = config.openapi_components();

    assert_eq!(
        components["securitySchemes"]["cookieAuth"]["in"],
        serde_json::json!("cookie")
    );
}

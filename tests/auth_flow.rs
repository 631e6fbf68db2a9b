use std::sync::Arc;

use argon2::Params;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use cookie_session::{
    app::build_app,
    auth::{password::Argon2Hasher, repo_memory::MemoryCredentialStore},
    config::AppConfig,
    state::AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let hasher = Argon2Hasher::with_params(Params::new(1024, 1, 1, None).unwrap());
    let state = AppState::from_parts(
        AppConfig::local("access-secret", "refresh-secret"),
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(hasher),
    )
    .unwrap();
    build_app(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// `name=value` pairs from every Set-Cookie header, in order.
fn set_cookies(res: &axum::response::Response) -> Vec<(String, String)> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| {
            let first = v.to_str().unwrap().split(';').next().unwrap().to_string();
            let (k, v) = first.split_once('=').unwrap();
            (k.to_string(), v.to_string())
        })
        .collect()
}

fn cookie_value(cookies: &[(String, String)], name: &str) -> String {
    cookies
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn sign_up_bob(app: &Router) {
    let res = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "login": "bob",
                "username": "bobby",
                "password": "Abc123!@",
                "confirmPassword": "Abc123!@"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn full_session_lifecycle() {
    let app = app();

    // sign-up
    let res = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "login": "bob",
                "username": "bobby",
                "password": "Abc123!@",
                "confirmPassword": "Abc123!@"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(res).await["message"],
        "You have successfully completed registration"
    );

    // sign-in
    let res = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signin",
            json!({"login":"bob","password":"Abc123!@"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first = set_cookies(&res);
    assert_eq!(first.len(), 2);
    let access1 = cookie_value(&first, "access_token");
    let refresh1 = cookie_value(&first, "refresh_token");
    assert!(!access1.is_empty() && !refresh1.is_empty());
    let body = json_body(res).await;
    assert_eq!(body["username"], "bobby");
    assert!(body["id"].as_str().is_some());

    // refresh
    let res = app
        .clone()
        .oneshot(post_with_cookie(
            "/api/auth/refresh-access-token",
            &format!("refresh_token={refresh1}"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let second = set_cookies(&res);
    let access2 = cookie_value(&second, "access_token");
    let refresh2 = cookie_value(&second, "refresh_token");
    assert_ne!(access2, access1);
    assert_ne!(refresh2, refresh1);

    // the consumed refresh token no longer works
    let res = app
        .clone()
        .oneshot(post_with_cookie(
            "/api/auth/refresh-access-token",
            &format!("refresh_token={refresh1}"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["error"], "INVALID_TOKEN");

    // logout
    let res = app
        .clone()
        .oneshot(post_with_cookie(
            "/api/auth/logout",
            &format!("access_token={access2}"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cleared = set_cookies(&res);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|(_, v)| v.is_empty()));

    // refresh with the token that was valid before logout
    let res = app
        .clone()
        .oneshot(post_with_cookie(
            "/api/auth/refresh-access-token",
            &format!("refresh_token={refresh2}"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn sign_in_errors_do_not_reveal_whether_login_exists() {
    let app = app();
    sign_up_bob(&app).await;

    let wrong_password = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signin",
            json!({"login":"bob","password":"Xyz789!@"}),
        ))
        .await
        .unwrap();
    let unknown_login = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signin",
            json!({"login":"alice","password":"Abc123!@"}),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_login.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&wrong_password).is_empty());
    assert_eq!(json_body(wrong_password).await, json_body(unknown_login).await);
}

#[tokio::test]
async fn sign_up_rejects_mismatch_and_duplicates() {
    let app = app();

    let res = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "login": "bob",
                "username": "bobby",
                "password": "Abc123!@",
                "confirmPassword": "Abc123!#"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "PASSWORD_MISMATCH");

    sign_up_bob(&app).await;
    let res = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "login": "bob",
                "username": "someone",
                "password": "Abc123!@",
                "confirmPassword": "Abc123!@"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn weak_password_is_a_validation_error() {
    let res = app()
        .oneshot(post_json(
            "/api/auth/signup",
            json!({
                "login": "bob",
                "username": "bobby",
                "password": "password",
                "confirmPassword": "password"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "VALIDATION");
}

#[tokio::test]
async fn logout_requires_a_valid_access_cookie() {
    let app = app();

    let res = app
        .clone()
        .oneshot(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .clone()
        .oneshot(post_with_cookie("/api/auth/logout", "access_token=garbage"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_gate_checks_cookie_presence_and_signature() {
    let app = app();
    sign_up_bob(&app).await;
    let res = app
        .clone()
        .oneshot(post_json(
            "/api/auth/signin",
            json!({"login":"bob","password":"Abc123!@"}),
        ))
        .await
        .unwrap();
    let cookies = set_cookies(&res);
    let access = cookie_value(&cookies, "access_token");

    let missing = app
        .clone()
        .oneshot(Request::post("/api/auth/refresh-access-token").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    // an access token in the refresh cookie has the wrong secret and kind
    let wrong_kind = app
        .clone()
        .oneshot(post_with_cookie(
            "/api/auth/refresh-access-token",
            &format!("refresh_token={access}"),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_kind.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let res = app()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

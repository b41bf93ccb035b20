// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests.
//!
//! These tests verify that:
//! 1. Mirrored collections are only served while signed in
//! 2. Gated tabs and malformed contact handles are rejected
//! 3. The login routes redirect the way the frontend expects

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tripshare::db::collections;

mod common;
use common::{create_test_app, fields, test_identity, wait_for};

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _, _) = create_test_app("u1");

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_session_is_null_when_signed_out() {
    let (app, _, _) = create_test_app("u1");

    let response = app.oneshot(get("/api/session")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_mirrors_require_session() {
    let (app, _, _) = create_test_app("u1");

    for uri in ["/api/trips", "/api/users"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_mirrors_served_while_signed_in() {
    let (app, state, store) = create_test_app("u1");
    store.put(
        collections::TRIPS,
        "t1",
        fields(json!({"from": "Palo Alto", "to": "San Jose"})),
    );

    state.session.on_auth_changed(Some(test_identity("u1"))).await;
    let mut trips = state.session.trips();
    wait_for(&mut trips, |t| !t.is_empty()).await;

    let response = app.clone().oneshot(get("/api/trips")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["t1"]["id"], "t1");
    assert_eq!(body["t1"]["to"], "San Jose");

    let response = app.oneshot(get("/api/session")).await.unwrap();
    assert_eq!(body_json(response).await["uid"], "u1");
}

#[tokio::test]
async fn test_gated_tab_rejected_without_session() {
    let (app, state, _) = create_test_app("u1");

    let response = app
        .clone()
        .oneshot(send_json("PUT", "/api/ui/tab", json!({"tab": "friends"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(send_json("PUT", "/api/ui/tab", json!({"tab": "home"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.session.on_auth_changed(Some(test_identity("u1"))).await;
    let response = app
        .oneshot(send_json("PUT", "/api/ui/tab", json!({"tab": "routes"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["active_tab"], "routes");
}

#[tokio::test]
async fn test_contact_handle_updates_preview() {
    let (app, _, _) = create_test_app("u1");

    let response = app
        .oneshot(send_json(
            "PUT",
            "/api/ui/contact-handle",
            json!({"handle": " jane.doe "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["contact_handle"], "jane.doe");
    assert_eq!(body["contact_url"], "https://m.me/jane.doe");
    assert_eq!(body["can_login"], true);
    assert_eq!(body["show_login_modal"], true);
}

#[tokio::test]
async fn test_contact_handle_validation() {
    let (app, state, _) = create_test_app("u1");

    let too_long = "x".repeat(51);
    for handle in ["a/b", "who?", "with space", too_long.as_str()] {
        let response = app
            .clone()
            .oneshot(send_json(
                "PUT",
                "/api/ui/contact-handle",
                json!({ "handle": handle }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", handle);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }

    assert!(state.session.ui().contact_handle.is_empty());
}

#[tokio::test]
async fn test_login_dialog_toggles() {
    let (app, _, _) = create_test_app("u1");

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/ui/login-help/toggle", json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["login_help_open"], true);

    let response = app
        .oneshot(send_json("POST", "/api/ui/login-modal/toggle", json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["show_login_modal"], false);
}

#[tokio::test]
async fn test_auth_start_requires_contact_handle() {
    let (app, state, _) = create_test_app("u1");

    let response = app.clone().oneshot(get("/auth/facebook")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    state.session.set_contact_handle("jane.doe");
    let response = app.oneshot(get("/auth/facebook")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let url = location(&response);
    assert!(url.starts_with("https://www.facebook.com/"), "{}", url);
    assert!(url.contains("client_id=test_app_id"), "{}", url);
    assert!(url.contains("state="), "{}", url);
}

/// Start a login through the app and return the signed OAuth state it issued.
/// Requires a contact handle to be set.
async fn issued_state(app: &axum::Router) -> String {
    let response = app.clone().oneshot(get("/auth/facebook")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let raw = location(&response).split("state=").nth(1).unwrap().to_string();
    urlencoding::decode(&raw).unwrap().into_owned()
}

fn callback_uri(oauth_state: &str, query: &str) -> String {
    format!(
        "/auth/facebook/callback?state={}&{}",
        urlencoding::encode(oauth_state),
        query
    )
}

#[tokio::test]
async fn test_callback_with_provider_error_redirects() {
    let (app, state, store) = create_test_app("u1");
    state.session.set_contact_handle("jane.doe");
    let oauth_state = issued_state(&app).await;

    let response = app
        .oneshot(get(&callback_uri(
            &oauth_state,
            "error=access_denied&error_reason=user_denied",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173?error=access_denied");
    assert!(state.session.current_session().is_none());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_callback_completes_login() {
    let (app, state, store) = create_test_app("u1");
    state.session.set_contact_handle("jane.doe");
    let oauth_state = issued_state(&app).await;

    let response = app
        .oneshot(get(&callback_uri(&oauth_state, "code=abc")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173");
    assert_eq!(state.session.current_session().unwrap().uid, "u1");
    assert_eq!(
        store.get(collections::USERS, "u1").unwrap()["messengerURL"],
        "https://m.me/jane.doe"
    );
}

#[tokio::test]
async fn test_callback_rejects_unverified_state() {
    let (app, state, store) = create_test_app("u1");
    state.session.set_contact_handle("jane.doe");
    let oauth_state = issued_state(&app).await;
    let mut tampered = oauth_state.clone();
    tampered.pop();

    for forged in ["forged", tampered.as_str()] {
        let response = app
            .clone()
            .oneshot(get(&callback_uri(forged, "code=attacker-code")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            location(&response),
            "http://localhost:5173?error=invalid_state"
        );
    }

    assert!(state.session.current_session().is_none());
    assert_eq!(state.session.active_subscriptions().await, 0);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_callback_without_handle_redirects_with_error() {
    let (app, state, _) = create_test_app("u1");
    state.session.set_contact_handle("jane.doe");
    let oauth_state = issued_state(&app).await;
    state.session.set_contact_handle("");

    let response = app
        .oneshot(get(&callback_uri(&oauth_state, "code=abc")))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "http://localhost:5173?error=missing_contact_handle"
    );
    assert!(state.session.current_session().is_none());
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (app, state, store) = create_test_app("u1");
    state.session.set_contact_handle("jane.doe");
    state.session.login("code").await.unwrap();
    assert_eq!(store.active_subscriptions(collections::TRIPS), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.session.current_session().is_none());
    assert_eq!(store.active_subscriptions(collections::TRIPS), 0);

    let response = app.oneshot(get("/api/trips")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _, _) = create_test_app("u1");

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/trips")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

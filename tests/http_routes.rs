//! Route handler integration tests
//!
//! Handlers are called directly with an [`AppState`] built over the shared
//! fixture; no socket is opened.

mod common;

use bytes::Bytes;
use chrono::Duration;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use common::{tamper_signature, Fixture, BASE_URL, SECRET};
use wicket::routes::{handle_download, handle_issue, health_check, status_check};
use wicket::store::TokenStore;
use wicket::{AppState, Args};

fn app_state(fx: &Fixture) -> AppState {
    let args = Args::try_parse_from(["wicket", "--jwt-secret", SECRET]).unwrap();
    let store: Arc<dyn TokenStore> = fx.store.clone();
    AppState::new(args, fx.build_service(), store)
}

async fn body_json(response: Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn issue_token(state: &AppState) -> String {
    let response = handle_issue(state, br#"{"orderId": "p1", "userId": "u1"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_issue_returns_download_url() {
    let fx = Fixture::new();
    let state = app_state(&fx);

    let response = handle_issue(&state, br#"{"orderId": "p1", "userId": "u1"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-store"
    );

    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap();
    let url = body["downloadUrl"].as_str().unwrap();
    assert_eq!(url, format!("{}/api/download/{}", BASE_URL, token));
    assert!(body["tokenId"].is_string());
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn test_issue_rejections_map_to_statuses() {
    let fx = Fixture::new();
    let state = app_state(&fx);

    let cases: [(&[u8], StatusCode, &str); 4] = [
        (
            br#"{"orderId": "p1", "userId": "u2"}"#,
            StatusCode::FORBIDDEN,
            "ownership_mismatch",
        ),
        (
            br#"{"orderId": "missing", "userId": "u1"}"#,
            StatusCode::NOT_FOUND,
            "not_found",
        ),
        (
            br#"{"orderId": "p1"}"#,
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
        (b"{not json", StatusCode::BAD_REQUEST, "invalid_request"),
    ];

    for (body, status, code) in cases {
        let response = handle_issue(&state, body).await;
        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["code"], code);
    }

    assert!(fx.store.inner().is_empty());
}

#[tokio::test]
async fn test_download_once_then_conflict() {
    let fx = Fixture::new();
    let state = app_state(&fx);
    let token = issue_token(&state).await;
    let origin = Some(IpAddr::V4(Ipv4Addr::LOCALHOST));

    let response = handle_download(&state, &token, origin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["artifactId"], "a1");
    assert_eq!(body["title"], "12 Harbour Rd - Building Inspection");
    assert!(body.get("location").is_none());

    let response = handle_download(&state, &token, origin).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "already_used");
}

#[tokio::test]
async fn test_download_rejections_map_to_statuses() {
    let fx = Fixture::new();
    let state = app_state(&fx);
    let token = issue_token(&state).await;

    let response = handle_download(&state, "garbage", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "malformed");

    let response = handle_download(&state, &tamper_signature(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "bad_signature");

    fx.clock.advance(Duration::hours(25));
    let response = handle_download(&state, &token, None).await;
    assert_eq!(response.status(), StatusCode::GONE);
    assert_eq!(body_json(response).await["code"], "expired");
}

#[tokio::test]
async fn test_health_reports_production_mode() {
    let fx = Fixture::new();
    let state = app_state(&fx);

    let response = health_check(&state);
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["healthy"], true);
    assert_eq!(body["mode"], "production");
}

#[tokio::test]
async fn test_status_counts_tokens() {
    let fx = Fixture::new();
    let state = app_state(&fx);

    let token = issue_token(&state).await;
    issue_token(&state).await;
    let response = handle_download(&state, &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = status_check(&state).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["service"], "wicket");
    assert_eq!(body["store"], "counting");
    assert_eq!(body["tokenValidityHours"], 24);
    assert_eq!(body["totalTokens"], 2);
    assert_eq!(body["consumedTokens"], 1);
    assert_eq!(body["auditEvents"], 3);
}

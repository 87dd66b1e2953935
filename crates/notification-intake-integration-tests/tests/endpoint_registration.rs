//! Integration tests for the endpoint registration API

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::{
    batch, body_json, head, json_request, secret, shipment_event, signed_post, TestHarness, BASE,
};
use notification_intake_core::SigningSecret;
use uuid::Uuid;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Rotating the secret invalidates signatures made with the old one
#[tokio::test]
async fn test_secret_rotation() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;
    let rotated = SigningSecret::from_bytes(vec![0x99; 48]);

    let response = harness
        .send(json_request(
            "PUT",
            &format!("{BASE}/{endpoint_id}"),
            serde_json::json!({
                "subscriptionID": "sub-1",
                "secret": STANDARD.encode(rotated.expose_bytes())
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let with_old = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(Uuid::new_v4())]),
            &secret(),
            "sub-1",
        ))
        .await;
    let with_new = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(Uuid::new_v4())]),
            &rotated,
            "sub-1",
        ))
        .await;

    assert_eq!(with_old.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(with_new.status(), StatusCode::NO_CONTENT);
}

/// An update that drops the subscription puts the endpoint back into the
/// deferred state
#[tokio::test]
async fn test_unbinding_defers_deliveries() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;

    let response = harness
        .send(json_request(
            "PUT",
            &format!("{BASE}/{endpoint_id}"),
            serde_json::json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.get("subscriptionID").is_none());

    let response = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(Uuid::new_v4())]),
            &secret(),
            "sub-1",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Invalid secrets are rejected on update and the stored one is kept
#[tokio::test]
async fn test_update_with_short_secret_is_rejected() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;

    let response = harness
        .send(json_request(
            "PUT",
            &format!("{BASE}/{endpoint_id}"),
            serde_json::json!({ "secret": STANDARD.encode([1u8; 20]) }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "length of the secret should be minimum 32 bytes long (was: 20)"
    );

    let response = harness.send(get(&format!("{BASE}/{endpoint_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Deleted endpoints disappear from listings and stop answering probes
#[tokio::test]
async fn test_delete_endpoint() {
    let harness = TestHarness::new();
    let kept = harness.register_endpoint(&secret()).await;
    let removed = harness.register_endpoint(&secret()).await;

    let response = harness.send(delete(&format!("{BASE}/{removed}"))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listing = body_json(harness.send(get(BASE)).await).await;
    let ids: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|endpoint| endpoint["endpointID"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![kept.as_str()]);

    assert_eq!(
        harness.send(head(&removed)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        harness
            .send(delete(&format!("{BASE}/{removed}")))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
}

/// Malformed identifiers are client errors on every route
#[tokio::test]
async fn test_invalid_endpoint_id_is_bad_request() {
    let harness = TestHarness::new();

    assert_eq!(
        harness.send(get(&format!("{BASE}/nope"))).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        harness.send(head("nope")).await.status(),
        StatusCode::BAD_REQUEST
    );
}

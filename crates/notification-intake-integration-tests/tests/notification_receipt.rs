//! Integration tests for notification receipt through the HTTP API

mod common;

use axum::http::StatusCode;
use common::{
    batch, body_json, equipment_event, head, new_transport_call, post_with_signature, secret,
    shipment_event, signed_post, transport_event, TestHarness,
};
use notification_intake_core::{EventType, SigningSecret};
use uuid::Uuid;

/// Walk an endpoint from registration through probing, binding and
/// repeated delivery of the same event
#[tokio::test]
async fn test_endpoint_lifecycle_with_redelivery() {
    // Arrange
    let harness = TestHarness::new();
    let secret = secret();
    let endpoint_id = harness.register_endpoint(&secret).await;
    let event_id = Uuid::new_v4();
    let payload = batch(&[shipment_event(event_id)]);

    // Liveness probe works before the subscription handshake
    let response = harness.send(head(&endpoint_id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Deliveries before binding are deferred
    let response = harness
        .send(signed_post(&endpoint_id, payload.clone(), &secret, "sub-1"))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get("Retry-After").unwrap(), "60");

    harness.bind_subscription(&endpoint_id, "sub-1").await;

    // A garbled signature is rejected and persists nothing
    let response = harness
        .send(post_with_signature(
            &endpoint_id,
            payload.clone(),
            "sha256=not-hex",
            "sub-1",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.store.event_count(), 0);

    // Act: a correctly signed delivery, then the same delivery again
    let first = harness
        .send(signed_post(&endpoint_id, payload.clone(), &secret, "sub-1"))
        .await;
    let second = harness
        .send(signed_post(&endpoint_id, payload, &secret, "sub-1"))
        .await;

    // Assert
    assert_eq!(first.status(), StatusCode::NO_CONTENT);
    assert_eq!(second.status(), StatusCode::NO_CONTENT);
    assert!(harness
        .store
        .get_event(EventType::Shipment, &event_id)
        .is_some());
    assert_eq!(harness.store.event_count(), 1);

    let sent = harness.mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].subject,
        format!("New SHIPMENT timestamp {}", event_id)
    );
}

/// A delivery signed with another endpoint's secret is rejected
#[tokio::test]
async fn test_delivery_signed_with_wrong_secret_is_unauthorized() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;
    let other_secret = SigningSecret::from_bytes(vec![0x17; 32]);

    let response = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(Uuid::new_v4())]),
            &other_secret,
            "sub-1",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], 401);
    assert!(harness.mail.sent().is_empty());
}

/// A delivery for another subscription is rejected even when signed
#[tokio::test]
async fn test_delivery_for_other_subscription_is_unauthorized() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;

    let response = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(Uuid::new_v4())]),
            &secret(),
            "sub-2",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.store.event_count(), 0);
}

/// A transport call announced without an ID is created and bound
#[tokio::test]
async fn test_new_transport_call_is_created_and_bound() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;
    let event_id = Uuid::new_v4();

    let response = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[transport_event(event_id, new_transport_call())]),
            &secret(),
            "sub-1",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(harness.store.transport_call_count(), 1);

    let stored = harness
        .store
        .get_event(EventType::Transport, &event_id)
        .unwrap();
    let transport_call_id = stored
        .as_transport_call_based()
        .unwrap()
        .transport_call()
        .transport_call_id
        .unwrap();
    let transport_call = harness
        .store
        .get_transport_call(&transport_call_id)
        .unwrap();
    assert_eq!(transport_call.un_location_code.as_deref(), Some("DEHAM"));
}

/// Events in one payload referencing the same unknown transport call
/// share a single stored transport call
#[tokio::test]
async fn test_events_in_one_payload_share_transport_call() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;

    let transport_call_id = Uuid::new_v4();
    let mut transport_call = new_transport_call();
    transport_call["transportCallID"] = serde_json::json!(transport_call_id);

    let response = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[
                transport_event(Uuid::new_v4(), transport_call.clone()),
                equipment_event(Uuid::new_v4(), transport_call),
            ]),
            &secret(),
            "sub-1",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(harness.store.event_count(), 2);
    assert_eq!(harness.store.transport_call_count(), 1);
    assert!(harness
        .store
        .get_transport_call(&transport_call_id)
        .is_some());
}

/// Only events not seen before trigger a notification
#[tokio::test]
async fn test_partially_known_batch_notifies_new_events_only() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;
    let known = Uuid::new_v4();
    let fresh = Uuid::new_v4();

    harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(known)]),
            &secret(),
            "sub-1",
        ))
        .await;
    let response = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(known), shipment_event(fresh)]),
            &secret(),
            "sub-1",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(harness.store.event_count(), 2);

    let subjects: Vec<String> = harness
        .mail
        .sent()
        .into_iter()
        .map(|message| message.subject)
        .collect();
    assert_eq!(
        subjects,
        vec![
            format!("New SHIPMENT timestamp {}", known),
            format!("New SHIPMENT timestamp {}", fresh),
        ]
    );
}

/// Malformed payloads are rejected with the same generic 401
#[tokio::test]
async fn test_signed_malformed_payload_is_unauthorized() {
    let harness = TestHarness::new();
    let endpoint_id = harness.register_endpoint(&secret()).await;
    harness.bind_subscription(&endpoint_id, "sub-1").await;

    let response = harness
        .send(signed_post(
            &endpoint_id,
            br#"{"eventType":"SHIPMENT"}"#.to_vec(),
            &secret(),
            "sub-1",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.store.event_count(), 0);
}

/// Unknown endpoints answer 404 for both probes and deliveries
#[tokio::test]
async fn test_unknown_endpoint_is_not_found() {
    let harness = TestHarness::new();
    let endpoint_id = Uuid::new_v4().to_string();

    let probe = harness.send(head(&endpoint_id)).await;
    let delivery = harness
        .send(signed_post(
            &endpoint_id,
            batch(&[shipment_event(Uuid::new_v4())]),
            &secret(),
            "sub-1",
        ))
        .await;

    assert_eq!(probe.status(), StatusCode::NOT_FOUND);
    assert_eq!(delivery.status(), StatusCode::NOT_FOUND);
}

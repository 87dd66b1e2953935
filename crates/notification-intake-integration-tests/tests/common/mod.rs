//! Common test utilities for notification-intake-api integration tests
//!
//! This module provides:
//! - A recording mail transport so tests can count notifications
//! - A test harness wiring in-memory stores into the router
//! - Request and payload builders

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use notification_intake_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use notification_intake_core::{
    InMemoryEndpointRepository, InMemoryIngestionStore, MailMessage, MailNotifier,
    MailTransport, MessageSignatureHandler, NotifierError, SignatureMethod, SigningSecret,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const BASE: &str = "/notification-endpoints";

// ============================================================================
// Recording Mail Transport
// ============================================================================

/// Mail transport that keeps every message it is asked to send
#[derive(Clone, Default)]
pub struct RecordingMailTransport {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl RecordingMailTransport {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Router plus handles on the stores behind it
pub struct TestHarness {
    pub router: Router,
    pub repository: InMemoryEndpointRepository,
    pub store: InMemoryIngestionStore,
    pub mail: RecordingMailTransport,
}

impl TestHarness {
    /// Harness with mail notifications enabled for every event type
    pub fn new() -> Self {
        let repository = InMemoryEndpointRepository::new();
        let store = InMemoryIngestionStore::new();
        let mail = RecordingMailTransport::default();

        let notifier = MailNotifier::new(
            Box::new(mail.clone()),
            "intake@example.com",
            vec!["ops@example.com".to_string()],
            vec![],
        );

        let state = AppState::new(
            ServiceConfig::default(),
            Arc::new(repository.clone()),
            Arc::new(store.clone()),
            Some(Arc::new(notifier)),
            ServiceMetrics::new().unwrap(),
        );

        Self {
            router: create_router(state),
            repository,
            store,
            mail,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register an endpoint through the API and return its ID
    pub async fn register_endpoint(&self, secret: &SigningSecret) -> String {
        let response = self
            .send(json_request(
                "POST",
                BASE,
                serde_json::json!({ "secret": STANDARD.encode(secret.expose_bytes()) }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        body_json(response).await["endpointID"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Complete the subscription handshake by binding the endpoint
    pub async fn bind_subscription(&self, endpoint_id: &str, subscription_id: &str) {
        let response = self
            .send(json_request(
                "PUT",
                &format!("{BASE}/{endpoint_id}"),
                serde_json::json!({ "subscriptionID": subscription_id }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

// ============================================================================
// Request builders
// ============================================================================

pub fn secret() -> SigningSecret {
    SigningSecret::from_bytes(vec![0x42; 32])
}

pub fn receive_uri(endpoint_id: &str) -> String {
    format!("{BASE}/receive/{endpoint_id}")
}

pub fn head(endpoint_id: &str) -> Request<Body> {
    Request::builder()
        .method("HEAD")
        .uri(receive_uri(endpoint_id))
        .body(Body::empty())
        .unwrap()
}

pub fn post_with_signature(
    endpoint_id: &str,
    body: Vec<u8>,
    signature: &str,
    subscription_id: &str,
) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(receive_uri(endpoint_id))
        .header("content-type", "application/json")
        .header("Notification-Signature", signature)
        .header("Subscription-ID", subscription_id)
        .body(Body::from(body))
        .unwrap()
}

pub fn signed_post(
    endpoint_id: &str,
    body: Vec<u8>,
    secret: &SigningSecret,
    subscription_id: &str,
) -> Request<Body> {
    let signature =
        MessageSignatureHandler::new().sign_header(SignatureMethod::HmacSha256, secret, &body);
    post_with_signature(endpoint_id, body, &signature, subscription_id)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Payload builders
// ============================================================================

pub fn transport_event(event_id: Uuid, transport_call: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "eventType": "TRANSPORT",
        "eventID": event_id,
        "eventCreatedDateTime": "2024-05-02T08:00:00Z",
        "eventDateTime": "2024-05-02T07:40:00Z",
        "eventClassifierCode": "ACT",
        "transportEventTypeCode": "ARRI",
        "transportCall": transport_call
    })
}

pub fn equipment_event(event_id: Uuid, transport_call: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "eventType": "EQUIPMENT",
        "eventID": event_id,
        "eventCreatedDateTime": "2024-05-02T08:10:00Z",
        "eventDateTime": "2024-05-02T08:05:00Z",
        "eventClassifierCode": "ACT",
        "equipmentEventTypeCode": "DISC",
        "equipmentReference": "MSKU9070323",
        "emptyIndicatorCode": "LADEN",
        "transportCall": transport_call
    })
}

pub fn shipment_event(event_id: Uuid) -> serde_json::Value {
    serde_json::json!({
        "eventType": "SHIPMENT",
        "eventID": event_id,
        "eventCreatedDateTime": "2024-05-02T09:00:00Z",
        "eventDateTime": "2024-05-02T09:00:00Z",
        "eventClassifierCode": "ACT",
        "shipmentEventTypeCode": "RECE",
        "documentID": "CARRIER_BOOKING_REFERENCE_01",
        "documentTypeCode": "BKG"
    })
}

/// Transport call without an ID, as first announced by a sender
pub fn new_transport_call() -> serde_json::Value {
    serde_json::json!({
        "carrierVoyageNumber": "2106W",
        "UNLocationCode": "DEHAM",
        "facilityCode": "CTA",
        "modeOfTransport": "VESSEL",
        "vessel": { "vesselIMONumber": "9321483", "vesselName": "King of the Seas" }
    })
}

pub fn batch(events: &[serde_json::Value]) -> Vec<u8> {
    serde_json::to_vec(events).unwrap()
}

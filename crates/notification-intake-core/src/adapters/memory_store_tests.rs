//! Tests for the in-memory ingestion store.

use super::*;
use crate::events::{EventClassifierCode, EventHeader, ShipmentEvent};
use chrono::Utc;

fn shipment_event(event_id: Uuid) -> Event {
    Event::Shipment(ShipmentEvent {
        header: EventHeader {
            event_id,
            event_created_date_time: Utc::now(),
            event_date_time: Utc::now(),
            event_classifier_code: EventClassifierCode::Act,
            new_record: true,
        },
        shipment_event_type_code: "APPR".to_string(),
        document_id: "BR1239719871".to_string(),
        document_type_code: "BKG".to_string(),
        reason: None,
    })
}

#[tokio::test]
async fn test_staged_writes_invisible_until_commit() {
    let store = InMemoryIngestionStore::new();
    let event_id = Uuid::new_v4();

    let mut tx = store.begin().await.unwrap();
    tx.create_event(shipment_event(event_id)).await.unwrap();

    // Visible inside the transaction
    assert!(tx
        .find_event(EventType::Shipment, &event_id)
        .await
        .unwrap()
        .is_some());
    // Not visible outside
    assert_eq!(store.event_count(), 0);

    let receipt = tx.commit().await.unwrap();
    assert_eq!(
        receipt.created_events,
        vec![EventKey::new(EventType::Shipment, event_id)]
    );
    assert_eq!(store.event_count(), 1);

    let stored = store.get_event(EventType::Shipment, &event_id).unwrap();
    assert!(!stored.is_new_record());
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let store = InMemoryIngestionStore::new();

    {
        let mut tx = store.begin().await.unwrap();
        tx.create_event(shipment_event(Uuid::new_v4()))
            .await
            .unwrap();
        tx.create_transport_call(TransportCall::default())
            .await
            .unwrap();
    }

    assert_eq!(store.event_count(), 0);
    assert_eq!(store.transport_call_count(), 0);
}

#[tokio::test]
async fn test_create_transport_call_assigns_id_when_absent() {
    let store = InMemoryIngestionStore::new();
    let mut tx = store.begin().await.unwrap();

    let created = tx
        .create_transport_call(TransportCall {
            un_location_code: Some("NLRTM".to_string()),
            ..TransportCall::default()
        })
        .await
        .unwrap();
    let id = created.transport_call_id.unwrap();

    let found = tx.find_transport_call(&id).await.unwrap().unwrap();
    assert_eq!(found.un_location_code.as_deref(), Some("NLRTM"));

    let receipt = tx.commit().await.unwrap();
    assert_eq!(receipt.created_transport_calls, vec![id]);
    assert!(store.get_transport_call(&id).is_some());
}

#[tokio::test]
async fn test_create_transport_call_keeps_supplied_id() {
    let store = InMemoryIngestionStore::new();
    let supplied = Uuid::new_v4();
    let mut tx = store.begin().await.unwrap();

    let created = tx
        .create_transport_call(TransportCall::default().with_id(supplied))
        .await
        .unwrap();

    assert_eq!(created.transport_call_id, Some(supplied));
}

#[tokio::test]
async fn test_seeded_transport_calls_are_found() {
    let id = Uuid::new_v4();
    let store = InMemoryIngestionStore::with_transport_calls(vec![TransportCall::default().with_id(id)]);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.find_transport_call(&id).await.unwrap().is_some());
    assert!(tx
        .find_transport_call(&Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_racing_commits_insert_event_once() {
    let store = InMemoryIngestionStore::new();
    let event_id = Uuid::new_v4();

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();

    // Both transactions observe the event as absent
    assert!(first
        .find_event(EventType::Shipment, &event_id)
        .await
        .unwrap()
        .is_none());
    assert!(second
        .find_event(EventType::Shipment, &event_id)
        .await
        .unwrap()
        .is_none());

    first.create_event(shipment_event(event_id)).await.unwrap();
    second.create_event(shipment_event(event_id)).await.unwrap();

    let first_receipt = first.commit().await.unwrap();
    let second_receipt = second.commit().await.unwrap();

    assert_eq!(first_receipt.created_events.len(), 1);
    assert!(second_receipt.created_events.is_empty());
    assert_eq!(store.event_count(), 1);
}

#[tokio::test]
async fn test_same_event_id_different_type_is_distinct() {
    let store = InMemoryIngestionStore::new();
    let event_id = Uuid::new_v4();

    let mut tx = store.begin().await.unwrap();
    tx.create_event(shipment_event(event_id)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(tx
        .find_event(EventType::Transport, &event_id)
        .await
        .unwrap()
        .is_none());
}

//! # In-Memory Ingestion Store
//!
//! Thread-safe in-memory implementation of [`IngestionStore`] for tests,
//! development and single-instance deployments.
//!
//! Transactions stage their writes locally. A commit takes the store's
//! write lock once and applies every staged write with insert-if-absent
//! semantics, so concurrent commits of the same event produce exactly one
//! insertion.

use crate::events::{Event, EventKey, EventType, TransportCall};
use crate::store::{CommitReceipt, IngestionStore, IngestionTransaction, StoreError};
use crate::Uuid;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct StoreState {
    transport_calls: HashMap<Uuid, TransportCall>,
    events: HashMap<EventKey, Event>,
}

/// Thread-safe in-memory event and transport call store
#[derive(Clone, Default)]
pub struct InMemoryIngestionStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryIngestionStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with committed transport calls
    pub fn with_transport_calls(transport_calls: Vec<TransportCall>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            for call in transport_calls {
                let id = call.transport_call_id.unwrap_or_else(Uuid::new_v4);
                state.transport_calls.insert(id, call.with_id(id));
            }
        }
        store
    }

    /// Committed event by dedup identity
    pub fn get_event(&self, event_type: EventType, event_id: &Uuid) -> Option<Event> {
        self.read()
            .ok()?
            .events
            .get(&EventKey::new(event_type, *event_id))
            .cloned()
    }

    /// Committed transport call by ID
    pub fn get_transport_call(&self, transport_call_id: &Uuid) -> Option<TransportCall> {
        self.read()
            .ok()?
            .transport_calls
            .get(transport_call_id)
            .cloned()
    }

    /// Number of committed events
    pub fn event_count(&self) -> usize {
        self.read().map(|state| state.events.len()).unwrap_or(0)
    }

    /// Number of committed transport calls
    pub fn transport_call_count(&self) -> usize {
        self.read()
            .map(|state| state.transport_calls.len())
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoreError> {
        self.state.read().map_err(|_| StoreError::Unavailable {
            message: "in-memory store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoreError> {
        self.state.write().map_err(|_| StoreError::Unavailable {
            message: "in-memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl IngestionStore for InMemoryIngestionStore {
    async fn begin(&self) -> Result<Box<dyn IngestionTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            staged_transport_calls: Vec::new(),
            staged_events: Vec::new(),
        }))
    }
}

/// Unit of work staging writes until commit
struct InMemoryTransaction {
    store: InMemoryIngestionStore,
    staged_transport_calls: Vec<TransportCall>,
    staged_events: Vec<Event>,
}

#[async_trait]
impl IngestionTransaction for InMemoryTransaction {
    async fn find_transport_call(
        &mut self,
        transport_call_id: &Uuid,
    ) -> Result<Option<TransportCall>, StoreError> {
        let staged = self
            .staged_transport_calls
            .iter()
            .find(|call| call.transport_call_id.as_ref() == Some(transport_call_id));
        if let Some(call) = staged {
            return Ok(Some(call.clone()));
        }

        Ok(self
            .store
            .read()?
            .transport_calls
            .get(transport_call_id)
            .cloned())
    }

    async fn create_transport_call(
        &mut self,
        transport_call: TransportCall,
    ) -> Result<TransportCall, StoreError> {
        let id = transport_call.transport_call_id.unwrap_or_else(Uuid::new_v4);
        let canonical = transport_call.with_id(id);

        debug!(transport_call_id = %id, "Staging transport call");
        self.staged_transport_calls.push(canonical.clone());
        Ok(canonical)
    }

    async fn find_event(
        &mut self,
        event_type: EventType,
        event_id: &Uuid,
    ) -> Result<Option<Event>, StoreError> {
        let key = EventKey::new(event_type, *event_id);

        let staged = self.staged_events.iter().find(|event| event.key() == key);
        if let Some(event) = staged {
            return Ok(Some(event.clone()));
        }

        Ok(self.store.read()?.events.get(&key).cloned())
    }

    async fn create_event(&mut self, event: Event) -> Result<(), StoreError> {
        debug!(event_key = %event.key(), "Staging event");
        self.staged_events.push(event);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<CommitReceipt, StoreError> {
        let InMemoryTransaction {
            store,
            staged_transport_calls,
            staged_events,
        } = *self;

        let mut state = store.write()?;
        let mut receipt = CommitReceipt::default();

        for call in staged_transport_calls {
            let Some(id) = call.transport_call_id else {
                continue;
            };
            if !state.transport_calls.contains_key(&id) {
                state.transport_calls.insert(id, call);
                receipt.created_transport_calls.push(id);
            }
        }

        for mut event in staged_events {
            let key = event.key();
            if state.events.contains_key(&key) {
                debug!(event_key = %key, "Event committed concurrently, skipping");
                continue;
            }
            event.header_mut().new_record = false;
            state.events.insert(key, event);
            receipt.created_events.push(key);
        }

        Ok(receipt)
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;

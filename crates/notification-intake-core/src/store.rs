//! # Ingestion Store
//!
//! Transactional storage contract for events and transport calls.
//!
//! All reads and writes of one delivery happen inside a single
//! [`IngestionTransaction`]. Writes are staged and only become visible when
//! [`IngestionTransaction::commit`] succeeds; dropping a transaction without
//! committing discards everything it staged.
//!
//! Uniqueness of an event's `(event_type, event_id)` and of a transport
//! call's ID is enforced by the store at commit time with insert-if-absent
//! semantics. The [`CommitReceipt`] reports which events were actually
//! inserted, so two racing deliveries of the same event yield exactly one
//! insertion.

use crate::events::{Event, EventKey, EventType, TransportCall};
use crate::{ErrorCategory, Uuid};
use async_trait::async_trait;

/// Errors raised by an ingestion store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Ingestion store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store operation '{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },
}

impl StoreError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::OperationFailed { .. } => false,
        }
    }

    /// Get error category for monitoring
    pub fn error_category(&self) -> ErrorCategory {
        if self.is_transient() {
            ErrorCategory::Transient
        } else {
            ErrorCategory::Permanent
        }
    }
}

/// What a successful commit actually inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Events inserted by this commit, in staging order
    pub created_events: Vec<EventKey>,
    /// Transport calls inserted by this commit
    pub created_transport_calls: Vec<Uuid>,
}

impl CommitReceipt {
    pub fn was_created(&self, key: &EventKey) -> bool {
        self.created_events.contains(key)
    }
}

/// Storage of events and transport calls
#[async_trait]
pub trait IngestionStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn IngestionTransaction>, StoreError>;
}

/// One unit of work against an [`IngestionStore`]
///
/// Reads observe committed state plus this transaction's own staged writes.
#[async_trait]
pub trait IngestionTransaction: Send {
    /// Find a transport call by its canonical ID
    async fn find_transport_call(
        &mut self,
        transport_call_id: &Uuid,
    ) -> Result<Option<TransportCall>, StoreError>;

    /// Stage a new transport call, assigning an ID when it has none.
    ///
    /// Returns the canonical, ID-bearing copy.
    async fn create_transport_call(
        &mut self,
        transport_call: TransportCall,
    ) -> Result<TransportCall, StoreError>;

    /// Find an event by its dedup identity
    async fn find_event(
        &mut self,
        event_type: EventType,
        event_id: &Uuid,
    ) -> Result<Option<Event>, StoreError>;

    /// Stage a new event
    async fn create_event(&mut self, event: Event) -> Result<(), StoreError>;

    /// Apply every staged write atomically
    async fn commit(self: Box<Self>) -> Result<CommitReceipt, StoreError>;
}

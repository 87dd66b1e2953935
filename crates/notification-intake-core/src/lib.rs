//! # Notification Intake Core
//!
//! Core business logic for receiving signed event notifications on a
//! per-subscriber webhook endpoint.
//!
//! This crate contains the receipt pipeline: authenticating a delivery
//! against the endpoint's shared secret, classifying liveness probes versus
//! payload deliveries, ingesting the carried events exactly once (including
//! find-or-create of the transport call each event references) and
//! dispatching a one-time notification for every newly observed event.
//!
//! ## Architecture
//!
//! - Business logic depends only on trait abstractions
//!   ([`EndpointRepository`], [`IngestionStore`], [`EventNotifier`])
//! - Infrastructure implementations are injected at runtime
//! - In-memory adapters in [`adapters`] make the pipeline runnable without
//!   external infrastructure
//!
//! ## Usage
//!
//! ```rust
//! use notification_intake_core::{EndpointId, SignatureMethod};
//!
//! let endpoint_id = EndpointId::new();
//! let policy = SignatureMethod::HmacSha256.policy();
//! assert_eq!(policy.min_key_length, 32);
//! assert!(!endpoint_id.to_string().is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use uuid::Uuid;

// ============================================================================
// Time and Metadata Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Identifier for tracing requests across system boundaries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get string representation
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = s.parse::<Uuid>().map_err(|_| ParseError::InvalidFormat {
            expected: "UUID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// High-level error categorization for retry and alerting decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Temporary failures that should be retried
    Transient,
    /// Permanent failures that won't succeed on retry
    Permanent,
    /// Security-related failures requiring immediate attention
    Security,
    /// The referenced resource does not exist
    NotFound,
}

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Missing mandatory {field} field")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("length of the {field} should be maximum {max_length} bytes long (was: {actual_length})")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("length of the {field} should be minimum {min_length} bytes long (was: {actual_length})")]
    TooShort {
        field: String,
        min_length: usize,
        actual_length: usize,
    },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Notification endpoint records, signing secrets and the repository contract
pub mod endpoint;

/// Typed events and the transport calls they reference
pub mod events;

/// Inbound notification requests
pub mod request;

/// Signature methods and request verification
pub mod signature;

/// Transactional event and transport call storage contract
pub mod store;

/// One-time side effects for newly ingested events
pub mod notifier;

/// Receipt orchestration: verification, resolution, dedup and dispatch
pub mod ingestion;

/// Endpoint registration with secret policy enforcement
pub mod registration;

/// In-memory implementations of the storage contracts
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{InMemoryEndpointRepository, InMemoryIngestionStore};
pub use endpoint::{
    EndpointId, EndpointRepository, NewNotificationEndpoint, NotificationEndpoint,
    NotificationEndpointUpdate, RepositoryError, SigningSecret, SubscriptionId,
};
pub use events::{
    EquipmentEvent, Event, EventClassifierCode, EventHeader, EventKey, EventType,
    OperationsEvent, ShipmentEvent, TransportCall, TransportCallBased, TransportEvent, Vessel,
};
pub use ingestion::{IngestionError, NotificationReceiver, ReceiptOutcome};
pub use notifier::{
    EventNotifier, MailMessage, MailNotifier, MailTransport, NotifierError, TracingMailTransport,
};
pub use registration::{EndpointRegistry, RegistrationError};
pub use request::{NotificationRequest, ReceiveMethod};
pub use signature::{
    ConversionError, MessageSignatureHandler, SignatureMethod, SignatureMethodPolicy,
    VerificationFailure, VerificationOutcome,
};
pub use store::{CommitReceipt, IngestionStore, IngestionTransaction, StoreError};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

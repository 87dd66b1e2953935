//! # Notification Endpoints
//!
//! A notification endpoint is a registered webhook receiver bound to zero or
//! one upstream subscription and authenticated by a shared signing secret.
//!
//! The endpoint record is owned by the registration store; the receipt
//! pipeline only reads it. Secret policy (length bounds, retention on
//! partial update) is enforced by [`crate::registration::EndpointRegistry`]
//! before anything reaches an [`EndpointRepository`].

use crate::{ParseError, Timestamp, Uuid, ValidationError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a notification endpoint
///
/// Appears verbatim in the receive URL: `/notification-endpoints/receive/{endpoint_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(Uuid);

impl EndpointId {
    /// Generate a new random endpoint ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EndpointId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = s.parse::<Uuid>().map_err(|_| ParseError::InvalidFormat {
            expected: "UUID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

/// Identifier of the upstream subscription feeding an endpoint
///
/// Assigned by the publisher during the subscription handshake, so it is
/// frequently unknown when the endpoint is first registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Maximum accepted length of a subscription ID
    pub const MAX_LENGTH: usize = 128;

    /// Create new subscription ID with validation
    ///
    /// # Validation Rules
    /// - Must be 1-128 characters
    /// - Must contain only printable ASCII without whitespace
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "subscriptionID".to_string(),
            });
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                field: "subscriptionID".to_string(),
                max_length: Self::MAX_LENGTH,
                actual_length: value.len(),
            });
        }

        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError::InvalidFormat {
                field: "subscriptionID".to_string(),
                message: "must contain only printable ASCII characters".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SubscriptionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubscriptionId> for String {
    fn from(value: SubscriptionId) -> Self {
        value.0
    }
}

// ============================================================================
// SigningSecret
// ============================================================================

/// Shared symmetric key used to sign notifications for one endpoint
///
/// The buffer is wiped when dropped and never printed by `Debug`. Length
/// checks against a signature method live in
/// [`SignatureMethodPolicy::validate_key`](crate::signature::SignatureMethodPolicy::validate_key).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Create secret from raw bytes
    pub fn from_bytes(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }

    /// Decode a standard base64 string (the JSON encoding of byte fields)
    pub fn from_base64(encoded: &str) -> Result<Self, ValidationError> {
        BASE64
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "secret".to_string(),
                message: format!("not valid base64: {}", e),
            })
    }

    /// Encode the secret as standard base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Get the raw key bytes (only for immediate use)
    pub fn expose_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Endpoint records
// ============================================================================

/// A registered webhook receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEndpoint {
    pub endpoint_id: EndpointId,
    pub subscription_id: Option<SubscriptionId>,
    pub secret: SigningSecret,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationEndpoint {
    /// Merge an update into this record.
    ///
    /// The subscription binding is replaced wholesale (an absent value
    /// unbinds the endpoint). An absent secret keeps the current one so a
    /// partial update never clears the signing key.
    pub fn apply_update(&self, update: NotificationEndpointUpdate) -> NotificationEndpoint {
        let NotificationEndpointUpdate {
            subscription_id,
            secret,
        } = update;

        NotificationEndpoint {
            endpoint_id: self.endpoint_id,
            subscription_id,
            secret: secret.unwrap_or_else(|| self.secret.clone()),
            created_at: self.created_at,
            updated_at: Timestamp::now(),
        }
    }

    /// Whether the upstream subscription handshake has completed
    pub fn is_bound(&self) -> bool {
        self.subscription_id.is_some()
    }
}

/// Registration request for a new endpoint
#[derive(Debug, Clone, Default)]
pub struct NewNotificationEndpoint {
    pub subscription_id: Option<SubscriptionId>,
    pub secret: Option<SigningSecret>,
}

/// Replacement values for an existing endpoint
#[derive(Debug, Clone, Default)]
pub struct NotificationEndpointUpdate {
    pub subscription_id: Option<SubscriptionId>,
    pub secret: Option<SigningSecret>,
}

// ============================================================================
// Repository contract
// ============================================================================

/// Errors raised by an endpoint repository
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Notification endpoint not found: {endpoint_id}")]
    NotFound { endpoint_id: EndpointId },

    #[error("Notification endpoint already exists: {endpoint_id}")]
    AlreadyExists { endpoint_id: EndpointId },

    #[error("Endpoint repository unavailable: {message}")]
    Unavailable { message: String },
}

impl RepositoryError {
    /// Check if repository error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::NotFound { .. } => false,
            Self::AlreadyExists { .. } => false,
        }
    }
}

/// Storage of endpoint registration records
///
/// Implementations store records as given; policy is applied by the caller.
#[async_trait]
pub trait EndpointRepository: Send + Sync {
    /// Fetch an endpoint by ID, `None` when it does not exist
    async fn find_by_id(
        &self,
        endpoint_id: &EndpointId,
    ) -> Result<Option<NotificationEndpoint>, RepositoryError>;

    /// Persist a new endpoint
    async fn insert(
        &self,
        endpoint: NotificationEndpoint,
    ) -> Result<NotificationEndpoint, RepositoryError>;

    /// Replace an existing endpoint
    async fn update(
        &self,
        endpoint: NotificationEndpoint,
    ) -> Result<NotificationEndpoint, RepositoryError>;

    /// Remove an endpoint, returning whether it existed
    async fn delete(&self, endpoint_id: &EndpointId) -> Result<bool, RepositoryError>;

    /// List all endpoints ordered by creation time
    async fn list(&self) -> Result<Vec<NotificationEndpoint>, RepositoryError>;
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;

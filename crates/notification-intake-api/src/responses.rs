//! Request and response bodies for the HTTP API

use notification_intake_core::{
    NewNotificationEndpoint, NotificationEndpoint, NotificationEndpointUpdate, SigningSecret,
    SubscriptionId, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of endpoint create and update requests
///
/// `secret` is the standard base64 encoding of the key bytes. It is
/// mandatory on create and optional on update.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct EndpointRequest {
    #[serde(rename = "subscriptionID", default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl EndpointRequest {
    fn into_parts(
        self,
    ) -> Result<(Option<SubscriptionId>, Option<SigningSecret>), ValidationError> {
        let subscription_id = self
            .subscription_id
            .map(SubscriptionId::new)
            .transpose()?;
        let secret = self
            .secret
            .as_deref()
            .map(SigningSecret::from_base64)
            .transpose()?;
        Ok((subscription_id, secret))
    }

    pub fn into_new_endpoint(self) -> Result<NewNotificationEndpoint, ValidationError> {
        let (subscription_id, secret) = self.into_parts()?;
        Ok(NewNotificationEndpoint {
            subscription_id,
            secret,
        })
    }

    pub fn into_update(self) -> Result<NotificationEndpointUpdate, ValidationError> {
        let (subscription_id, secret) = self.into_parts()?;
        Ok(NotificationEndpointUpdate {
            subscription_id,
            secret,
        })
    }
}

impl fmt::Debug for EndpointRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRequest")
            .field("subscription_id", &self.subscription_id)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Endpoint representation returned by the registration API
///
/// The signing secret is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResponse {
    #[serde(rename = "endpointID")]
    pub endpoint_id: String,

    #[serde(rename = "subscriptionID", default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl From<&NotificationEndpoint> for EndpointResponse {
    fn from(endpoint: &NotificationEndpoint) -> Self {
        Self {
            endpoint_id: endpoint.endpoint_id.to_string(),
            subscription_id: endpoint
                .subscription_id
                .as_ref()
                .map(|s| s.as_str().to_string()),
            created_at: endpoint.created_at,
            updated_at: endpoint.updated_at,
        }
    }
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub version: String,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: Timestamp,
}

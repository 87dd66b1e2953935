//! # Endpoint Registration
//!
//! Create, read, update and delete notification endpoints while enforcing
//! the signing secret policy.
//!
//! The secret is mandatory on create and must lie within the signature
//! method's key length bounds. An update without a secret keeps the stored
//! one; the merged record is validated again before it is persisted.

use crate::endpoint::{
    EndpointId, EndpointRepository, NewNotificationEndpoint, NotificationEndpoint,
    NotificationEndpointUpdate, RepositoryError,
};
use crate::signature::SignatureMethod;
use crate::{Timestamp, ValidationError};
use std::sync::Arc;
use tracing::{info, instrument};

/// Errors raised by endpoint registration
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Notification endpoint not found: {endpoint_id}")]
    NotFound { endpoint_id: EndpointId },

    #[error("Endpoint repository failure: {0}")]
    Repository(RepositoryError),
}

impl RegistrationError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Repository(e) => e.is_transient(),
            Self::Validation(_) => false,
            Self::NotFound { .. } => false,
        }
    }
}

impl From<RepositoryError> for RegistrationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { endpoint_id } => Self::NotFound { endpoint_id },
            other => Self::Repository(other),
        }
    }
}

/// Registration service for notification endpoints
#[derive(Clone)]
pub struct EndpointRegistry {
    repository: Arc<dyn EndpointRepository>,
    method: SignatureMethod,
}

impl EndpointRegistry {
    pub fn new(repository: Arc<dyn EndpointRepository>) -> Self {
        Self {
            repository,
            method: SignatureMethod::DEFAULT,
        }
    }

    /// Register a new endpoint with a freshly assigned ID
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: NewNotificationEndpoint,
    ) -> Result<NotificationEndpoint, RegistrationError> {
        self.create_with_id(EndpointId::new(), request).await
    }

    /// Register a new endpoint under a caller-chosen ID
    pub async fn create_with_id(
        &self,
        endpoint_id: EndpointId,
        request: NewNotificationEndpoint,
    ) -> Result<NotificationEndpoint, RegistrationError> {
        let NewNotificationEndpoint {
            subscription_id,
            secret,
        } = request;

        self.method.policy().validate_key(secret.as_ref())?;
        let secret = secret.ok_or_else(|| ValidationError::Required {
            field: "secret".to_string(),
        })?;

        let now = Timestamp::now();
        let endpoint = self
            .repository
            .insert(NotificationEndpoint {
                endpoint_id,
                subscription_id,
                secret,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            endpoint_id = %endpoint.endpoint_id,
            bound = endpoint.is_bound(),
            "Notification endpoint registered"
        );
        Ok(endpoint)
    }

    /// Fetch an endpoint
    pub async fn get(
        &self,
        endpoint_id: &EndpointId,
    ) -> Result<NotificationEndpoint, RegistrationError> {
        self.repository
            .find_by_id(endpoint_id)
            .await?
            .ok_or(RegistrationError::NotFound {
                endpoint_id: *endpoint_id,
            })
    }

    /// List all endpoints
    pub async fn list(&self) -> Result<Vec<NotificationEndpoint>, RegistrationError> {
        Ok(self.repository.list().await?)
    }

    /// Update an endpoint, keeping the stored secret when none is supplied
    #[instrument(skip(self, update), fields(endpoint_id = %endpoint_id))]
    pub async fn update(
        &self,
        endpoint_id: &EndpointId,
        update: NotificationEndpointUpdate,
    ) -> Result<NotificationEndpoint, RegistrationError> {
        let current = self.get(endpoint_id).await?;
        let merged = current.apply_update(update);

        self.method.policy().validate_key(Some(&merged.secret))?;

        let endpoint = self.repository.update(merged).await?;
        info!(bound = endpoint.is_bound(), "Notification endpoint updated");
        Ok(endpoint)
    }

    /// Remove an endpoint
    #[instrument(skip(self), fields(endpoint_id = %endpoint_id))]
    pub async fn delete(&self, endpoint_id: &EndpointId) -> Result<(), RegistrationError> {
        if !self.repository.delete(endpoint_id).await? {
            return Err(RegistrationError::NotFound {
                endpoint_id: *endpoint_id,
            });
        }
        info!("Notification endpoint deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;

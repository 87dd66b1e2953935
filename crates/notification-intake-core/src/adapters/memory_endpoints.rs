//! # In-Memory Endpoint Repository
//!
//! Thread-safe in-memory implementation of [`EndpointRepository`].

use crate::endpoint::{EndpointId, EndpointRepository, NotificationEndpoint, RepositoryError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory endpoint repository
#[derive(Clone, Default)]
pub struct InMemoryEndpointRepository {
    endpoints: Arc<RwLock<HashMap<EndpointId, NotificationEndpoint>>>,
}

impl InMemoryEndpointRepository {
    /// Create new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create repository pre-populated with endpoints
    pub fn with_endpoints(endpoints: Vec<NotificationEndpoint>) -> Self {
        let repository = Self::new();
        if let Ok(mut map) = repository.endpoints.write() {
            for endpoint in endpoints {
                map.insert(endpoint.endpoint_id, endpoint);
            }
        }
        repository
    }

    fn poisoned() -> RepositoryError {
        RepositoryError::Unavailable {
            message: "in-memory repository lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl EndpointRepository for InMemoryEndpointRepository {
    async fn find_by_id(
        &self,
        endpoint_id: &EndpointId,
    ) -> Result<Option<NotificationEndpoint>, RepositoryError> {
        let endpoints = self.endpoints.read().map_err(|_| Self::poisoned())?;
        Ok(endpoints.get(endpoint_id).cloned())
    }

    async fn insert(
        &self,
        endpoint: NotificationEndpoint,
    ) -> Result<NotificationEndpoint, RepositoryError> {
        let mut endpoints = self.endpoints.write().map_err(|_| Self::poisoned())?;
        if endpoints.contains_key(&endpoint.endpoint_id) {
            return Err(RepositoryError::AlreadyExists {
                endpoint_id: endpoint.endpoint_id,
            });
        }
        endpoints.insert(endpoint.endpoint_id, endpoint.clone());
        Ok(endpoint)
    }

    async fn update(
        &self,
        endpoint: NotificationEndpoint,
    ) -> Result<NotificationEndpoint, RepositoryError> {
        let mut endpoints = self.endpoints.write().map_err(|_| Self::poisoned())?;
        match endpoints.get_mut(&endpoint.endpoint_id) {
            Some(existing) => {
                *existing = endpoint.clone();
                Ok(endpoint)
            }
            None => Err(RepositoryError::NotFound {
                endpoint_id: endpoint.endpoint_id,
            }),
        }
    }

    async fn delete(&self, endpoint_id: &EndpointId) -> Result<bool, RepositoryError> {
        let mut endpoints = self.endpoints.write().map_err(|_| Self::poisoned())?;
        Ok(endpoints.remove(endpoint_id).is_some())
    }

    async fn list(&self) -> Result<Vec<NotificationEndpoint>, RepositoryError> {
        let endpoints = self.endpoints.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<NotificationEndpoint> = endpoints.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.endpoint_id.to_string().cmp(&b.endpoint_id.to_string()))
        });
        Ok(all)
    }
}

#[cfg(test)]
#[path = "memory_endpoints_tests.rs"]
mod tests;

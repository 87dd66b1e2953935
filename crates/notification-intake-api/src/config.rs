//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use notification_intake_core::{
    EndpointId, EventType, NewNotificationEndpoint, SignatureMethod, SigningSecret,
    SubscriptionId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Service configuration
///
/// Every field carries a default so a partial (or absent) configuration
/// file still produces a runnable service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Notification receipt settings
    pub receiver: ReceiverConfig,

    /// Mail notification settings
    pub notifications: NotificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Endpoints registered at startup
    pub endpoints: Vec<SeedEndpointConfig>,
}

impl ServiceConfig {
    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.receiver.validate()?;
        self.notifications.validate()?;
        self.logging.validate()?;

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            endpoint
                .to_registration()
                .map_err(|e| ConfigError::Invalid {
                    message: format!("endpoints[{}]: {}", index, e),
                })?;
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "server.host".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.timeout_seconds must be greater than 0".to_string(),
            });
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Notification receipt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Base path of the endpoint routes
    pub base_path: String,

    /// `Retry-After` value sent while an endpoint has no subscription
    pub retry_after_seconds: u64,
}

impl ReceiverConfig {
    /// Path of the receive route for axum
    pub fn receive_route(&self) -> String {
        format!("{}/receive/{{endpoint_id}}", self.base_path)
    }

    /// Path of the single-endpoint registration route for axum
    pub fn endpoint_route(&self) -> String {
        format!("{}/{{endpoint_id}}", self.base_path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_path.starts_with('/') || self.base_path.len() < 2 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "receiver.base_path must start with '/' and name a path (was: '{}')",
                    self.base_path
                ),
            });
        }
        if self.base_path.ends_with('/') {
            return Err(ConfigError::Invalid {
                message: "receiver.base_path must not end with '/'".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            base_path: "/notification-endpoints".to_string(),
            retry_after_seconds: 60,
        }
    }
}

/// Mail notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Compose mails for newly received events
    pub enabled: bool,

    /// Event types to notify on (empty = all)
    pub event_types: Vec<String>,

    /// Mail recipients
    pub recipients: Vec<String>,

    /// Mail sender address
    pub sender: String,
}

impl NotificationConfig {
    /// Parse the configured event types
    pub fn parsed_event_types(&self) -> Result<Vec<EventType>, ConfigError> {
        self.event_types
            .iter()
            .map(|value| {
                value.parse::<EventType>().map_err(|e| ConfigError::Invalid {
                    message: format!("notifications.event_types: {}", e),
                })
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.recipients.is_empty() {
            return Err(ConfigError::Missing {
                key: "notifications.recipients".to_string(),
            });
        }
        if self.sender.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "notifications.sender".to_string(),
            });
        }
        self.parsed_event_types()?;
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            event_types: vec![],
            recipients: vec![],
            sender: "noreply@notification-intake.local".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Invalid {
                message: format!("logging.level '{}' is not a valid level", other),
            }),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Endpoint registered when the service starts
#[derive(Clone, Serialize, Deserialize)]
pub struct SeedEndpointConfig {
    /// Endpoint ID (UUID)
    pub id: String,

    /// Bound subscription, if the handshake already happened
    #[serde(default)]
    pub subscription_id: Option<String>,

    /// Signing secret, standard base64
    pub secret: String,
}

impl SeedEndpointConfig {
    /// Convert into a validated registration request
    pub fn to_registration(&self) -> Result<(EndpointId, NewNotificationEndpoint), ConfigError> {
        let endpoint_id = self
            .id
            .parse::<EndpointId>()
            .map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })?;

        let subscription_id = self
            .subscription_id
            .as_deref()
            .map(SubscriptionId::new)
            .transpose()?;

        let secret = SigningSecret::from_base64(&self.secret)?;
        SignatureMethod::DEFAULT
            .policy()
            .validate_key(Some(&secret))?;

        Ok((
            endpoint_id,
            NewNotificationEndpoint {
                subscription_id,
                secret: Some(secret),
            },
        ))
    }
}

impl fmt::Debug for SeedEndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedEndpointConfig")
            .field("id", &self.id)
            .field("subscription_id", &self.subscription_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

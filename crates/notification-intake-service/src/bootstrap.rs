//! Startup wiring: configuration sources, logging, and application state.

use notification_intake_api::{
    AppState, ConfigError, LoggingConfig, NotificationConfig, SeedEndpointConfig, ServiceConfig,
    ServiceError, ServiceMetrics,
};
use notification_intake_core::{
    EndpointRegistry, EventNotifier, InMemoryEndpointRepository, InMemoryIngestionStore,
    MailNotifier, TracingMailTransport,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// System-wide configuration file (extension resolved by the config crate)
pub const SYSTEM_CONFIG_PATH: &str = "/etc/notification-intake/service";

/// Deployment-local configuration file
pub const LOCAL_CONFIG_PATH: &str = "config/service";

/// Environment variable naming an operator-supplied configuration file
pub const CONFIG_FILE_ENV: &str = "NI_CONFIG_FILE";

/// Prefix for configuration overrides, e.g. `NI__SERVER__PORT=9090`
pub const ENV_PREFIX: &str = "NI";

// ============================================================================
// Configuration
// ============================================================================

/// A YAML configuration file and whether it must exist
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: String,
    pub required: bool,
}

impl FileSource {
    pub fn optional(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }

    pub fn required(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }
}

/// The file sources used by the service binary, in override order
pub fn default_file_sources() -> Vec<FileSource> {
    let mut sources = vec![
        FileSource::optional(SYSTEM_CONFIG_PATH),
        FileSource::optional(LOCAL_CONFIG_PATH),
    ];

    if let Ok(explicit_path) = std::env::var(CONFIG_FILE_ENV) {
        if !explicit_path.is_empty() {
            info!(path = %explicit_path, "Loading configuration from explicit path");
            sources.push(FileSource::required(explicit_path));
        }
    }

    sources
}

/// Layer the file sources and prefixed environment variables into a config
///
/// Later sources override earlier ones; environment variables win over
/// every file. The result is validated before it is returned.
pub fn load_config(
    files: &[FileSource],
    env_prefix: &str,
) -> Result<ServiceConfig, ServiceError> {
    let builder = files.iter().fold(config::Config::builder(), |builder, source| {
        builder.add_source(
            config::File::with_name(&source.path)
                .required(source.required)
                .format(config::FileFormat::Yaml),
        )
    });

    let service_config: ServiceConfig = builder
        .add_source(config::Environment::with_prefix(env_prefix).separator("__"))
        .build()
        .and_then(|cfg| cfg.try_deserialize())
        .map_err(|e| {
            ServiceError::Configuration(ConfigError::Invalid {
                message: e.to_string(),
            })
        })?;

    service_config.validate()?;
    Ok(service_config)
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let level = config.level.to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "notification_intake_service={level},notification_intake_api={level},\
             notification_intake_core={level},tower_http=info"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Build the mail notifier when notifications are enabled
pub fn build_notifier(
    config: &NotificationConfig,
) -> Result<Option<Arc<dyn EventNotifier>>, ConfigError> {
    if !config.enabled {
        return Ok(None);
    }

    let notifier = MailNotifier::new(
        Box::new(TracingMailTransport),
        config.sender.clone(),
        config.recipients.clone(),
        config.parsed_event_types()?,
    );

    Ok(Some(Arc::new(notifier)))
}

/// Register the configured endpoints, returning how many were added
pub async fn seed_endpoints(
    registry: &EndpointRegistry,
    seeds: &[SeedEndpointConfig],
) -> Result<usize, ServiceError> {
    for (index, seed) in seeds.iter().enumerate() {
        let (endpoint_id, registration) = seed.to_registration()?;
        registry
            .create_with_id(endpoint_id, registration)
            .await
            .map_err(|e| ServiceError::StartupFailed {
                message: format!("endpoints[{}]: {}", index, e),
            })?;
    }

    Ok(seeds.len())
}

/// Wire the in-memory stores, notifier and metrics into application state
pub async fn build_state(config: ServiceConfig) -> Result<AppState, ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| ServiceError::StartupFailed {
        message: format!("metrics registry: {}", e),
    })?;
    let notifier = build_notifier(&config.notifications)?;
    let seeds = config.endpoints.clone();

    let state = AppState::new(
        config,
        Arc::new(InMemoryEndpointRepository::new()),
        Arc::new(InMemoryIngestionStore::new()),
        notifier,
        metrics,
    );

    let seeded = seed_endpoints(&state.registry, &seeds).await?;
    info!(
        endpoints = seeded,
        notifications = state.config.notifications.enabled,
        "Application state ready"
    );

    Ok(state)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;

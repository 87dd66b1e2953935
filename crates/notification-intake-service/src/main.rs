//! # Notification Intake Service
//!
//! Binary entry point for the notification intake HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes structured logging
//! - Registers the configured endpoints and the optional mail notifier
//! - Starts the HTTP server from notification-intake-api

mod bootstrap;

use notification_intake_api::{start_server, LoggingConfig, ServiceError};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order, later sources override earlier ones):
    //  1. /etc/notification-intake/service.yaml
    //  2. ./config/service.yaml
    //  3. Path given by NI_CONFIG_FILE
    //  4. Environment variables prefixed NI__ (double-underscore separator)
    //     e.g. NI__RECEIVER__RETRY_AFTER_SECONDS=30
    // -------------------------------------------------------------------------
    let service_config =
        match bootstrap::load_config(&bootstrap::default_file_sources(), bootstrap::ENV_PREFIX) {
            Ok(config) => config,
            Err(e) => {
                bootstrap::init_logging(&LoggingConfig::default());
                error!(error = %e, "Service configuration is invalid; aborting");
                std::process::exit(3);
            }
        };

    bootstrap::init_logging(&service_config.logging);
    info!("Starting Notification Intake Service");

    let state = match bootstrap::build_state(service_config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialise service; aborting");
            std::process::exit(exit_code(&e));
        }
    };

    info!(
        host = %state.config.server.host,
        port = state.config.server.port,
        base_path = %state.config.receiver.base_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(state).await {
        error!("Server terminated: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
        ServiceError::StartupFailed { .. } => 4,
    }
}

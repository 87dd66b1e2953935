//! # Notification Intake HTTP Service
//!
//! HTTP surface for notification endpoints.
//!
//! This service provides:
//! - Receive endpoint (`POST`/`HEAD {base}/receive/{endpoint_id}`) with
//!   signature verification and idempotent ingestion
//! - Endpoint registration API (`{base}` and `{base}/{endpoint_id}`)
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{
    LoggingConfig, NotificationConfig, ReceiverConfig, SeedEndpointConfig, ServerConfig,
    ServiceConfig,
};
pub use errors::{ConfigError, ReceiveHandlerError, RegistrationHandlerError, ServiceError};
pub use metrics::ServiceMetrics;
pub use responses::{EndpointRequest, EndpointResponse, HealthResponse, ReadinessResponse};

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, Method, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use notification_intake_core::{
    CorrelationId, EndpointId, EndpointRegistry, EndpointRepository, EventNotifier,
    IngestionStore, NotificationReceiver, NotificationRequest, ReceiveMethod, Timestamp,
};
use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Receipt pipeline
    pub receiver: Arc<NotificationReceiver>,

    /// Endpoint registration service
    pub registry: EndpointRegistry,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    ///
    /// The receipt pipeline and the registration service share the same
    /// endpoint repository.
    pub fn new(
        config: ServiceConfig,
        endpoints: Arc<dyn EndpointRepository>,
        store: Arc<dyn IngestionStore>,
        notifier: Option<Arc<dyn EventNotifier>>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let receiver = Arc::new(NotificationReceiver::new(
            endpoints.clone(),
            store,
            notifier,
        ));
        let registry = EndpointRegistry::new(endpoints);

        Self {
            config,
            receiver,
            registry,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let receiver_config = &state.config.receiver;

    let receive_routes = Router::new().route(
        &receiver_config.receive_route(),
        post(handle_receive).head(handle_receive),
    );

    let registration_routes = Router::new()
        .route(
            &receiver_config.base_path,
            post(create_endpoint).get(list_endpoints),
        )
        .route(
            &receiver_config.endpoint_route(),
            get(get_endpoint).put(update_endpoint).delete(delete_endpoint),
        );

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    let timeout = Duration::from_secs(state.config.server.timeout_seconds);
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .merge(receive_routes)
        .merge(registration_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(DefaultBodyLimit::max(max_body_size))
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and serve until SIGINT or SIGTERM
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let server_config = state.config.server.clone();

    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port)
        .parse()
        .map_err(|e| {
            ServiceError::Configuration(ConfigError::Invalid {
                message: format!(
                    "server address {}:{} is invalid: {}",
                    server_config.host, server_config.port, e
                ),
            })
        })?;

    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = Duration::from_secs(server_config.shutdown_timeout_seconds);
    let shutdown_started = Arc::new(Notify::new());

    let signal_notify = shutdown_started.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                info!(
                    "Initiating graceful shutdown with {}s timeout",
                    shutdown_timeout.as_secs()
                );
                signal_notify.notify_one();
            })
            .await
    };

    // In-flight requests get `shutdown_timeout` to finish once the signal arrives
    let deadline = async move {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = deadline => {
            warn!("Graceful shutdown timed out; abandoning in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Receive Handler
// ============================================================================

/// Receive a notification or liveness probe for one endpoint
///
/// Any successful outcome maps to `204 No Content`.
#[instrument(skip(state, headers, body), fields(endpoint_id = %endpoint_id, method = %method))]
pub async fn handle_receive(
    State(state): State<AppState>,
    Path(endpoint_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ReceiveHandlerError> {
    let parsed_id = endpoint_id
        .parse::<EndpointId>()
        .map_err(|_| ReceiveHandlerError::InvalidEndpointId {
            value: endpoint_id.clone(),
        })?;

    let receive_method = if method == Method::HEAD {
        ReceiveMethod::Head
    } else {
        ReceiveMethod::Post
    };

    let request = NotificationRequest::new(receive_method, header_map(&headers), body);

    match state
        .receiver
        .receive_notification(&request, &parsed_id)
        .await
    {
        Ok(outcome) => {
            state.metrics.record_receipt(&outcome);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            state.metrics.record_failure(&e);
            Err(ReceiveHandlerError::from_ingestion(
                e,
                state.config.receiver.retry_after_seconds,
            ))
        }
    }
}

/// Convert HTTP headers, skipping values that are not valid UTF-8
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

// ============================================================================
// Registration Handlers
// ============================================================================

fn parse_endpoint_id(value: &str) -> Result<EndpointId, RegistrationHandlerError> {
    value
        .parse::<EndpointId>()
        .map_err(|_| RegistrationHandlerError::InvalidEndpointId {
            value: value.to_string(),
        })
}

fn parse_endpoint_request(body: &[u8]) -> Result<EndpointRequest, RegistrationHandlerError> {
    serde_json::from_slice(body).map_err(|e| RegistrationHandlerError::InvalidBody {
        message: e.to_string(),
    })
}

/// Register a new endpoint
#[instrument(skip(state, body))]
async fn create_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<EndpointResponse>), RegistrationHandlerError> {
    let request = parse_endpoint_request(&body)?.into_new_endpoint()?;
    let endpoint = state.registry.create(request).await?;

    Ok((StatusCode::CREATED, Json(EndpointResponse::from(&endpoint))))
}

/// List all endpoints
#[instrument(skip(state))]
async fn list_endpoints(
    State(state): State<AppState>,
) -> Result<Json<Vec<EndpointResponse>>, RegistrationHandlerError> {
    let endpoints = state.registry.list().await?;
    Ok(Json(endpoints.iter().map(EndpointResponse::from).collect()))
}

/// Fetch one endpoint
#[instrument(skip(state))]
async fn get_endpoint(
    State(state): State<AppState>,
    Path(endpoint_id): Path<String>,
) -> Result<Json<EndpointResponse>, RegistrationHandlerError> {
    let endpoint_id = parse_endpoint_id(&endpoint_id)?;
    let endpoint = state.registry.get(&endpoint_id).await?;
    Ok(Json(EndpointResponse::from(&endpoint)))
}

/// Update one endpoint; an omitted secret keeps the stored one
#[instrument(skip(state, body))]
async fn update_endpoint(
    State(state): State<AppState>,
    Path(endpoint_id): Path<String>,
    body: Bytes,
) -> Result<Json<EndpointResponse>, RegistrationHandlerError> {
    let endpoint_id = parse_endpoint_id(&endpoint_id)?;
    let update = parse_endpoint_request(&body)?.into_update()?;
    let endpoint = state.registry.update(&endpoint_id, update).await?;
    Ok(Json(EndpointResponse::from(&endpoint)))
}

/// Remove one endpoint
#[instrument(skip(state))]
async fn delete_endpoint(
    State(state): State<AppState>,
    Path(endpoint_id): Path<String>,
) -> Result<StatusCode, RegistrationHandlerError> {
    let endpoint_id = parse_endpoint_id(&endpoint_id)?;
    state.registry.delete(&endpoint_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Health and Observability Handlers
// ============================================================================

/// Basic liveness check
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Timestamp::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check: the endpoint repository must be reachable
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let ready = match state.registry.list().await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Endpoint repository not reachable");
            false
        }
    };

    let response = ReadinessResponse {
        ready,
        timestamp: Timestamp::now(),
    };

    if ready {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Prometheus metrics endpoint
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .encode()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID propagation
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| CorrelationId::new().to_string());

    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// Request count and latency metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(request).await;

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration
        .observe(start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

//! Metrics collection for the API service.
//!
//! Metrics live on a service-owned [`Registry`] so several service instances
//! (and tests) can coexist in one process.

use notification_intake_core::{IngestionError, ReceiptOutcome};
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounter,
    pub http_request_duration: Histogram,

    // Receipt metrics
    pub notifications_received_total: IntCounterVec,
    pub events_created_total: IntCounter,
    pub duplicate_events_total: IntCounter,

    // Security metrics
    pub authentication_failures_total: IntCounter,

    // Side effect metrics
    pub notification_dispatch_failures_total: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
        )?;
        let notifications_received_total = IntCounterVec::new(
            Opts::new(
                "notifications_received_total",
                "Notification requests received, by outcome",
            ),
            &["outcome"],
        )?;
        let events_created_total =
            IntCounter::new("events_created_total", "Events stored for the first time")?;
        let duplicate_events_total = IntCounter::new(
            "duplicate_events_total",
            "Events skipped because they were already stored",
        )?;
        let authentication_failures_total = IntCounter::new(
            "authentication_failures_total",
            "Notifications rejected by signature or subscription verification",
        )?;
        let notification_dispatch_failures_total = IntCounter::new(
            "notification_dispatch_failures_total",
            "Event notifications that failed to dispatch",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(notifications_received_total.clone()))?;
        registry.register(Box::new(events_created_total.clone()))?;
        registry.register(Box::new(duplicate_events_total.clone()))?;
        registry.register(Box::new(authentication_failures_total.clone()))?;
        registry.register(Box::new(notification_dispatch_failures_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            notifications_received_total,
            events_created_total,
            duplicate_events_total,
            authentication_failures_total,
            notification_dispatch_failures_total,
        }))
    }

    /// Record a successful receipt
    pub fn record_receipt(&self, outcome: &ReceiptOutcome) {
        match outcome {
            ReceiptOutcome::Probe => {
                self.notifications_received_total
                    .with_label_values(&["probe"])
                    .inc();
            }
            ReceiptOutcome::Delivered {
                created,
                duplicates,
                notification_failures,
            } => {
                self.notifications_received_total
                    .with_label_values(&["delivered"])
                    .inc();
                self.events_created_total.inc_by(created.len() as u64);
                self.duplicate_events_total.inc_by(*duplicates as u64);
                self.notification_dispatch_failures_total
                    .inc_by(*notification_failures as u64);
            }
        }
    }

    /// Record a failed receipt
    pub fn record_failure(&self, error: &IngestionError) {
        let outcome = match error {
            IngestionError::EndpointNotFound { .. } => "not_found",
            IngestionError::SubscriptionNotBound { .. } => "unbound",
            IngestionError::Unauthorized { .. } => {
                self.authentication_failures_total.inc();
                "unauthorized"
            }
            IngestionError::Store(_) | IngestionError::Repository(_) => "error",
        };
        self.notifications_received_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

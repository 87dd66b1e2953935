//! # Notification Ingestion
//!
//! Orchestrates the receipt of one notification request.
//!
//! ## Processing Pipeline
//!
//! 1. Load the endpoint named in the URL
//! 2. `HEAD` requests end here as a liveness probe
//! 3. Require a bound subscription, then verify the signature and parse the
//!    body into events
//! 4. Inside one unit of work, for each event in payload order: resolve its
//!    transport call (find, else create) and store it unless its
//!    `(event_type, event_id)` is already known
//! 5. Commit, then notify once for every event the commit inserted
//!
//! Nothing is written unless the whole batch commits. Notifications run on a
//! spawned task, so a caller that stops waiting after the commit (a timeout
//! or a dropped connection) cannot cancel them. Notifier failures are logged
//! and reported in the outcome but never fail the delivery.

use crate::endpoint::{EndpointId, EndpointRepository, RepositoryError};
use crate::events::{Event, EventKey};
use crate::notifier::EventNotifier;
use crate::request::{NotificationRequest, ReceiveMethod};
use crate::signature::{ConversionError, MessageSignatureHandler, VerificationOutcome};
use crate::store::{CommitReceipt, IngestionStore, IngestionTransaction, StoreError};
use crate::ErrorCategory;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Instrument};

// ============================================================================
// Outcomes and errors
// ============================================================================

/// Successful result of receiving a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// `HEAD` liveness probe against an existing endpoint
    Probe,

    /// Payload delivery was verified and committed
    Delivered {
        /// Events inserted by this delivery, in payload order
        created: Vec<EventKey>,
        /// Events skipped because they were already known
        duplicates: usize,
        /// Notifications for created events that failed to dispatch
        notification_failures: usize,
    },
}

/// Errors that abort the receipt of a notification
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Notification endpoint not found: {endpoint_id}")]
    EndpointNotFound { endpoint_id: EndpointId },

    #[error("Notification endpoint {endpoint_id} is not bound to a subscription")]
    SubscriptionNotBound { endpoint_id: EndpointId },

    #[error("Notification for endpoint {endpoint_id} failed verification")]
    Unauthorized { endpoint_id: EndpointId },

    #[error("Event storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Endpoint lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl IngestionError {
    /// Check if error is transient and the sender should retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SubscriptionNotBound { .. } => true,
            Self::Store(e) => e.is_transient(),
            Self::Repository(e) => e.is_transient(),
            Self::EndpointNotFound { .. } => false,
            Self::Unauthorized { .. } => false,
        }
    }

    /// Get error category for monitoring
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::EndpointNotFound { .. } => ErrorCategory::NotFound,
            Self::SubscriptionNotBound { .. } => ErrorCategory::Transient,
            Self::Unauthorized { .. } => ErrorCategory::Security,
            Self::Store(e) => e.error_category(),
            Self::Repository(e) => {
                if e.is_transient() {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
        }
    }
}

// ============================================================================
// NotificationReceiver
// ============================================================================

/// Receipt pipeline for notification endpoints
pub struct NotificationReceiver {
    endpoints: Arc<dyn EndpointRepository>,
    store: Arc<dyn IngestionStore>,
    notifier: Option<Arc<dyn EventNotifier>>,
    verifier: MessageSignatureHandler,
}

impl NotificationReceiver {
    /// Create a receiver
    ///
    /// # Arguments
    ///
    /// * `endpoints` - Source of endpoint registrations
    /// * `store` - Transactional event and transport call storage
    /// * `notifier` - Optional side effect for newly created events
    pub fn new(
        endpoints: Arc<dyn EndpointRepository>,
        store: Arc<dyn IngestionStore>,
        notifier: Option<Arc<dyn EventNotifier>>,
    ) -> Self {
        Self {
            endpoints,
            store,
            notifier,
            verifier: MessageSignatureHandler::new(),
        }
    }

    /// Receive one notification request addressed to `endpoint_id`
    #[instrument(
        skip(self, request),
        fields(
            endpoint_id = %endpoint_id,
            method = %request.method,
            received_at = %request.received_at
        )
    )]
    pub async fn receive_notification(
        &self,
        request: &NotificationRequest,
        endpoint_id: &EndpointId,
    ) -> Result<ReceiptOutcome, IngestionError> {
        let endpoint = self
            .endpoints
            .find_by_id(endpoint_id)
            .await?
            .ok_or(IngestionError::EndpointNotFound {
                endpoint_id: *endpoint_id,
            })?;

        if request.method == ReceiveMethod::Head {
            debug!("Liveness probe acknowledged");
            return Ok(ReceiptOutcome::Probe);
        }

        let subscription_id =
            endpoint
                .subscription_id
                .as_ref()
                .ok_or(IngestionError::SubscriptionNotBound {
                    endpoint_id: *endpoint_id,
                })?;

        let outcome = self.verifier.verify_request(
            request,
            subscription_id,
            &endpoint.secret,
            |body| Event::parse_batch(body).map_err(ConversionError::from),
        );

        let events = match outcome {
            VerificationOutcome::Valid(events) => events,
            invalid => {
                debug!(result = %invalid.result(), "Notification verification failed");
                return Err(IngestionError::Unauthorized {
                    endpoint_id: *endpoint_id,
                });
            }
        };

        let received = events.len();
        let (staged, receipt, duplicates) = self.ingest(events).await?;
        let notification_failures = self.dispatch(staged, &receipt).await;

        info!(
            received,
            created = receipt.created_events.len(),
            duplicates,
            notification_failures,
            "Notification ingested"
        );

        Ok(ReceiptOutcome::Delivered {
            created: receipt.created_events,
            duplicates,
            notification_failures,
        })
    }

    /// Resolve and store every event inside one unit of work.
    ///
    /// Returns the events staged for creation, the commit receipt and the
    /// number of events skipped as already known.
    async fn ingest(
        &self,
        events: Vec<Event>,
    ) -> Result<(Vec<Event>, CommitReceipt, usize), IngestionError> {
        let mut tx = self.store.begin().await?;
        let mut staged = Vec::with_capacity(events.len());
        let mut duplicates = 0;

        for mut event in events {
            event.mark_new();
            resolve_transport_call(tx.as_mut(), &mut event).await?;

            if store_if_new(tx.as_mut(), &event).await? {
                staged.push(event);
            } else {
                duplicates += 1;
            }
        }

        let receipt = tx.commit().await?;

        // Staged events that lost an insert race were duplicates after all
        duplicates += staged.len().saturating_sub(receipt.created_events.len());

        Ok((staged, receipt, duplicates))
    }

    /// Notify once for each event the commit inserted, returning the failure count.
    ///
    /// The events are already committed, so the notifications are handed to
    /// a detached task that runs to completion even if this future is dropped.
    async fn dispatch(&self, staged: Vec<Event>, receipt: &CommitReceipt) -> usize {
        let Some(notifier) = self.notifier.clone() else {
            return 0;
        };

        let created: Vec<Event> = staged
            .into_iter()
            .filter(|e| receipt.was_created(&e.key()))
            .collect();
        if created.is_empty() {
            return 0;
        }

        let pending = created.len();
        let task = tokio::spawn(notify_all(notifier, created).in_current_span());
        match task.await {
            Ok(failures) => failures,
            Err(e) => {
                warn!(error = %e, pending, "Notification task did not complete");
                pending
            }
        }
    }
}

async fn notify_all(notifier: Arc<dyn EventNotifier>, events: Vec<Event>) -> usize {
    let mut failures = 0;
    for event in &events {
        if let Err(e) = notifier.notify(event).await {
            failures += 1;
            warn!(
                event_key = %event.key(),
                error = %e,
                transient = e.is_transient(),
                "Event notification failed"
            );
        }
    }
    failures
}

/// Find-or-create the transport call an event references and bind the
/// canonical, ID-bearing copy back onto the event.
///
/// Events without a transport call are left untouched.
pub async fn resolve_transport_call(
    tx: &mut dyn IngestionTransaction,
    event: &mut Event,
) -> Result<(), StoreError> {
    let reference = match event.as_transport_call_based() {
        Some(based) => based.transport_call().clone(),
        None => return Ok(()),
    };

    let existing = match reference.transport_call_id {
        Some(id) => tx.find_transport_call(&id).await?,
        None => None,
    };

    let canonical = match existing {
        Some(found) => found,
        None => tx.create_transport_call(reference).await?,
    };

    if let Some(based) = event.as_transport_call_based_mut() {
        based.bind_transport_call(canonical);
    }
    Ok(())
}

/// Stage an event unless its `(event_type, event_id)` is already known.
///
/// Returns `true` when the event was staged for creation.
pub async fn store_if_new(
    tx: &mut dyn IngestionTransaction,
    event: &Event,
) -> Result<bool, StoreError> {
    if tx
        .find_event(event.event_type(), &event.event_id())
        .await?
        .is_some()
    {
        debug!(event_key = %event.key(), "Duplicate event skipped");
        return Ok(false);
    }

    tx.create_event(event.clone()).await?;
    Ok(true)
}

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod tests;

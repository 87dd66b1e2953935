//! # Event Notifier
//!
//! One-time side effects for newly ingested events.
//!
//! The receipt pipeline calls [`EventNotifier::notify`] once for each event
//! a commit reports as inserted. A notifier failure is the notifier's
//! problem: it is logged and counted by the caller but never rolls back or
//! fails the delivery.
//!
//! [`MailNotifier`] composes a timestamp notification mail for configured
//! event types and hands it to a [`MailTransport`]. [`TracingMailTransport`]
//! writes the composed message to the log instead of sending it.

use crate::events::{Event, EventType, TransportCall};
use async_trait::async_trait;
use tracing::{debug, info};

/// Errors raised while dispatching a notification
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Notification delivery failed: {message}")]
    DeliveryFailed { message: String },

    #[error("Notifier misconfigured: {message}")]
    Configuration { message: String },
}

impl NotifierError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DeliveryFailed { .. } => true,
            Self::Configuration { .. } => false,
        }
    }
}

/// Side effect fired once per newly created event
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn notify(&self, event: &Event) -> Result<(), NotifierError>;
}

// ============================================================================
// Mail
// ============================================================================

/// A composed notification mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Outbound mail delivery
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), NotifierError>;
}

/// Mail transport that logs messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct TracingMailTransport;

#[async_trait]
impl MailTransport for TracingMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), NotifierError> {
        info!(
            sender = %message.sender,
            recipients = ?message.recipients,
            subject = %message.subject,
            "Timestamp notification mail composed"
        );
        debug!(body = %message.body, "Timestamp notification mail body");
        Ok(())
    }
}

/// Notifier composing timestamp mails for selected event types
pub struct MailNotifier {
    transport: Box<dyn MailTransport>,
    sender: String,
    recipients: Vec<String>,
    event_types: Vec<EventType>,
}

impl MailNotifier {
    /// Create a notifier.
    ///
    /// An empty `event_types` list notifies on every event type.
    pub fn new(
        transport: Box<dyn MailTransport>,
        sender: impl Into<String>,
        recipients: Vec<String>,
        event_types: Vec<EventType>,
    ) -> Self {
        Self {
            transport,
            sender: sender.into(),
            recipients,
            event_types,
        }
    }

    /// Whether mails are composed for this event type
    pub fn handles(&self, event_type: EventType) -> bool {
        self.event_types.is_empty() || self.event_types.contains(&event_type)
    }

    /// Compose the mail for an event
    pub fn compose(&self, event: &Event) -> MailMessage {
        let header = event.header();
        let mut body = format!(
            "A new {} event has been received.\n\n\
             Event ID: {}\n\
             Classifier: {:?}\n\
             Event date/time: {}\n\
             Created: {}\n",
            event.event_type(),
            header.event_id,
            header.event_classifier_code,
            header.event_date_time.to_rfc3339(),
            header.event_created_date_time.to_rfc3339(),
        );

        if let Some(call) = event.as_transport_call_based().map(|e| e.transport_call()) {
            body.push_str(&describe_transport_call(call));
        }

        MailMessage {
            sender: self.sender.clone(),
            recipients: self.recipients.clone(),
            subject: format!("New {} timestamp {}", event.event_type(), header.event_id),
            body,
        }
    }
}

#[async_trait]
impl EventNotifier for MailNotifier {
    async fn notify(&self, event: &Event) -> Result<(), NotifierError> {
        if !self.handles(event.event_type()) {
            debug!(event_key = %event.key(), "Event type not configured for notification");
            return Ok(());
        }

        if self.recipients.is_empty() {
            return Err(NotifierError::Configuration {
                message: "no notification recipients configured".to_string(),
            });
        }

        let message = self.compose(event);
        self.transport.send(&message).await
    }
}

fn describe_transport_call(call: &TransportCall) -> String {
    let mut text = String::from("\nTransport call:\n");
    if let Some(id) = call.transport_call_id {
        text.push_str(&format!("  ID: {}\n", id));
    }
    if let Some(location) = &call.un_location_code {
        text.push_str(&format!("  Location: {}\n", location));
    }
    if let Some(voyage) = &call.carrier_voyage_number {
        text.push_str(&format!("  Voyage: {}\n", voyage));
    }
    if let Some(vessel) = call.vessel.as_ref().and_then(|v| v.vessel_name.as_ref()) {
        text.push_str(&format!("  Vessel: {}\n", vessel));
    }
    text
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;

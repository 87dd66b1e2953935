//! # Events
//!
//! Typed events carried by a notification payload and the transport calls
//! they reference.
//!
//! Events form a closed set of variants tagged by `eventType` on the wire.
//! Every variant shares the dedup identity `(eventType, eventID)`; only the
//! variants that reference a transport call implement [`TransportCallBased`],
//! which is what the ingestion pipeline uses to resolve and bind the
//! correlated resource.
//!
//! ## Wire Format
//!
//! A payload is a JSON array of event objects using the camelCase field
//! names of the publisher (`eventID`, `transportCallID`, `UNLocationCode`):
//!
//! ```json
//! [{
//!   "eventType": "TRANSPORT",
//!   "eventID": "5e51e72c-d872-11ea-811c-0f8f10a32ea1",
//!   "eventCreatedDateTime": "2024-03-01T10:00:00Z",
//!   "eventDateTime": "2024-03-01T09:30:00Z",
//!   "eventClassifierCode": "ACT",
//!   "transportEventTypeCode": "ARRI",
//!   "transportCall": { "transportCallID": "8b64d20b-523b-4491-b2e5-32cfa5174eed" }
//! }]
//! ```

use crate::{ParseError, Uuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identity
// ============================================================================

/// Kind of event, the first half of the dedup identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Transport,
    Equipment,
    Operations,
    Shipment,
}

impl EventType {
    /// Get wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::Equipment => "EQUIPMENT",
            Self::Operations => "OPERATIONS",
            Self::Shipment => "SHIPMENT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRANSPORT" => Ok(Self::Transport),
            "EQUIPMENT" => Ok(Self::Equipment),
            "OPERATIONS" => Ok(Self::Operations),
            "SHIPMENT" => Ok(Self::Shipment),
            _ => Err(ParseError::InvalidFormat {
                expected: "TRANSPORT, EQUIPMENT, OPERATIONS or SHIPMENT".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Dedup identity of an event: `(event_type, event_id)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub event_type: EventType,
    pub event_id: Uuid,
}

impl EventKey {
    pub fn new(event_type: EventType, event_id: Uuid) -> Self {
        Self {
            event_type,
            event_id,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_type, self.event_id)
    }
}

/// Whether an event reports a plan, an actual, a request or an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventClassifierCode {
    /// Planned
    Pln,
    /// Actual
    Act,
    /// Requested
    Req,
    /// Estimated
    Est,
}

// ============================================================================
// Transport calls
// ============================================================================

/// Vessel performing a transport call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    #[serde(
        rename = "vesselIMONumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vessel_imo_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_name: Option<String>,
}

/// A vessel's call at a location, referenced by transport-related events
///
/// Arrives either already identified (`transport_call_id` set) or as a new
/// description for which the store assigns an ID on creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCall {
    #[serde(
        rename = "transportCallID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transport_call_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_service_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_voyage_number: Option<String>,

    #[serde(
        rename = "UNLocationCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub un_location_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_of_transport: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel: Option<Vessel>,
}

impl TransportCall {
    /// Copy of this description carrying the given canonical ID
    pub fn with_id(&self, transport_call_id: Uuid) -> Self {
        Self {
            transport_call_id: Some(transport_call_id),
            ..self.clone()
        }
    }
}

// ============================================================================
// Event variants
// ============================================================================

/// Fields common to every event variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    #[serde(rename = "eventID")]
    pub event_id: Uuid,

    pub event_created_date_time: DateTime<Utc>,

    pub event_date_time: DateTime<Utc>,

    pub event_classifier_code: EventClassifierCode,

    /// Freshly parsed and not yet persisted; never part of the wire format
    #[serde(skip)]
    pub new_record: bool,
}

/// Vessel arrival or departure at a transport call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportEvent {
    #[serde(flatten)]
    pub header: EventHeader,

    pub transport_event_type_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_reason_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_remark: Option<String>,

    pub transport_call: TransportCall,
}

/// Container movement (load, discharge, gate in/out) at a transport call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentEvent {
    #[serde(flatten)]
    pub header: EventHeader,

    pub equipment_event_type_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_indicator_code: Option<String>,

    pub transport_call: TransportCall,
}

/// Port call operation timestamp (start/complete of a service)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsEvent {
    #[serde(flatten)]
    pub header: EventHeader,

    pub operations_event_type_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_call_service_type_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,

    pub transport_call: TransportCall,
}

/// Document status change; references no transport call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentEvent {
    #[serde(flatten)]
    pub header: EventHeader,

    pub shipment_event_type_code: String,

    #[serde(rename = "documentID")]
    pub document_id: String,

    pub document_type_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Resolve/bind access to the transport call an event references
pub trait TransportCallBased: Send + Sync {
    /// The referenced transport call as currently known
    fn transport_call(&self) -> &TransportCall;

    /// Replace the reference with the canonical, ID-bearing copy
    fn bind_transport_call(&mut self, transport_call: TransportCall);

    /// Canonical ID, once resolved
    fn transport_call_id(&self) -> Option<Uuid> {
        self.transport_call().transport_call_id
    }
}

macro_rules! transport_call_based {
    ($($variant:ty),+) => {
        $(
            impl TransportCallBased for $variant {
                fn transport_call(&self) -> &TransportCall {
                    &self.transport_call
                }

                fn bind_transport_call(&mut self, transport_call: TransportCall) {
                    self.transport_call = transport_call;
                }
            }
        )+
    };
}

transport_call_based!(TransportEvent, EquipmentEvent, OperationsEvent);

/// An event of any supported kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Transport(TransportEvent),
    Equipment(EquipmentEvent),
    Operations(OperationsEvent),
    Shipment(ShipmentEvent),
}

impl Event {
    /// Parse a notification payload (a JSON array of events)
    pub fn parse_batch(payload: &[u8]) -> Result<Vec<Event>, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn header(&self) -> &EventHeader {
        match self {
            Self::Transport(e) => &e.header,
            Self::Equipment(e) => &e.header,
            Self::Operations(e) => &e.header,
            Self::Shipment(e) => &e.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut EventHeader {
        match self {
            Self::Transport(e) => &mut e.header,
            Self::Equipment(e) => &mut e.header,
            Self::Operations(e) => &mut e.header,
            Self::Shipment(e) => &mut e.header,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Transport(_) => EventType::Transport,
            Self::Equipment(_) => EventType::Equipment,
            Self::Operations(_) => EventType::Operations,
            Self::Shipment(_) => EventType::Shipment,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.header().event_id
    }

    /// Dedup identity of this event
    pub fn key(&self) -> EventKey {
        EventKey::new(self.event_type(), self.event_id())
    }

    /// Flag the event as freshly parsed and not yet persisted
    pub fn mark_new(&mut self) {
        self.header_mut().new_record = true;
    }

    pub fn is_new_record(&self) -> bool {
        self.header().new_record
    }

    /// Transport call access, `None` for variants without one
    pub fn as_transport_call_based(&self) -> Option<&dyn TransportCallBased> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Equipment(e) => Some(e),
            Self::Operations(e) => Some(e),
            Self::Shipment(_) => None,
        }
    }

    /// Mutable transport call access, `None` for variants without one
    pub fn as_transport_call_based_mut(&mut self) -> Option<&mut dyn TransportCallBased> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Equipment(e) => Some(e),
            Self::Operations(e) => Some(e),
            Self::Shipment(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

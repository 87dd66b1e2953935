//! # Notification Requests
//!
//! Transport-neutral view of an inbound delivery: the verb, the headers and
//! the raw body bytes exactly as received. Signatures are computed over
//! these bytes, so the body is never re-encoded before verification.

use crate::Timestamp;
use bytes::Bytes;
use std::collections::HashMap;

/// HTTP verb of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiveMethod {
    /// Liveness probe; carries no payload
    Head,
    /// Payload delivery
    Post,
}

impl ReceiveMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for ReceiveMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound notification request
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub method: ReceiveMethod,
    /// Header values keyed by lowercase header name
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub received_at: Timestamp,
}

impl NotificationRequest {
    /// Create a request, normalizing header names to lowercase
    pub fn new(method: ReceiveMethod, headers: HashMap<String, String>, body: Bytes) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();

        Self {
            method,
            headers,
            body,
            received_at: Timestamp::now(),
        }
    }

    /// Liveness probe with no headers
    pub fn probe() -> Self {
        Self::new(ReceiveMethod::Head, HashMap::new(), Bytes::new())
    }

    /// Add or replace a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

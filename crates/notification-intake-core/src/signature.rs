//! # Message Signatures
//!
//! Authentication of inbound notifications.
//!
//! A sender signs the raw request body with the endpoint's shared secret and
//! attaches two headers:
//!
//! - `Notification-Signature: sha256=<hex digest>`
//! - `Subscription-ID: <subscription id>`
//!
//! Verification recomputes the digest over the exact body bytes, compares
//! both the digest and the subscription binding in constant time and only
//! then hands the body to a converter. Every failure collapses into
//! [`VerificationOutcome::Invalid`]; the attached [`VerificationFailure`]
//! is a diagnostic for server-side logs and is never returned to the caller.
//!
//! The digest covers the body only, not the `Subscription-ID` header. The
//! subscription check therefore binds a delivery to an endpoint only while
//! every endpoint holds its own secret: endpoints sharing a secret accept
//! each other's signed bodies once the header is rewritten.

use crate::endpoint::{SigningSecret, SubscriptionId};
use crate::request::NotificationRequest;
use crate::ValidationError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `<method>=<hex digest>`
pub const NOTIFICATION_SIGNATURE_HEADER: &str = "notification-signature";

/// Header carrying the subscription the delivery belongs to
pub const SUBSCRIPTION_ID_HEADER: &str = "subscription-id";

// ============================================================================
// Signature methods
// ============================================================================

/// Supported signature methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureMethod {
    HmacSha256,
}

/// Key requirements of a signature method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMethodPolicy {
    pub method: SignatureMethod,
    /// Prefix used in the signature header (`sha256=`)
    pub identifier: &'static str,
    /// Minimum key length in bytes
    pub min_key_length: usize,
    /// Maximum key length in bytes
    pub max_key_length: usize,
}

static SIGNATURE_METHOD_POLICIES: [SignatureMethodPolicy; 1] = [SignatureMethodPolicy {
    method: SignatureMethod::HmacSha256,
    identifier: "sha256",
    min_key_length: 32,
    max_key_length: 64,
}];

impl SignatureMethod {
    /// Method used for every endpoint
    pub const DEFAULT: SignatureMethod = SignatureMethod::HmacSha256;

    /// Look up the method named by a signature header prefix
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        SIGNATURE_METHOD_POLICIES
            .iter()
            .find(|policy| policy.identifier.eq_ignore_ascii_case(identifier))
            .map(|policy| policy.method)
    }

    /// Key policy for this method
    pub fn policy(&self) -> &'static SignatureMethodPolicy {
        match self {
            Self::HmacSha256 => &SIGNATURE_METHOD_POLICIES[0],
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.policy().identifier
    }
}

impl SignatureMethodPolicy {
    /// Check a secret against this method's key length bounds.
    ///
    /// A missing secret is reported as [`ValidationError::Required`].
    pub fn validate_key(&self, secret: Option<&SigningSecret>) -> Result<(), ValidationError> {
        let secret = secret.ok_or_else(|| ValidationError::Required {
            field: "secret".to_string(),
        })?;

        if secret.len() < self.min_key_length {
            return Err(ValidationError::TooShort {
                field: "secret".to_string(),
                min_length: self.min_key_length,
                actual_length: secret.len(),
            });
        }

        if secret.len() > self.max_key_length {
            return Err(ValidationError::TooLong {
                field: "secret".to_string(),
                max_length: self.max_key_length,
                actual_length: secret.len(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Verification outcome
// ============================================================================

/// Why a request failed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    MissingSignature,
    MalformedSignature,
    UnsupportedSignatureMethod(String),
    MissingSubscriptionId,
    SubscriptionMismatch,
    SignatureMismatch,
    ConversionFailed(String),
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSignature => write!(f, "missing Notification-Signature header"),
            Self::MalformedSignature => {
                write!(f, "Notification-Signature header is not <method>=<hex digest>")
            }
            Self::UnsupportedSignatureMethod(method) => {
                write!(f, "unsupported signature method '{}'", method)
            }
            Self::MissingSubscriptionId => write!(f, "missing Subscription-ID header"),
            Self::SubscriptionMismatch => {
                write!(f, "Subscription-ID does not match the endpoint subscription")
            }
            Self::SignatureMismatch => write!(f, "signature digest mismatch"),
            Self::ConversionFailed(message) => {
                write!(f, "payload could not be converted: {}", message)
            }
        }
    }
}

/// Result of verifying and converting a request
#[derive(Debug, Clone)]
pub enum VerificationOutcome<T> {
    Valid(T),
    Invalid(VerificationFailure),
}

impl<T> VerificationOutcome<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Diagnostic description, for server-side logging only
    pub fn result(&self) -> String {
        match self {
            Self::Valid(_) => "valid signature".to_string(),
            Self::Invalid(failure) => failure.to_string(),
        }
    }

    pub fn failure(&self) -> Option<&VerificationFailure> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(failure) => Some(failure),
        }
    }
}

/// Body conversion failure raised by a converter
#[derive(Debug, Clone, thiserror::Error)]
#[error("Payload conversion failed: {message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

// ============================================================================
// MessageSignatureHandler
// ============================================================================

/// Verifies signed notification requests and signs outbound payloads
#[derive(Debug, Clone, Default)]
pub struct MessageSignatureHandler;

impl MessageSignatureHandler {
    pub fn new() -> Self {
        Self
    }

    /// Verify a request against an endpoint's binding, then convert its body.
    ///
    /// The converter only runs once both the subscription binding and the
    /// digest have been verified.
    pub fn verify_request<T, F>(
        &self,
        request: &NotificationRequest,
        subscription_id: &SubscriptionId,
        secret: &SigningSecret,
        converter: F,
    ) -> VerificationOutcome<T>
    where
        F: FnOnce(&[u8]) -> Result<T, ConversionError>,
    {
        let header = match request.header(NOTIFICATION_SIGNATURE_HEADER) {
            Some(value) => value.trim(),
            None => return VerificationOutcome::Invalid(VerificationFailure::MissingSignature),
        };

        let (method, digest) = match parse_signature_header(header) {
            Ok(parsed) => parsed,
            Err(failure) => return VerificationOutcome::Invalid(failure),
        };

        let supplied_subscription = match request.header(SUBSCRIPTION_ID_HEADER) {
            Some(value) => value.trim(),
            None => {
                return VerificationOutcome::Invalid(VerificationFailure::MissingSubscriptionId)
            }
        };

        let subscription_matches: bool = supplied_subscription
            .as_bytes()
            .ct_eq(subscription_id.as_str().as_bytes())
            .into();
        if !subscription_matches {
            return VerificationOutcome::Invalid(VerificationFailure::SubscriptionMismatch);
        }

        if !verify_digest(method, secret, &request.body, &digest) {
            return VerificationOutcome::Invalid(VerificationFailure::SignatureMismatch);
        }

        debug!(
            method = method.identifier(),
            body_size = request.body.len(),
            "Notification signature verified"
        );

        match converter(&request.body) {
            Ok(parsed) => VerificationOutcome::Valid(parsed),
            Err(e) => VerificationOutcome::Invalid(VerificationFailure::ConversionFailed(e.message)),
        }
    }

    /// Compute the raw digest of a payload
    pub fn sign_payload(
        &self,
        method: SignatureMethod,
        secret: &SigningSecret,
        payload: &[u8],
    ) -> Vec<u8> {
        match method {
            SignatureMethod::HmacSha256 => {
                // HMAC accepts keys of any length
                let mut mac = match HmacSha256::new_from_slice(secret.expose_bytes()) {
                    Ok(mac) => mac,
                    Err(_) => return Vec::new(),
                };
                mac.update(payload);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Build the `Notification-Signature` header value for a digest
    pub fn signature_header_value(&self, method: SignatureMethod, digest: &[u8]) -> String {
        format!("{}={}", method.identifier(), hex::encode(digest))
    }

    /// Sign a payload and format the header value in one step
    pub fn sign_header(
        &self,
        method: SignatureMethod,
        secret: &SigningSecret,
        payload: &[u8],
    ) -> String {
        let digest = self.sign_payload(method, secret, payload);
        self.signature_header_value(method, &digest)
    }
}

fn parse_signature_header(header: &str) -> Result<(SignatureMethod, Vec<u8>), VerificationFailure> {
    let (identifier, hex_digest) = header
        .split_once('=')
        .ok_or(VerificationFailure::MalformedSignature)?;

    let method = SignatureMethod::from_identifier(identifier.trim()).ok_or_else(|| {
        VerificationFailure::UnsupportedSignatureMethod(identifier.trim().to_string())
    })?;

    let digest =
        hex::decode(hex_digest.trim()).map_err(|_| VerificationFailure::MalformedSignature)?;

    Ok((method, digest))
}

fn verify_digest(
    method: SignatureMethod,
    secret: &SigningSecret,
    payload: &[u8],
    digest: &[u8],
) -> bool {
    match method {
        SignatureMethod::HmacSha256 => {
            let mut mac = match HmacSha256::new_from_slice(secret.expose_bytes()) {
                Ok(mac) => mac,
                Err(_) => return false,
            };
            mac.update(payload);
            mac.verify_slice(digest).is_ok()
        }
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;

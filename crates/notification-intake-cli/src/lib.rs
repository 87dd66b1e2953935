//! # Notification Intake CLI
//!
//! Operator tooling for notification endpoints.
//!
//! This module provides CLI commands for:
//! - Computing the `Notification-Signature` header for a payload
//! - Generating signing secrets within the signature method's key bounds
//! - Probing an endpoint with `HEAD`
//! - Signing and delivering a payload file to an endpoint

use anyhow::Context;
use clap::{Parser, Subcommand};
use notification_intake_core::{
    signature::{NOTIFICATION_SIGNATURE_HEADER, SUBSCRIPTION_ID_HEADER},
    MessageSignatureHandler, SignatureMethod, SigningSecret,
};
use rand::RngCore;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

// ============================================================================
// CLI Structure
// ============================================================================

/// Notification intake CLI - sign, probe and deliver event notifications
#[derive(Parser)]
#[command(name = "notification-intake")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tools for signed event notification endpoints")]
pub struct Cli {
    /// Logging level
    #[arg(short, long, default_value = "warn", env = "NI_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the Notification-Signature header value for a payload file
    Sign {
        /// Payload file, signed byte for byte
        #[arg(short, long)]
        payload: PathBuf,

        /// Signing secret, standard base64
        #[arg(short, long, env = "NI_SECRET", hide_env_values = true)]
        secret: String,

        /// Signature method identifier
        #[arg(short, long, default_value = "sha256")]
        method: String,
    },

    /// Generate a random signing secret, printed as base64
    GenerateSecret {
        /// Secret length in bytes; defaults to the method's maximum
        #[arg(short, long)]
        length: Option<usize>,

        /// Signature method identifier
        #[arg(short, long, default_value = "sha256")]
        method: String,
    },

    /// Send a HEAD liveness probe to an endpoint URL
    Probe {
        /// Full receive URL of the endpoint
        url: Url,
    },

    /// Sign a payload file and POST it to an endpoint URL
    Deliver {
        /// Full receive URL of the endpoint
        url: Url,

        /// Payload file (a JSON array of events)
        #[arg(short, long)]
        payload: PathBuf,

        /// Signing secret, standard base64
        #[arg(short, long, env = "NI_SECRET", hide_env_values = true)]
        secret: String,

        /// Subscription the delivery belongs to
        #[arg(long = "subscription-id")]
        subscription_id: String,

        /// Signature method identifier
        #[arg(short, long, default_value = "sha256")]
        method: String,
    },
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    #[error("Endpoint answered {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::RequestFailed { .. } => 3,
            Self::UnexpectedStatus { .. } => 4,
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse the command line and run the selected command
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;
    execute(cli.command).await
}

/// Run one parsed command, printing its result to stdout
pub async fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Sign {
            payload,
            secret,
            method,
        } => {
            let method = parse_method(&method)?;
            let secret = parse_secret(method, &secret)?;
            let body = read_payload(&payload)?;
            println!("{}", sign_header(method, &secret, &body));
        }
        Commands::GenerateSecret { length, method } => {
            let method = parse_method(&method)?;
            println!("{}", generate_secret(method, length)?.to_base64());
        }
        Commands::Probe { url } => {
            let status = probe(&http_client()?, &url).await?;
            println!("{}", status);
        }
        Commands::Deliver {
            url,
            payload,
            secret,
            subscription_id,
            method,
        } => {
            let method = parse_method(&method)?;
            let secret = parse_secret(method, &secret)?;
            let body = read_payload(&payload)?;
            let status = deliver(
                &http_client()?,
                &url,
                body,
                method,
                &secret,
                &subscription_id,
            )
            .await?;
            println!("{}", status);
        }
    }

    Ok(())
}

/// Logs go to stderr so command output stays pipeable
fn initialize_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level '{}'", cli.log_level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("notification-intake/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

fn read_payload(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read payload {}", path.display()))
}

// ============================================================================
// Commands
// ============================================================================

/// Resolve a signature method identifier such as `sha256`
pub fn parse_method(identifier: &str) -> Result<SignatureMethod, CliError> {
    SignatureMethod::from_identifier(identifier).ok_or_else(|| CliError::InvalidArgument {
        arg: "method".to_string(),
        message: format!("unsupported signature method '{}'", identifier),
    })
}

/// Decode a base64 secret and check it against the method's key bounds
pub fn parse_secret(method: SignatureMethod, encoded: &str) -> Result<SigningSecret, CliError> {
    let invalid = |message: String| CliError::InvalidArgument {
        arg: "secret".to_string(),
        message,
    };

    let secret = SigningSecret::from_base64(encoded.trim()).map_err(|e| invalid(e.to_string()))?;
    method
        .policy()
        .validate_key(Some(&secret))
        .map_err(|e| invalid(e.to_string()))?;

    Ok(secret)
}

/// Header value a sender attaches for this payload
pub fn sign_header(method: SignatureMethod, secret: &SigningSecret, payload: &[u8]) -> String {
    MessageSignatureHandler::new().sign_header(method, secret, payload)
}

/// Random secret of `length` bytes, or the method's maximum key length
pub fn generate_secret(
    method: SignatureMethod,
    length: Option<usize>,
) -> Result<SigningSecret, CliError> {
    let policy = method.policy();
    let length = length.unwrap_or(policy.max_key_length);

    if length < policy.min_key_length || length > policy.max_key_length {
        return Err(CliError::InvalidArgument {
            arg: "length".to_string(),
            message: format!(
                "must be between {} and {} bytes",
                policy.min_key_length, policy.max_key_length
            ),
        });
    }

    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    Ok(SigningSecret::from_bytes(bytes))
}

/// HEAD the endpoint; any 2xx answer counts as alive
pub async fn probe(client: &reqwest::Client, url: &Url) -> Result<u16, CliError> {
    info!(url = %url, "Probing endpoint");

    let response = client
        .head(url.clone())
        .send()
        .await
        .map_err(|e| CliError::RequestFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    check_status(response).await
}

/// Sign and POST a payload, returning the status of a 2xx answer
pub async fn deliver(
    client: &reqwest::Client,
    url: &Url,
    payload: Vec<u8>,
    method: SignatureMethod,
    secret: &SigningSecret,
    subscription_id: &str,
) -> Result<u16, CliError> {
    let signature = sign_header(method, secret, &payload);
    debug!(url = %url, body_size = payload.len(), "Delivering signed payload");

    let response = client
        .post(url.clone())
        .header("content-type", "application/json")
        .header(NOTIFICATION_SIGNATURE_HEADER, signature)
        .header(SUBSCRIPTION_ID_HEADER, subscription_id)
        .body(payload)
        .send()
        .await
        .map_err(|e| CliError::RequestFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    check_status(response).await
}

async fn check_status(response: reqwest::Response) -> Result<u16, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(status.as_u16());
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let mut body = response.text().await.unwrap_or_default();
    if let Some(seconds) = retry_after {
        body = format!("{} (retry after {}s)", body, seconds);
    }

    Err(CliError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

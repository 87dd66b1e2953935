//! Tests for [`ServiceConfig`] and its sections.

use super::*;

fn seed(secret_len: usize) -> SeedEndpointConfig {
    use base64::{engine::general_purpose::STANDARD, Engine};

    SeedEndpointConfig {
        id: "0b6cbd5e-3c3b-4a3c-9d0a-7b9c1f0b2e11".to_string(),
        subscription_id: Some("sub-1".to_string()),
        secret: STANDARD.encode(vec![7u8; secret_len]),
    }
}

#[test]
fn test_default_config_is_valid() {
    let config = ServiceConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.receiver.base_path, "/notification-endpoints");
    assert_eq!(config.receiver.retry_after_seconds, 60);
    assert!(!config.notifications.enabled);
}

#[test]
fn test_partial_document_falls_back_to_defaults() {
    let config: ServiceConfig =
        serde_json::from_str(r#"{ "server": { "port": 9090 } }"#).unwrap();

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.logging.level, "info");
    assert!(config.endpoints.is_empty());
}

#[test]
fn test_route_paths_follow_base_path() {
    let receiver = ReceiverConfig {
        base_path: "/unofficial/notification-endpoints".to_string(),
        retry_after_seconds: 5,
    };

    assert_eq!(
        receiver.receive_route(),
        "/unofficial/notification-endpoints/receive/{endpoint_id}"
    );
    assert_eq!(
        receiver.endpoint_route(),
        "/unofficial/notification-endpoints/{endpoint_id}"
    );
}

#[test]
fn test_invalid_base_path_is_rejected() {
    for base_path in ["", "/", "no-slash", "/trailing/"] {
        let mut config = ServiceConfig::default();
        config.receiver.base_path = base_path.to_string();

        assert!(
            matches!(config.validate(), Err(ConfigError::Invalid { .. })),
            "base path '{base_path}' should be rejected"
        );
    }
}

#[test]
fn test_invalid_server_values_are_rejected() {
    let mut config = ServiceConfig::default();
    config.server.port = 0;
    assert!(config.validate().is_err());

    let mut config = ServiceConfig::default();
    config.server.timeout_seconds = 0;
    assert!(config.validate().is_err());

    let mut config = ServiceConfig::default();
    config.logging.level = "verbose".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_enabled_notifications_require_recipients() {
    let mut config = ServiceConfig::default();
    config.notifications.enabled = true;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing { ref key }) if key == "notifications.recipients"
    ));

    config.notifications.recipients = vec!["ops@example.com".to_string()];
    config.notifications.event_types = vec!["TRANSPORT".to_string(), "bogus".to_string()];
    assert!(config.validate().is_err());

    config.notifications.event_types = vec!["transport".to_string()];
    assert!(config.validate().is_ok());
    assert_eq!(
        config.notifications.parsed_event_types().unwrap(),
        vec![EventType::Transport]
    );
}

#[test]
fn test_seed_endpoint_conversion() {
    let (endpoint_id, registration) = seed(32).to_registration().unwrap();

    assert_eq!(
        endpoint_id.to_string(),
        "0b6cbd5e-3c3b-4a3c-9d0a-7b9c1f0b2e11"
    );
    assert_eq!(registration.secret.map(|s| s.len()), Some(32));
    assert_eq!(
        registration.subscription_id.map(String::from),
        Some("sub-1".to_string())
    );
}

#[test]
fn test_seed_endpoint_with_short_secret_is_rejected() {
    let mut config = ServiceConfig::default();
    config.endpoints.push(seed(16));

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("endpoints[0]"));
    assert!(err.to_string().contains("minimum 32 bytes"));
}

#[test]
fn test_seed_endpoint_with_invalid_id_is_rejected() {
    let mut endpoint = seed(32);
    endpoint.id = "not-a-uuid".to_string();

    assert!(endpoint.to_registration().is_err());
}

#[test]
fn test_seed_endpoint_debug_redacts_secret() {
    let endpoint = seed(32);
    let debug_str = format!("{:?}", endpoint);

    assert!(!debug_str.contains(&endpoint.secret));
    assert!(debug_str.contains("REDACTED"));
}

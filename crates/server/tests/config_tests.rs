use config::Config;
use ms_login_broker::config::{AppConfig, load_config};
use std::env;
use std::fs;
use std::time::Duration;

#[test]
fn test_app_config_deserialization() {
    let yaml_content = r#"
client_id: "00000000-0000-0000-0000-000000000001"
client_secret: "secret123"
tenant_id: "contoso.onmicrosoft.com"
redirect_url: "https://broker.example.com/callback/microsoft"
jwt_secret: "jwt_secret_123"
bind_address: "127.0.0.1:9000"
shutdown_grace_secs: 30
allowed_redirect_hosts:
  - "app.example.com"
"#;

    let config = Config::builder()
        .add_source(config::File::from_str(
            yaml_content,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    let app_config: AppConfig = config
        .try_deserialize()
        .expect("Failed to deserialize app config");
    assert_eq!(app_config.client_id, "00000000-0000-0000-0000-000000000001");
    assert_eq!(app_config.client_secret, "secret123");
    assert_eq!(app_config.tenant_id, "contoso.onmicrosoft.com");
    assert_eq!(
        app_config.redirect_url,
        "https://broker.example.com/callback/microsoft"
    );
    assert_eq!(app_config.jwt_secret, "jwt_secret_123");
    assert_eq!(app_config.bind_address, "127.0.0.1:9000");
    assert_eq!(app_config.shutdown_grace(), Duration::from_secs(30));
    assert_eq!(app_config.http_timeout(), Duration::from_secs(10));
    assert_eq!(app_config.allowed_redirect_hosts, vec!["app.example.com"]);
    assert!(app_config.missing_credentials().is_empty());
}

#[test]
fn test_config_with_environment_variables() {
    let temp_dir = env::temp_dir();
    let config_path = temp_dir.join("ms_login_broker_test_config.yaml");
    let config_content = r#"
client_id: "file-client"
tenant_id: "file-tenant"
jwt_secret: "file_secret"
"#;
    fs::write(&config_path, config_content).expect("Failed to write temp config");

    // Environment variables should override file values
    unsafe {
        env::set_var("BROKERTEST__CLIENT_ID", "env-client");
        env::set_var("BROKERTEST__ALLOWED_REDIRECT_HOSTS", "a.example.com,B.example.com");
    }

    let config = Config::builder()
        .add_source(config::File::from(config_path.clone()))
        .add_source(
            config::Environment::with_prefix("BROKERTEST").prefix_separator("__"),
        )
        .build()
        .expect("Failed to build config");

    let app_config: AppConfig = config.try_deserialize().expect("Failed to deserialize");

    assert_eq!(app_config.client_id, "env-client");
    assert_eq!(
        app_config.allowed_redirect_hosts,
        vec!["a.example.com", "b.example.com"]
    );
    // Non-overridden values should come from file
    assert_eq!(app_config.tenant_id, "file-tenant");
    assert_eq!(app_config.jwt_secret, "file_secret");

    unsafe {
        env::remove_var("BROKERTEST__CLIENT_ID");
        env::remove_var("BROKERTEST__ALLOWED_REDIRECT_HOSTS");
    }
    let _ = fs::remove_file(config_path);
}

#[test]
fn test_load_config_reads_flat_environment_keys() {
    // Values that look numeric must stay strings.
    unsafe {
        env::set_var("JWT_SECRET", "1e5");
        env::set_var("TENANT_ID", "common");
        env::set_var("SHUTDOWN_GRACE_SECS", "7");
    }

    let app_config = load_config().expect("load_config without a config file");

    assert_eq!(app_config.jwt_secret, "1e5");
    assert_eq!(app_config.tenant_id, "common");
    assert_eq!(app_config.shutdown_grace(), Duration::from_secs(7));

    unsafe {
        env::remove_var("JWT_SECRET");
        env::remove_var("TENANT_ID");
        env::remove_var("SHUTDOWN_GRACE_SECS");
    }
}

#[test]
fn test_invalid_numeric_field_is_rejected() {
    let config = Config::builder()
        .add_source(config::File::from_str(
            "shutdown_grace_secs: \"soon\"",
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config");

    assert!(config.try_deserialize::<AppConfig>().is_err());
}

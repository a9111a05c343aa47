use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Runtime configuration.
///
/// The five provider credentials default to empty strings: a missing value
/// surfaces as a rejected exchange at the provider, not as a startup error.
/// Use [`AppConfig::missing_credentials`] to report them.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub tenant_id: String,
    /// Callback URL registered with the Azure AD application.
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Hosts a `source` URL may point at. Empty means any http(s) host.
    #[serde(default, deserialize_with = "host_list")]
    pub allowed_redirect_hosts: Vec<String>,
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    #[serde(default = "default_graph_me_url")]
    pub graph_me_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostList {
    List(Vec<String>),
    Csv(String),
}

fn host_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let hosts = match HostList::deserialize(deserializer)? {
        HostList::List(hosts) => hosts,
        HostList::Csv(raw) => raw.split(',').map(str::to_string).collect(),
    };
    Ok(hosts
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect())
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_graph_me_url() -> String {
    "https://graph.microsoft.com/v1.0/me".to_string()
}

impl AppConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Environment variable names of the provider credentials that are unset.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("CLIENT_ID", &self.client_id),
            ("CLIENT_SECRET", &self.client_secret),
            ("TENANT_ID", &self.tenant_id),
            ("REDIRECT_URL", &self.redirect_url),
            ("JWT_SECRET", &self.jwt_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bind_address must not be empty".into(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http_timeout_secs must be > 0".into(),
            ));
        }
        Ok(self)
    }
}

/// Load application configuration from an optional `config.yaml` plus the
/// process environment.
///
/// Environment variables win over the file and use the flat upper-case key
/// names (`CLIENT_ID`, `JWT_SECRET`, ...). `ALLOWED_REDIRECT_HOSTS` is a
/// comma separated list. A `.env` file in the working directory is loaded
/// into the environment first when present.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};

    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(ConfigError::Validation(format!("Failed to read .env: {e}"))),
    }

    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default())
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_yaml(yaml: &str) -> Result<AppConfig, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?;
        let app: AppConfig = cfg.try_deserialize()?;
        app.validate()
    }

    #[test]
    fn empty_source_yields_defaults() {
        let app = from_yaml("{}").unwrap();
        assert_eq!(app.bind_address, "0.0.0.0:8000");
        assert_eq!(app.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(app.authority_url, "https://login.microsoftonline.com");
        assert_eq!(app.graph_me_url, "https://graph.microsoft.com/v1.0/me");
        assert!(app.allowed_redirect_hosts.is_empty());
        assert_eq!(
            app.missing_credentials(),
            vec![
                "CLIENT_ID",
                "CLIENT_SECRET",
                "TENANT_ID",
                "REDIRECT_URL",
                "JWT_SECRET"
            ]
        );
    }

    #[test]
    fn missing_credentials_ignores_present_values() {
        let app = from_yaml(
            r#"
client_id: "abc"
client_secret: "  "
tenant_id: "common"
"#,
        )
        .unwrap();
        assert_eq!(
            app.missing_credentials(),
            vec!["CLIENT_SECRET", "REDIRECT_URL", "JWT_SECRET"]
        );
    }

    #[test]
    fn redirect_hosts_accept_list_or_csv() {
        let app = from_yaml("allowed_redirect_hosts: [\"App.Example.com\", \"localhost\"]").unwrap();
        assert_eq!(app.allowed_redirect_hosts, vec!["app.example.com", "localhost"]);

        let app = from_yaml("allowed_redirect_hosts: \"a.example.com, b.example.com,\"").unwrap();
        assert_eq!(app.allowed_redirect_hosts, vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn zero_http_timeout_is_rejected() {
        let err = from_yaml("http_timeout_secs: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}

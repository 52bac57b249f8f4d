use std::{net::SocketAddr, sync::Arc, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

const ENV_PREFIX: &str = "CLAIMVIEW";

pub type ArcSettings = Arc<Settings>;

/// Build the name of an environment variable owned by this service
pub fn env_name(suffix: &str) -> String {
    format!("{ENV_PREFIX}_{suffix}")
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub general: GeneralSettings,
    pub oidc: OidcSettings,
    pub identity_api: IdentityApiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralSettings {
    #[serde(default)]
    pub listen_address: ListenAddress,
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OidcSettings {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    vec!["profile".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityApiSettings {
    pub base_url: Url,
    pub timeout_secs: Option<u64>,
}

impl IdentityApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Either a single address or a list of addresses to bind to
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ListenAddress {
    Single(SocketAddr),
    Multiple(Vec<SocketAddr>),
}

impl Default for ListenAddress {
    fn default() -> Self {
        Self::Single(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}

impl From<ListenAddress> for Vec<SocketAddr> {
    fn from(value: ListenAddress) -> Self {
        match value {
            ListenAddress::Single(addr) => vec![addr],
            ListenAddress::Multiple(addrs) => addrs,
        }
    }
}

impl Settings {
    pub fn try_load() -> Result<Self, config::ConfigError> {
        Self::load_from(Config::builder().add_source(File::with_name("config").required(false)))
    }

    fn load_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("oidc.scopes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn load_toml(toml: &str) -> Result<Settings, config::ConfigError> {
        Settings::load_from(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_env_name() {
        assert_eq!(env_name("LOG"), "CLAIMVIEW_LOG");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = load_toml(
            r#"
            [general]
            public_url = "http://localhost:8080"

            [oidc]
            issuer = "https://sso.example.com/realms/demo"
            client_id = "claimview"

            [identity_api]
            base_url = "https://api.example.com/"
            "#,
        )
        .unwrap();

        assert_eq!(settings.general.listen_address, ListenAddress::default());
        assert_eq!(settings.oidc.scopes, vec!["profile".to_string()]);
        assert!(settings.oidc.client_secret.is_none());
        assert_eq!(
            settings.identity_api.base_url.as_str(),
            "https://api.example.com/"
        );
        assert!(settings.identity_api.timeout().is_none());
    }

    #[test]
    fn test_settings_full() {
        let settings = load_toml(
            r#"
            [general]
            listen_address = ["127.0.0.1:3000", "[::1]:3000"]
            public_url = "https://claims.example.com"

            [oidc]
            issuer = "https://sso.example.com"
            client_id = "claimview"
            client_secret = "hunter2"
            scopes = ["profile", "api1"]

            [identity_api]
            base_url = "https://api.example.com/v1/"
            timeout_secs = 15
            "#,
        )
        .unwrap();

        let addrs: Vec<SocketAddr> = settings.general.listen_address.into();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0], "127.0.0.1:3000".parse().unwrap());
        assert_eq!(settings.oidc.client_secret.as_deref(), Some("hunter2"));
        assert_eq!(settings.oidc.scopes, vec!["profile", "api1"]);
        assert_eq!(
            settings.identity_api.timeout(),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_settings_missing_identity_api() {
        let result = load_toml(
            r#"
            [general]
            public_url = "http://localhost:8080"

            [oidc]
            issuer = "https://sso.example.com"
            client_id = "claimview"
            "#,
        );

        assert!(result.is_err());
    }
}

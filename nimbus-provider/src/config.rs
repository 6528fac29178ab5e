//! Provider configuration
//!
//! Built from the `provider` block of the host configuration, then overridden
//! by `NIMBUS_*` environment variables.

use std::time::Duration;

use nimbus_client::{NimbusClient, NimbusClientBuilder, RetryPolicy};
use nimbus_core::resource::{Attributes, Value};
use secrecy::SecretString;
use thiserror::Error;

pub const ENV_API_URL: &str = "NIMBUS_API_URL";
pub const ENV_TOKEN: &str = "NIMBUS_TOKEN";
pub const ENV_PROJECT: &str = "NIMBUS_PROJECT";

pub const DEFAULT_API_URL: &str = nimbus_client::client::DEFAULT_API_URL;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("an API token is required: set 'token' in the provider block or NIMBUS_TOKEN")]
    MissingToken,

    #[error("invalid provider attribute '{name}': {message}")]
    InvalidAttribute { name: String, message: String },

    #[error("unknown provider attribute '{0}'")]
    UnknownAttribute(String),

    #[error("failed to build API client: {0}")]
    Client(#[from] nimbus_client::Error),
}

/// Connection settings for the Nimbus API
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub token: Option<SecretString>,
    pub project: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            project: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ProviderConfig {
    /// Read the `provider` block
    ///
    /// Recognised keys: `api_url`, `token`, `project`, `timeout_seconds`,
    /// `max_retries`.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let mut keys: Vec<&String> = attributes.keys().collect();
        keys.sort();
        for key in keys {
            let value = &attributes[key];
            match key.as_str() {
                "api_url" => config.api_url = string_attr(key, value)?,
                "token" => config.token = Some(SecretString::from(string_attr(key, value)?)),
                "project" => config.project = Some(string_attr(key, value)?),
                "timeout_seconds" => {
                    let seconds = positive_attr(key, value)?;
                    config.timeout = Duration::from_secs(seconds as u64);
                }
                "max_retries" => {
                    let retries = value.as_int().filter(|n| (0..=10).contains(n)).ok_or_else(|| {
                        ConfigError::InvalidAttribute {
                            name: key.clone(),
                            message: "expected an integer between 0 and 10".to_string(),
                        }
                    })?;
                    config.max_retries = retries as u32;
                }
                other => return Err(ConfigError::UnknownAttribute(other.to_string())),
            }
        }

        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `NIMBUS_*` overrides from an arbitrary lookup; empty values are ignored
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(SecretString::from(token));
        }
        if let Some(project) = get(ENV_PROJECT) {
            self.project = Some(project);
        }
        self
    }

    /// Build the API client
    pub fn build_client(&self) -> Result<NimbusClient, ConfigError> {
        let token = self.token.clone().ok_or(ConfigError::MissingToken)?;
        let retry = RetryPolicy::new().with_max_retries(self.max_retries);

        let mut builder = NimbusClientBuilder::new(&self.api_url)?
            .with_token(token)
            .with_timeout(self.timeout)
            .with_retry_policy(retry);
        if let Some(project) = &self.project {
            builder = builder.with_project(project);
        }
        Ok(builder.build()?)
    }
}

fn string_attr(name: &str, value: &Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::InvalidAttribute {
            name: name.to_string(),
            message: "expected a string".to_string(),
        })
}

fn positive_attr(name: &str, value: &Value) -> Result<i64, ConfigError> {
    value
        .as_int()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidAttribute {
            name: name.to_string(),
            message: "expected a positive integer".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn attrs(pairs: Vec<(&str, Value)>) -> Attributes {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn defaults() {
        let config = ProviderConfig::from_attributes(&Attributes::new()).unwrap();
        assert_eq!(config.api_url, "https://api.nimbus.cloud");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert!(config.token.is_none());
    }

    #[test]
    fn reads_provider_block() {
        let config = ProviderConfig::from_attributes(&attrs(vec![
            ("api_url", Value::string("http://localhost:9000")),
            ("project", Value::string("acme")),
            ("timeout_seconds", Value::Int(5)),
            ("max_retries", Value::Int(0)),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.project.as_deref(), Some("acme"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn rejects_unknown_and_mistyped() {
        assert!(matches!(
            ProviderConfig::from_attributes(&attrs(vec![("region", Value::string("eu"))])),
            Err(ConfigError::UnknownAttribute(_))
        ));
        assert!(matches!(
            ProviderConfig::from_attributes(&attrs(vec![("timeout_seconds", Value::Int(0))])),
            Err(ConfigError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn environment_overrides_file() {
        let env = HashMap::from([
            (ENV_TOKEN, "from-env"),
            (ENV_PROJECT, ""),
            (ENV_API_URL, "http://127.0.0.1:1"),
        ]);
        let config = ProviderConfig::from_attributes(&attrs(vec![
            ("token", Value::string("from-file")),
            ("project", Value::string("acme")),
        ]))
        .unwrap()
        .with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.token.unwrap().expose_secret(), "from-env");
        assert_eq!(config.project.as_deref(), Some("acme"));
        assert_eq!(config.api_url, "http://127.0.0.1:1");
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = ProviderConfig::default().build_client().unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
        assert!(err.to_string().contains("NIMBUS_TOKEN"));
    }

    #[test]
    fn debug_hides_token() {
        let config = ProviderConfig {
            token: Some(SecretString::from("tok-123".to_string())),
            ..ProviderConfig::default()
        };
        assert!(!format!("{:?}", config).contains("tok-123"));
    }
}

//! HTTP plumbing shared by every Nimbus endpoint.
//!
//! [`NimbusClient`] owns a pooled `reqwest::Client`, the bearer token and the
//! retry policy. Endpoint methods live in the entity modules and funnel
//! through [`NimbusClient::get_json`], [`NimbusClient::send_json`] and
//! [`NimbusClient::delete_path`].

use std::fmt;
use std::time::Duration;

use log::debug;
use reqwest::header::{ACCEPT, HeaderValue, USER_AGENT};
use reqwest::{Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

const CLIENT_USER_AGENT: &str = concat!("nimbus-client/", env!("CARGO_PKG_VERSION"));

/// Header selecting the project requests are scoped to.
pub const PROJECT_HEADER: &str = "X-Nimbus-Project";

/// Default Nimbus API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.nimbus.cloud";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Default maximum number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial retry delay in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default maximum retry delay in milliseconds (for exponential backoff)
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

/// Retry policy with exponential backoff.
///
/// Only transient failures are retried: `ServiceUnavailable` responses and
/// connection errors always, timeouts only for idempotent reads and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay before first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            backoff_multiplier: 2,
        }
    }

    /// Create a retry policy with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1,
        }
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Calculate delay for a given attempt number.
    ///
    /// delay = min(initial_delay * multiplier^(attempt - 1), max_delay)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let delay_ms =
            (self.initial_delay.as_millis() as u64).saturating_mul(u64::from(multiplier));
        std::cmp::min(Duration::from_millis(delay_ms), self.max_delay)
    }

    fn should_retry(&self, method: &Method, err: &Error, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        match err {
            Error::ServiceUnavailable(_) => true,
            // A timed-out POST or PATCH may already have been applied
            Error::Timeout(_) => matches!(*method, Method::GET | Method::DELETE),
            _ => false,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`NimbusClient`].
#[derive(Debug, Clone)]
pub struct NimbusClientBuilder {
    base_url: Url,
    token: Option<SecretString>,
    project: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl NimbusClientBuilder {
    /// Create a builder for the API rooted at `api_url` (without `/v1`).
    pub fn new(api_url: impl AsRef<str>) -> Result<Self> {
        let mut raw = api_url.as_ref().trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)?.join("v1/")?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidEndpoint(format!(
                "unsupported scheme '{}' in '{}'",
                base_url.scheme(),
                api_url.as_ref()
            )));
        }

        Ok(Self {
            base_url,
            token: None,
            project: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the API token sent as a bearer credential.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Scope requests to a project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<NimbusClient> {
        let token = self
            .token
            .ok_or_else(|| Error::Config("an API token is required".to_string()))?;
        if token.expose_secret().trim().is_empty() {
            return Err(Error::Config("the API token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(NimbusClient {
            http,
            base_url: self.base_url,
            token,
            project: self.project,
            retry: self.retry,
        })
    }
}

/// Asynchronous Nimbus API client.
#[derive(Clone)]
pub struct NimbusClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    project: Option<String>,
    retry: RetryPolicy,
}

impl fmt::Debug for NimbusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NimbusClient")
            .field("base_url", &self.base_url.as_str())
            .field("project", &self.project)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl NimbusClient {
    /// Return the versioned base URL (`{api_url}/v1/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the project requests are scoped to, if any.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub(crate) async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_json::<(), T>(Method::GET, path, None).await
    }

    pub(crate) async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.execute(method, path, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| Error::Decode(format!("invalid response for `{path}`: {err}")))
    }

    pub(crate) async fn delete_path(&self, path: &str) -> Result<()> {
        self.execute::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path)?;
        let mut attempt = 0;

        loop {
            debug!("{} {}", method, url);
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(self.token.expose_secret())
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
            if let Some(project) = &self.project {
                request = request.header(PROJECT_HEADER, project);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let err = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    Error::from_status(status, &text)
                }
                Err(err) => Error::from(err),
            };

            if !self.retry.should_retry(&method, &err, attempt) {
                debug!("{} {} failed: {}", method, url, err);
                return Err(err);
            }
            attempt += 1;
            let delay = self.retry.delay_for_attempt(attempt);
            debug!(
                "{} {} failed ({}), retry {}/{} in {:?}",
                method, url, err, attempt, self.retry.max_retries, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Envelope of every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub(crate) items: Vec<T>,
}

/// Check a value before it is interpolated into a request path.
pub(crate) fn segment(value: &str) -> Result<&str> {
    if value.is_empty() || value.contains('/') || value == "." || value == ".." {
        return Err(Error::BadRequest(format!(
            "invalid path segment '{value}'"
        )));
    }
    Ok(value)
}

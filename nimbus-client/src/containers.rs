//! Container and container job endpoints.
//!
//! Create and update share one spec type per entity. `None` fields are sent
//! as `null`: on create the API picks its default, on update the field is
//! cleared.

use std::collections::HashMap;
use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ListResponse, NimbusClient, segment};
use crate::error::Result;

/// CPU and memory reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResources {
    /// CPU in thousandths of a core
    pub cpu_millis: Option<i64>,
    /// Memory in MiB
    pub memory_mb: Option<i64>,
}

/// Metric that drives automatic scaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingTrigger {
    /// One of `cpu`, `memory`, `requests`, `concurrency`
    #[serde(rename = "type")]
    pub kind: String,
    /// Value above which instances are added
    pub threshold: i64,
}

/// Automatic scaling inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoInput {
    /// Minimum time between scaling decisions
    pub cooldown_seconds: Option<i64>,
    /// Metrics evaluated on every decision
    #[serde(default)]
    pub triggers: Vec<ScalingTrigger>,
}

/// Instance count bounds and autoscaling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scaling {
    /// Lower bound; `0` allows scale to zero
    pub min_instances: Option<i64>,
    /// Upper bound
    pub max_instances: Option<i64>,
    /// Automatic scaling inputs
    pub auto_input: Option<AutoInput>,
}

/// Volume attached to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Volume name in the container's namespace
    pub volume: String,
    /// Absolute mount point
    pub mount_path: String,
    /// Mount without write access
    #[serde(default)]
    pub read_only: bool,
}

/// Long-running container as returned by the API.
///
/// Secret environment variables are write-only and never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Listening port
    #[serde(default)]
    pub port: Option<i64>,
    /// Entrypoint override
    #[serde(default)]
    pub command: Vec<String>,
    /// Arguments passed to the entrypoint
    #[serde(default)]
    pub args: Vec<String>,
    /// Plain environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// `public` or `private`
    #[serde(default)]
    pub privacy: Option<String>,
    /// CPU and memory reservation
    #[serde(default)]
    pub resources: Option<ContainerResources>,
    /// Scaling configuration
    #[serde(default)]
    pub scaling: Option<Scaling>,
    /// Attached volumes
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    /// Public URL
    #[serde(default)]
    pub url: Option<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
    /// Creation timestamp (RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Mutable container settings, sent on create and update.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference
    pub image: String,
    /// Listening port
    pub port: Option<i64>,
    /// Entrypoint override
    pub command: Option<Vec<String>>,
    /// Arguments passed to the entrypoint
    pub args: Option<Vec<String>>,
    /// Plain environment variables
    pub env: Option<HashMap<String, String>>,
    /// Secret environment variables
    pub secret_env: Option<HashMap<String, String>>,
    /// `public` or `private`
    pub privacy: Option<String>,
    /// CPU and memory reservation
    pub resources: Option<ContainerResources>,
    /// Scaling configuration
    pub scaling: Option<Scaling>,
    /// Attached volumes
    pub volume_mounts: Option<Vec<VolumeMount>>,
}

impl fmt::Debug for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerSpec")
            .field("image", &self.image)
            .field("port", &self.port)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &self.env)
            .field("secret_env", &redacted_keys(self.secret_env.as_ref()))
            .field("privacy", &self.privacy)
            .field("resources", &self.resources)
            .field("scaling", &self.scaling)
            .field("volume_mounts", &self.volume_mounts)
            .finish()
    }
}

/// Body of `POST /namespaces/{ns}/containers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    /// Container name
    pub name: String,
    /// Container settings
    #[serde(flatten)]
    pub spec: ContainerSpec,
}

/// Run-to-completion container, optionally on a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerJob {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Job name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Entrypoint override
    #[serde(default)]
    pub command: Vec<String>,
    /// Arguments passed to the entrypoint
    #[serde(default)]
    pub args: Vec<String>,
    /// Plain environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// CPU and memory reservation
    #[serde(default)]
    pub resources: Option<ContainerResources>,
    /// Cron schedule
    #[serde(default)]
    pub schedule: Option<String>,
    /// Run time limit
    #[serde(default)]
    pub timeout_seconds: Option<i64>,
    /// Attempts after a failed run
    #[serde(default)]
    pub max_retries: Option<i64>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
    /// Start of the most recent run (RFC 3339)
    #[serde(default)]
    pub last_run_at: Option<String>,
}

/// Mutable job settings, sent on create and update.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerJobSpec {
    /// Image reference
    pub image: String,
    /// Entrypoint override
    pub command: Option<Vec<String>>,
    /// Arguments passed to the entrypoint
    pub args: Option<Vec<String>>,
    /// Plain environment variables
    pub env: Option<HashMap<String, String>>,
    /// Secret environment variables
    pub secret_env: Option<HashMap<String, String>>,
    /// CPU and memory reservation
    pub resources: Option<ContainerResources>,
    /// Cron schedule
    pub schedule: Option<String>,
    /// Run time limit
    pub timeout_seconds: Option<i64>,
    /// Attempts after a failed run
    pub max_retries: Option<i64>,
}

impl fmt::Debug for ContainerJobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerJobSpec")
            .field("image", &self.image)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &self.env)
            .field("secret_env", &redacted_keys(self.secret_env.as_ref()))
            .field("resources", &self.resources)
            .field("schedule", &self.schedule)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Body of `POST /namespaces/{ns}/jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContainerJobRequest {
    /// Job name
    pub name: String,
    /// Job settings
    #[serde(flatten)]
    pub spec: ContainerJobSpec,
}

fn redacted_keys(secrets: Option<&HashMap<String, String>>) -> Option<Vec<String>> {
    secrets.map(|m| {
        let mut keys: Vec<String> = m.keys().map(|k| format!("{k}=<redacted>")).collect();
        keys.sort();
        keys
    })
}

fn containers_path(namespace: &str) -> Result<String> {
    Ok(format!("namespaces/{}/containers", segment(namespace)?))
}

fn jobs_path(namespace: &str) -> Result<String> {
    Ok(format!("namespaces/{}/jobs", segment(namespace)?))
}

impl NimbusClient {
    /// List containers in a namespace.
    pub async fn list_containers(&self, namespace: &str) -> Result<Vec<Container>> {
        let response: ListResponse<Container> = self.get_json(&containers_path(namespace)?).await?;
        Ok(response.items)
    }

    /// Fetch a container.
    pub async fn get_container(&self, namespace: &str, name: &str) -> Result<Container> {
        let path = format!("{}/{}", containers_path(namespace)?, segment(name)?);
        self.get_json(&path).await
    }

    /// Create a container.
    pub async fn create_container(
        &self,
        namespace: &str,
        request: &CreateContainerRequest,
    ) -> Result<Container> {
        self.send_json(Method::POST, &containers_path(namespace)?, Some(request))
            .await
    }

    /// Replace the mutable settings of a container.
    pub async fn update_container(
        &self,
        namespace: &str,
        name: &str,
        spec: &ContainerSpec,
    ) -> Result<Container> {
        let path = format!("{}/{}", containers_path(namespace)?, segment(name)?);
        self.send_json(Method::PATCH, &path, Some(spec)).await
    }

    /// Delete a container.
    pub async fn delete_container(&self, namespace: &str, name: &str) -> Result<()> {
        let path = format!("{}/{}", containers_path(namespace)?, segment(name)?);
        self.delete_path(&path).await
    }

    /// List container jobs in a namespace.
    pub async fn list_container_jobs(&self, namespace: &str) -> Result<Vec<ContainerJob>> {
        let response: ListResponse<ContainerJob> = self.get_json(&jobs_path(namespace)?).await?;
        Ok(response.items)
    }

    /// Fetch a container job.
    pub async fn get_container_job(&self, namespace: &str, name: &str) -> Result<ContainerJob> {
        let path = format!("{}/{}", jobs_path(namespace)?, segment(name)?);
        self.get_json(&path).await
    }

    /// Create a container job.
    pub async fn create_container_job(
        &self,
        namespace: &str,
        request: &CreateContainerJobRequest,
    ) -> Result<ContainerJob> {
        self.send_json(Method::POST, &jobs_path(namespace)?, Some(request))
            .await
    }

    /// Replace the mutable settings of a container job.
    pub async fn update_container_job(
        &self,
        namespace: &str,
        name: &str,
        spec: &ContainerJobSpec,
    ) -> Result<ContainerJob> {
        let path = format!("{}/{}", jobs_path(namespace)?, segment(name)?);
        self.send_json(Method::PATCH, &path, Some(spec)).await
    }

    /// Delete a container job.
    pub async fn delete_container_job(&self, namespace: &str, name: &str) -> Result<()> {
        let path = format!("{}/{}", jobs_path(namespace)?, segment(name)?);
        self.delete_path(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_container_flattens_spec() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/namespaces/prod/containers"))
            .and(body_partial_json(json!({
                "name": "web",
                "image": "nginx:1.27",
                "port": 8080,
                "scaling": {
                    "min_instances": 1,
                    "max_instances": 4,
                    "auto_input": {
                        "cooldown_seconds": 60,
                        "triggers": [{"type": "cpu", "threshold": 75}]
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "namespace": "prod",
                "name": "web",
                "image": "nginx:1.27",
                "port": 8080,
                "privacy": "public",
                "scaling": {
                    "min_instances": 1,
                    "max_instances": 4,
                    "auto_input": {
                        "cooldown_seconds": 60,
                        "triggers": [{"type": "cpu", "threshold": 75}]
                    }
                },
                "url": "https://web-prod.nimbus.run",
                "status": "deploying"
            })))
            .mount(&server)
            .await;

        let request = CreateContainerRequest {
            name: "web".into(),
            spec: ContainerSpec {
                image: "nginx:1.27".into(),
                port: Some(8080),
                scaling: Some(Scaling {
                    min_instances: Some(1),
                    max_instances: Some(4),
                    auto_input: Some(AutoInput {
                        cooldown_seconds: Some(60),
                        triggers: vec![ScalingTrigger {
                            kind: "cpu".into(),
                            threshold: 75,
                        }],
                    }),
                }),
                ..ContainerSpec::default()
            },
        };
        let container = test_client(&server)
            .create_container("prod", &request)
            .await
            .unwrap();
        assert_eq!(container.url.as_deref(), Some("https://web-prod.nimbus.run"));
        let triggers = &container
            .scaling
            .and_then(|s| s.auto_input)
            .map(|a| a.triggers)
            .unwrap_or_default();
        assert_eq!(triggers[0].kind, "cpu");
    }

    #[test]
    fn spec_debug_hides_secret_values() {
        let spec = ContainerSpec {
            image: "app:1".into(),
            secret_env: Some(HashMap::from([(
                "DB_PASSWORD".to_string(),
                "hunter2".to_string(),
            )])),
            ..ContainerSpec::default()
        };
        let printed = format!("{:?}", spec);
        assert!(printed.contains("DB_PASSWORD=<redacted>"));
        assert!(!printed.contains("hunter2"));
    }

    #[tokio::test]
    async fn update_job_clears_schedule() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/namespaces/prod/jobs/backup"))
            .and(body_partial_json(json!({"image": "backup:2", "schedule": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "backup",
                "image": "backup:2",
                "max_retries": 2,
                "status": "idle"
            })))
            .mount(&server)
            .await;

        let spec = ContainerJobSpec {
            image: "backup:2".into(),
            max_retries: Some(2),
            ..ContainerJobSpec::default()
        };
        let job = test_client(&server)
            .update_container_job("prod", "backup", &spec)
            .await
            .unwrap();
        assert_eq!(job.schedule, None);
        assert_eq!(job.max_retries, Some(2));
    }
}

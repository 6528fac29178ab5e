//! Message queue endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ListResponse, NimbusClient, segment};
use crate::error::Result;

/// Managed message queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Queue name
    pub name: String,
    /// `standard` or `fifo`
    #[serde(default)]
    pub kind: Option<String>,
    /// How long unconsumed messages are kept
    #[serde(default)]
    pub message_retention_seconds: Option<i64>,
    /// How long a received message stays hidden from other consumers
    #[serde(default)]
    pub visibility_timeout_seconds: Option<i64>,
    /// Producer/consumer endpoint
    #[serde(default)]
    pub url: Option<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /namespaces/{ns}/queues`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQueueRequest {
    /// Queue name
    pub name: String,
    /// `standard` or `fifo`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Retention in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_retention_seconds: Option<i64>,
    /// Visibility timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_timeout_seconds: Option<i64>,
}

/// Body of `PATCH /namespaces/{ns}/queues/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQueueRequest {
    /// Retention in seconds
    pub message_retention_seconds: Option<i64>,
    /// Visibility timeout in seconds
    pub visibility_timeout_seconds: Option<i64>,
}

fn queues_path(namespace: &str) -> Result<String> {
    Ok(format!("namespaces/{}/queues", segment(namespace)?))
}

impl NimbusClient {
    /// List queues in a namespace.
    pub async fn list_queues(&self, namespace: &str) -> Result<Vec<Queue>> {
        let response: ListResponse<Queue> = self.get_json(&queues_path(namespace)?).await?;
        Ok(response.items)
    }

    /// Fetch a queue.
    pub async fn get_queue(&self, namespace: &str, name: &str) -> Result<Queue> {
        let path = format!("{}/{}", queues_path(namespace)?, segment(name)?);
        self.get_json(&path).await
    }

    /// Create a queue.
    pub async fn create_queue(
        &self,
        namespace: &str,
        request: &CreateQueueRequest,
    ) -> Result<Queue> {
        self.send_json(Method::POST, &queues_path(namespace)?, Some(request))
            .await
    }

    /// Update a queue.
    pub async fn update_queue(
        &self,
        namespace: &str,
        name: &str,
        request: &UpdateQueueRequest,
    ) -> Result<Queue> {
        let path = format!("{}/{}", queues_path(namespace)?, segment(name)?);
        self.send_json(Method::PATCH, &path, Some(request)).await
    }

    /// Delete a queue.
    pub async fn delete_queue(&self, namespace: &str, name: &str) -> Result<()> {
        let path = format!("{}/{}", queues_path(namespace)?, segment(name)?);
        self.delete_path(&path).await
    }
}

//! Namespace endpoints.

use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ListResponse, NimbusClient, segment};
use crate::error::Result;

/// A namespace groups every other Nimbus object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Namespace name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// User labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Lifecycle status (e.g. `active`)
    #[serde(default)]
    pub status: Option<String>,
    /// Creation timestamp (RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /namespaces`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNamespaceRequest {
    /// Namespace name
    pub name: String,
    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Body of `PATCH /namespaces/{name}`. `None` clears the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNamespaceRequest {
    /// Free-form description
    pub description: Option<String>,
    /// User labels
    pub labels: Option<HashMap<String, String>>,
}

impl NimbusClient {
    /// List namespaces.
    pub async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let response: ListResponse<Namespace> = self.get_json("namespaces").await?;
        Ok(response.items)
    }

    /// Fetch a namespace by name.
    pub async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        self.get_json(&format!("namespaces/{}", segment(name)?))
            .await
    }

    /// Create a namespace.
    pub async fn create_namespace(&self, request: &CreateNamespaceRequest) -> Result<Namespace> {
        self.send_json(Method::POST, "namespaces", Some(request))
            .await
    }

    /// Update a namespace.
    pub async fn update_namespace(
        &self,
        name: &str,
        request: &UpdateNamespaceRequest,
    ) -> Result<Namespace> {
        self.send_json(
            Method::PATCH,
            &format!("namespaces/{}", segment(name)?),
            Some(request),
        )
        .await
    }

    /// Delete a namespace.
    pub async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.delete_path(&format!("namespaces/{}", segment(name)?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::client::tests::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_namespace_skips_unset_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/namespaces"))
            .and(body_json(json!({"name": "prod"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "prod",
                "status": "active",
                "created_at": "2026-01-02T03:04:05Z"
            })))
            .mount(&server)
            .await;

        let request = CreateNamespaceRequest {
            name: "prod".into(),
            description: None,
            labels: None,
        };
        let namespace = test_client(&server).create_namespace(&request).await.unwrap();
        assert_eq!(namespace.status.as_deref(), Some("active"));
        assert!(namespace.labels.is_empty());
    }

    #[tokio::test]
    async fn update_namespace_sends_nulls() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/namespaces/prod"))
            .and(body_json(json!({"description": null, "labels": {"team": "core"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "prod",
                "labels": {"team": "core"}
            })))
            .mount(&server)
            .await;

        let request = UpdateNamespaceRequest {
            description: None,
            labels: Some(HashMap::from([("team".to_string(), "core".to_string())])),
        };
        let namespace = test_client(&server)
            .update_namespace("prod", &request)
            .await
            .unwrap();
        assert_eq!(namespace.labels["team"], "core");
    }

    #[tokio::test]
    async fn list_namespaces_reads_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "prod"}, {"name": "staging"}]
            })))
            .mount(&server)
            .await;

        let namespaces = test_client(&server).list_namespaces().await.unwrap();
        let names: Vec<&str> = namespaces.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["prod", "staging"]);
    }

    #[tokio::test]
    async fn delete_missing_namespace_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/namespaces/gone"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"message": "namespace 'gone' not found"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server).delete_namespace("gone").await.unwrap_err();
        assert_eq!(err, Error::NotFound("namespace 'gone' not found".to_string()));
    }
}

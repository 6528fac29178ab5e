//! Volume and container registry endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ListResponse, NimbusClient, segment};
use crate::error::Result;

/// Block storage volume mountable into containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Volume name
    pub name: String,
    /// Capacity in GiB
    pub size_gb: i64,
    /// Storage class (`standard` or `ssd`)
    #[serde(default)]
    pub storage_class: Option<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
    /// Creation timestamp (RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /namespaces/{ns}/volumes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    /// Volume name
    pub name: String,
    /// Capacity in GiB
    pub size_gb: i64,
    /// Storage class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Body of `PATCH /namespaces/{ns}/volumes/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVolumeRequest {
    /// New capacity in GiB; volumes only grow
    pub size_gb: i64,
}

/// Private container image registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Registry name
    pub name: String,
    /// Whether images can be pulled anonymously
    #[serde(default)]
    pub public: bool,
    /// Push/pull endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Total size of stored images
    #[serde(default)]
    pub size_bytes: Option<i64>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /namespaces/{ns}/registries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRegistryRequest {
    /// Registry name
    pub name: String,
    /// Whether images can be pulled anonymously
    pub public: bool,
}

/// Body of `PATCH /namespaces/{ns}/registries/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRegistryRequest {
    /// Whether images can be pulled anonymously
    pub public: bool,
}

fn volumes_path(namespace: &str) -> Result<String> {
    Ok(format!("namespaces/{}/volumes", segment(namespace)?))
}

fn registries_path(namespace: &str) -> Result<String> {
    Ok(format!("namespaces/{}/registries", segment(namespace)?))
}

impl NimbusClient {
    /// List volumes in a namespace.
    pub async fn list_volumes(&self, namespace: &str) -> Result<Vec<Volume>> {
        let response: ListResponse<Volume> = self.get_json(&volumes_path(namespace)?).await?;
        Ok(response.items)
    }

    /// Fetch a volume.
    pub async fn get_volume(&self, namespace: &str, name: &str) -> Result<Volume> {
        let path = format!("{}/{}", volumes_path(namespace)?, segment(name)?);
        self.get_json(&path).await
    }

    /// Create a volume.
    pub async fn create_volume(
        &self,
        namespace: &str,
        request: &CreateVolumeRequest,
    ) -> Result<Volume> {
        self.send_json(Method::POST, &volumes_path(namespace)?, Some(request))
            .await
    }

    /// Resize a volume.
    pub async fn update_volume(
        &self,
        namespace: &str,
        name: &str,
        request: &UpdateVolumeRequest,
    ) -> Result<Volume> {
        let path = format!("{}/{}", volumes_path(namespace)?, segment(name)?);
        self.send_json(Method::PATCH, &path, Some(request)).await
    }

    /// Delete a volume.
    pub async fn delete_volume(&self, namespace: &str, name: &str) -> Result<()> {
        let path = format!("{}/{}", volumes_path(namespace)?, segment(name)?);
        self.delete_path(&path).await
    }

    /// List registries in a namespace.
    pub async fn list_registries(&self, namespace: &str) -> Result<Vec<Registry>> {
        let response: ListResponse<Registry> = self.get_json(&registries_path(namespace)?).await?;
        Ok(response.items)
    }

    /// Fetch a registry.
    pub async fn get_registry(&self, namespace: &str, name: &str) -> Result<Registry> {
        let path = format!("{}/{}", registries_path(namespace)?, segment(name)?);
        self.get_json(&path).await
    }

    /// Create a registry.
    pub async fn create_registry(
        &self,
        namespace: &str,
        request: &CreateRegistryRequest,
    ) -> Result<Registry> {
        self.send_json(Method::POST, &registries_path(namespace)?, Some(request))
            .await
    }

    /// Update a registry.
    pub async fn update_registry(
        &self,
        namespace: &str,
        name: &str,
        request: &UpdateRegistryRequest,
    ) -> Result<Registry> {
        let path = format!("{}/{}", registries_path(namespace)?, segment(name)?);
        self.send_json(Method::PATCH, &path, Some(request)).await
    }

    /// Delete a registry.
    pub async fn delete_registry(&self, namespace: &str, name: &str) -> Result<()> {
        let path = format!("{}/{}", registries_path(namespace)?, segment(name)?);
        self.delete_path(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_volume() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/namespaces/prod/volumes"))
            .and(body_json(json!({"name": "data", "size_gb": 20, "storage_class": "ssd"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "namespace": "prod",
                "name": "data",
                "size_gb": 20,
                "storage_class": "ssd",
                "status": "provisioning"
            })))
            .mount(&server)
            .await;

        let request = CreateVolumeRequest {
            name: "data".into(),
            size_gb: 20,
            storage_class: Some("ssd".into()),
        };
        let volume = test_client(&server)
            .create_volume("prod", &request)
            .await
            .unwrap();
        assert_eq!(volume.size_gb, 20);
        assert_eq!(volume.status.as_deref(), Some("provisioning"));
    }

    #[tokio::test]
    async fn resize_volume() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/namespaces/prod/volumes/data"))
            .and(body_json(json!({"size_gb": 50})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "data",
                "size_gb": 50
            })))
            .mount(&server)
            .await;

        let volume = test_client(&server)
            .update_volume("prod", "data", &UpdateVolumeRequest { size_gb: 50 })
            .await
            .unwrap();
        assert_eq!(volume.size_gb, 50);
        assert_eq!(volume.namespace, "");
    }

    #[tokio::test]
    async fn get_registry_defaults_public_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/namespaces/prod/registries/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespace": "prod",
                "name": "images",
                "endpoint": "rg.nimbus.cloud/prod-images",
                "size_bytes": 1048576
            })))
            .mount(&server)
            .await;

        let registry = test_client(&server)
            .get_registry("prod", "images")
            .await
            .unwrap();
        assert!(!registry.public);
        assert_eq!(registry.size_bytes, Some(1_048_576));
    }

    #[tokio::test]
    async fn list_volumes_rejects_bad_namespace() {
        let server = MockServer::start().await;
        let err = test_client(&server).list_volumes("a/b").await.unwrap_err();
        assert!(matches!(err, crate::Error::BadRequest(_)));
    }
}

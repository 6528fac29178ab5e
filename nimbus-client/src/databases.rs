//! Managed database endpoints: clusters, logical databases and users.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ListResponse, NimbusClient, segment};
use crate::error::Result;

/// Managed database cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCluster {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Cluster name
    pub name: String,
    /// `postgresql` or `mysql`
    pub engine: String,
    /// Engine major version
    pub version: String,
    /// Number of nodes
    #[serde(default)]
    pub node_count: Option<i64>,
    /// Node size identifier (e.g. `db-small`)
    pub node_size: String,
    /// Disk per node in GiB
    pub storage_gb: i64,
    /// Connection host
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Connection port
    #[serde(default)]
    pub port: Option<i64>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /namespaces/{ns}/database-clusters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabaseClusterRequest {
    /// Cluster name
    pub name: String,
    /// `postgresql` or `mysql`
    pub engine: String,
    /// Engine major version
    pub version: String,
    /// Number of nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i64>,
    /// Node size identifier
    pub node_size: String,
    /// Disk per node in GiB
    pub storage_gb: i64,
}

/// Body of `PATCH /namespaces/{ns}/database-clusters/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDatabaseClusterRequest {
    /// Number of nodes
    pub node_count: Option<i64>,
    /// Node size identifier
    pub node_size: String,
    /// Disk per node in GiB; storage only grows
    pub storage_gb: i64,
}

/// Logical database inside a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Owning cluster
    #[serde(default)]
    pub cluster: String,
    /// Database name
    pub name: String,
    /// Owning database user
    #[serde(default)]
    pub owner: Option<String>,
    /// Character encoding
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Body of `POST .../database-clusters/{c}/databases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabaseRequest {
    /// Database name
    pub name: String,
    /// Owning database user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Character encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Body of `PATCH .../databases/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDatabaseRequest {
    /// Owning database user; `None` leaves the owner unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Login role inside a cluster.
///
/// The password is only present in the response to create (and to updates
/// that set it).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseUser {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,
    /// Owning cluster
    #[serde(default)]
    pub cluster: String,
    /// User name
    pub name: String,
    /// Password, when returned
    #[serde(default)]
    pub password: Option<String>,
    /// Whether the user has administrative rights
    #[serde(default)]
    pub admin: bool,
}

impl fmt::Debug for DatabaseUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseUser")
            .field("namespace", &self.namespace)
            .field("cluster", &self.cluster)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("admin", &self.admin)
            .finish()
    }
}

/// Body of `POST .../database-clusters/{c}/users`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabaseUserRequest {
    /// User name
    pub name: String,
    /// Password; generated by the API when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether the user has administrative rights
    pub admin: bool,
}

impl fmt::Debug for CreateDatabaseUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateDatabaseUserRequest")
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("admin", &self.admin)
            .finish()
    }
}

/// Body of `PATCH .../users/{name}`. An absent password is left unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDatabaseUserRequest {
    /// New password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether the user has administrative rights
    pub admin: bool,
}

impl fmt::Debug for UpdateDatabaseUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateDatabaseUserRequest")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("admin", &self.admin)
            .finish()
    }
}

fn clusters_path(namespace: &str) -> Result<String> {
    Ok(format!("namespaces/{}/database-clusters", segment(namespace)?))
}

fn cluster_path(namespace: &str, cluster: &str) -> Result<String> {
    Ok(format!("{}/{}", clusters_path(namespace)?, segment(cluster)?))
}

impl NimbusClient {
    /// List database clusters in a namespace.
    pub async fn list_database_clusters(&self, namespace: &str) -> Result<Vec<DatabaseCluster>> {
        let response: ListResponse<DatabaseCluster> =
            self.get_json(&clusters_path(namespace)?).await?;
        Ok(response.items)
    }

    /// Fetch a database cluster.
    pub async fn get_database_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DatabaseCluster> {
        self.get_json(&cluster_path(namespace, name)?).await
    }

    /// Create a database cluster.
    pub async fn create_database_cluster(
        &self,
        namespace: &str,
        request: &CreateDatabaseClusterRequest,
    ) -> Result<DatabaseCluster> {
        self.send_json(Method::POST, &clusters_path(namespace)?, Some(request))
            .await
    }

    /// Resize a database cluster.
    pub async fn update_database_cluster(
        &self,
        namespace: &str,
        name: &str,
        request: &UpdateDatabaseClusterRequest,
    ) -> Result<DatabaseCluster> {
        self.send_json(Method::PATCH, &cluster_path(namespace, name)?, Some(request))
            .await
    }

    /// Delete a database cluster.
    pub async fn delete_database_cluster(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete_path(&cluster_path(namespace, name)?).await
    }

    /// List databases in a cluster.
    pub async fn list_databases(&self, namespace: &str, cluster: &str) -> Result<Vec<Database>> {
        let path = format!("{}/databases", cluster_path(namespace, cluster)?);
        let response: ListResponse<Database> = self.get_json(&path).await?;
        Ok(response.items)
    }

    /// Fetch a database.
    pub async fn get_database(
        &self,
        namespace: &str,
        cluster: &str,
        name: &str,
    ) -> Result<Database> {
        let path = format!(
            "{}/databases/{}",
            cluster_path(namespace, cluster)?,
            segment(name)?
        );
        self.get_json(&path).await
    }

    /// Create a database.
    pub async fn create_database(
        &self,
        namespace: &str,
        cluster: &str,
        request: &CreateDatabaseRequest,
    ) -> Result<Database> {
        let path = format!("{}/databases", cluster_path(namespace, cluster)?);
        self.send_json(Method::POST, &path, Some(request)).await
    }

    /// Update a database.
    pub async fn update_database(
        &self,
        namespace: &str,
        cluster: &str,
        name: &str,
        request: &UpdateDatabaseRequest,
    ) -> Result<Database> {
        let path = format!(
            "{}/databases/{}",
            cluster_path(namespace, cluster)?,
            segment(name)?
        );
        self.send_json(Method::PATCH, &path, Some(request)).await
    }

    /// Delete a database.
    pub async fn delete_database(&self, namespace: &str, cluster: &str, name: &str) -> Result<()> {
        let path = format!(
            "{}/databases/{}",
            cluster_path(namespace, cluster)?,
            segment(name)?
        );
        self.delete_path(&path).await
    }

    /// List users in a cluster.
    pub async fn list_database_users(
        &self,
        namespace: &str,
        cluster: &str,
    ) -> Result<Vec<DatabaseUser>> {
        let path = format!("{}/users", cluster_path(namespace, cluster)?);
        let response: ListResponse<DatabaseUser> = self.get_json(&path).await?;
        Ok(response.items)
    }

    /// Fetch a database user.
    pub async fn get_database_user(
        &self,
        namespace: &str,
        cluster: &str,
        name: &str,
    ) -> Result<DatabaseUser> {
        let path = format!(
            "{}/users/{}",
            cluster_path(namespace, cluster)?,
            segment(name)?
        );
        self.get_json(&path).await
    }

    /// Create a database user.
    pub async fn create_database_user(
        &self,
        namespace: &str,
        cluster: &str,
        request: &CreateDatabaseUserRequest,
    ) -> Result<DatabaseUser> {
        let path = format!("{}/users", cluster_path(namespace, cluster)?);
        self.send_json(Method::POST, &path, Some(request)).await
    }

    /// Update a database user.
    pub async fn update_database_user(
        &self,
        namespace: &str,
        cluster: &str,
        name: &str,
        request: &UpdateDatabaseUserRequest,
    ) -> Result<DatabaseUser> {
        let path = format!(
            "{}/users/{}",
            cluster_path(namespace, cluster)?,
            segment(name)?
        );
        self.send_json(Method::PATCH, &path, Some(request)).await
    }

    /// Delete a database user.
    pub async fn delete_database_user(
        &self,
        namespace: &str,
        cluster: &str,
        name: &str,
    ) -> Result<()> {
        let path = format!(
            "{}/users/{}",
            cluster_path(namespace, cluster)?,
            segment(name)?
        );
        self.delete_path(&path).await
    }
}

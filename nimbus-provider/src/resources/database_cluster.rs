//! database_cluster - managed PostgreSQL or MySQL cluster

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::databases::{
    CreateDatabaseClusterRequest, DatabaseCluster, UpdateDatabaseClusterRequest,
};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{HandlerResult, NAMESPACED, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("database_cluster")
        .with_description("Managed database cluster. Storage can grow but never shrink.")
        .attribute(
            AttributeSchema::new("namespace", types::resource_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("name", types::resource_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("engine", types::one_of(&["postgresql", "mysql"]))
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("version", AttributeType::String)
                .required()
                .force_new()
                .with_description("Engine major version, e.g. `16`."),
        )
        .attribute(
            AttributeSchema::new("node_count", types::positive_int())
                .with_default(Value::Int(1)),
        )
        .attribute(
            AttributeSchema::new("node_size", AttributeType::String)
                .required()
                .with_description("Node size identifier, e.g. `db-small`."),
        )
        .attribute(
            AttributeSchema::new("storage_gb", types::positive_int())
                .required()
                .with_description("Disk per node in GiB."),
        )
        .attribute(AttributeSchema::new("endpoint", AttributeType::String).computed())
        .attribute(AttributeSchema::new("port", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
}

pub struct DatabaseClusterResource;

fn encode(namespace: &str, cluster: DatabaseCluster) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("name", cluster.name)
        .string("engine", cluster.engine)
        .string("version", cluster.version)
        .opt_int("node_count", cluster.node_count)
        .string("node_size", cluster.node_size)
        .int("storage_gb", cluster.storage_gb)
        .opt_string("endpoint", cluster.endpoint)
        .opt_int("port", cluster.port)
        .opt_string("status", cluster.status)
        .build()
}

#[async_trait]
impl ResourceHandler for DatabaseClusterResource {
    fn name(&self) -> &'static str {
        "database_cluster"
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        NAMESPACED
    }

    fn validate_update(&self, from: &Attributes, to: &Attributes) -> Result<(), String> {
        let current = from.get("storage_gb").and_then(Value::as_int);
        let desired = to.get("storage_gb").and_then(Value::as_int);
        match (current, desired) {
            (Some(current), Some(desired)) if desired < current => Err(format!(
                "storage_gb cannot shrink from {} to {}",
                current, desired
            )),
            _ => Ok(()),
        }
    }

    async fn create(
        &self,
        client: &NimbusClient,
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let reader = AttributeReader::new(attributes);
        let namespace = reader.string("namespace")?;
        let request = CreateDatabaseClusterRequest {
            name: reader.string("name")?,
            engine: reader.string("engine")?,
            version: reader.string("version")?,
            node_count: reader.opt_int("node_count")?,
            node_size: reader.string("node_size")?,
            storage_gb: reader.int("storage_gb")?,
        };
        let cluster = client.create_database_cluster(&namespace, &request).await?;
        Ok(encode(&namespace, cluster))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        Ok(encode(
            namespace,
            client.get_database_cluster(namespace, name).await?,
        ))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        let reader = AttributeReader::new(attributes);
        let request = UpdateDatabaseClusterRequest {
            node_count: reader.opt_int("node_count")?,
            node_size: reader.string("node_size")?,
            storage_gb: reader.int("storage_gb")?,
        };
        let cluster = client
            .update_database_cluster(namespace, name, &request)
            .await?;
        Ok(encode(namespace, cluster))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, name] = key_parts(key)?;
        Ok(client.delete_database_cluster(namespace, name).await?)
    }
}

//! database_user - login role inside a cluster
//!
//! The API only returns the password in the create response (or when an
//! update sets it); later reads rely on the provider carrying it forward.

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::databases::{
    CreateDatabaseUserRequest, DatabaseUser, UpdateDatabaseUserRequest,
};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{CLUSTER_SCOPED, HandlerResult, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("database_user")
        .with_description("Login role inside a database cluster.")
        .attribute(
            AttributeSchema::new("namespace", types::resource_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("cluster", types::resource_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("name", types::resource_name())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .optional_computed()
                .sensitive()
                .with_description("Generated by the API when omitted."),
        )
        .attribute(
            AttributeSchema::new("admin", AttributeType::Bool).with_default(Value::Bool(false)),
        )
}

pub struct DatabaseUserResource;

fn encode(namespace: &str, cluster: &str, user: DatabaseUser) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("cluster", cluster)
        .string("name", user.name)
        .opt_string("password", user.password)
        .bool("admin", user.admin)
        .build()
}

#[async_trait]
impl ResourceHandler for DatabaseUserResource {
    fn name(&self) -> &'static str {
        "database_user"
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        CLUSTER_SCOPED
    }

    async fn create(
        &self,
        client: &NimbusClient,
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let reader = AttributeReader::new(attributes);
        let namespace = reader.string("namespace")?;
        let cluster = reader.string("cluster")?;
        let request = CreateDatabaseUserRequest {
            name: reader.string("name")?,
            password: reader.opt_string("password")?,
            admin: reader.bool_or("admin", false)?,
        };
        let user = client
            .create_database_user(&namespace, &cluster, &request)
            .await?;
        Ok(encode(&namespace, &cluster, user))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, cluster, name] = key_parts(key)?;
        let user = client.get_database_user(namespace, cluster, name).await?;
        Ok(encode(namespace, cluster, user))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, cluster, name] = key_parts(key)?;
        let reader = AttributeReader::new(attributes);
        let request = UpdateDatabaseUserRequest {
            password: reader.opt_string("password")?,
            admin: reader.bool_or("admin", false)?,
        };
        let user = client
            .update_database_user(namespace, cluster, name, &request)
            .await?;
        Ok(encode(namespace, cluster, user))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, cluster, name] = key_parts(key)?;
        Ok(client.delete_database_user(namespace, cluster, name).await?)
    }
}

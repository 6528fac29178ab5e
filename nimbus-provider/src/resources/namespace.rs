//! namespace - isolation boundary for every other Nimbus object

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::namespaces::{CreateNamespaceRequest, Namespace, UpdateNamespaceRequest};
use nimbus_core::resource::Attributes;
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{HandlerResult, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("namespace")
        .with_description("Isolation boundary grouping containers, storage, databases and queues.")
        .attribute(
            AttributeSchema::new("name", types::resource_name())
                .required()
                .force_new()
                .with_description("Namespace name, unique within the project."),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("labels", types::string_map())
                .with_description("Free-form key/value labels."),
        )
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
}

pub struct NamespaceResource;

fn encode(namespace: Namespace) -> Attributes {
    AttributeWriter::new()
        .string("name", namespace.name)
        .opt_string("description", namespace.description)
        .string_map("labels", &namespace.labels)
        .opt_string("status", namespace.status)
        .opt_string("created_at", namespace.created_at)
        .build()
}

#[async_trait]
impl ResourceHandler for NamespaceResource {
    fn name(&self) -> &'static str {
        "namespace"
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        &["name"]
    }

    async fn create(
        &self,
        client: &NimbusClient,
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let reader = AttributeReader::new(attributes);
        let request = CreateNamespaceRequest {
            name: reader.string("name")?,
            description: reader.opt_string("description")?,
            labels: reader.opt_string_map("labels")?,
        };
        Ok(encode(client.create_namespace(&request).await?))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [name] = key_parts(key)?;
        Ok(encode(client.get_namespace(name).await?))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [name] = key_parts(key)?;
        let reader = AttributeReader::new(attributes);
        let request = UpdateNamespaceRequest {
            description: reader.opt_string("description")?,
            labels: reader.opt_string_map("labels")?,
        };
        Ok(encode(client.update_namespace(name, &request).await?))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [name] = key_parts(key)?;
        Ok(client.delete_namespace(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::resource::Value;
    use std::collections::HashMap;

    #[test]
    fn encoded_state_validates_apart_from_computed() {
        let attrs = encode(Namespace {
            name: "prod".into(),
            description: Some("production".into()),
            labels: HashMap::from([("team".to_string(), "core".to_string())]),
            status: Some("active".into()),
            created_at: None,
        });
        assert_eq!(attrs.get("status"), Some(&Value::string("active")));

        let configurable: Attributes = attrs
            .into_iter()
            .filter(|(k, _)| k != "status" && k != "created_at")
            .collect();
        assert!(schema().validate(&configurable).is_ok());
    }

    #[test]
    fn rejects_invalid_names() {
        let attrs: Attributes = [("name".to_string(), Value::string("Prod_1"))]
            .into_iter()
            .collect();
        assert!(schema().validate(&attrs).is_err());
    }
}

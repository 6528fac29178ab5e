//! registry - private container image registry

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::storage::{CreateRegistryRequest, Registry, UpdateRegistryRequest};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{HandlerResult, NAMESPACED, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("registry")
        .with_description("Container image registry scoped to a namespace.")
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
            AttributeSchema::new("public", AttributeType::Bool)
                .with_default(Value::Bool(false))
                .with_description("Allow anonymous pulls."),
        )
        .attribute(
            AttributeSchema::new("endpoint", AttributeType::String)
                .computed()
                .with_description("Address to push and pull images."),
        )
        .attribute(AttributeSchema::new("size_bytes", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
}

pub struct RegistryResource;

fn encode(namespace: &str, registry: Registry) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("name", registry.name)
        .bool("public", registry.public)
        .opt_string("endpoint", registry.endpoint)
        .opt_int("size_bytes", registry.size_bytes)
        .opt_string("status", registry.status)
        .build()
}

#[async_trait]
impl ResourceHandler for RegistryResource {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        NAMESPACED
    }

    async fn create(
        &self,
        client: &NimbusClient,
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let reader = AttributeReader::new(attributes);
        let namespace = reader.string("namespace")?;
        let request = CreateRegistryRequest {
            name: reader.string("name")?,
            public: reader.bool_or("public", false)?,
        };
        let registry = client.create_registry(&namespace, &request).await?;
        Ok(encode(&namespace, registry))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        Ok(encode(namespace, client.get_registry(namespace, name).await?))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        let request = UpdateRegistryRequest {
            public: AttributeReader::new(attributes).bool_or("public", false)?,
        };
        let registry = client.update_registry(namespace, name, &request).await?;
        Ok(encode(namespace, registry))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, name] = key_parts(key)?;
        Ok(client.delete_registry(namespace, name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::configurable_only;

    #[test]
    fn endpoint_is_read_only() {
        let attrs: Attributes = [
            ("namespace".to_string(), Value::string("prod")),
            ("name".to_string(), Value::string("images")),
            ("endpoint".to_string(), Value::string("rg.example")),
        ]
        .into_iter()
        .collect();
        let errors = schema().validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Attribute 'endpoint' is computed by the API and cannot be set"
        );
    }

    #[test]
    fn encode_always_records_public() {
        let attrs = encode(
            "prod",
            Registry {
                namespace: "prod".into(),
                name: "images".into(),
                public: false,
                endpoint: Some("rg.nimbus.cloud/prod-images".into()),
                size_bytes: Some(0),
                status: None,
            },
        );
        assert_eq!(attrs.get("public"), Some(&Value::Bool(false)));
        assert_eq!(attrs.get("size_bytes"), Some(&Value::Int(0)));
    }

    #[test]
    fn encoded_state_validates() {
        let attrs = encode(
            "prod",
            Registry {
                namespace: "prod".into(),
                name: "images".into(),
                public: true,
                endpoint: Some("rg.nimbus.cloud/prod-images".into()),
                size_bytes: Some(1024),
                status: Some("ready".into()),
            },
        );
        let configurable = configurable_only(&schema(), attrs);
        assert!(!configurable.contains_key("endpoint"));
        assert!(schema().validate(&configurable).is_ok());
    }
}

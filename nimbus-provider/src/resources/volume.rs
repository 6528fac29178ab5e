//! volume - block storage mountable into containers

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::storage::{CreateVolumeRequest, UpdateVolumeRequest, Volume};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{HandlerResult, NAMESPACED, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("volume")
        .with_description("Block storage volume. Volumes can grow but never shrink.")
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
            AttributeSchema::new("size_gb", types::positive_int())
                .required()
                .with_description("Capacity in GiB."),
        )
        .attribute(
            AttributeSchema::new("storage_class", types::one_of(&["standard", "ssd"]))
                .force_new()
                .with_default(Value::string("standard")),
        )
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
}

pub struct VolumeResource;

fn encode(namespace: &str, volume: Volume) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("name", volume.name)
        .int("size_gb", volume.size_gb)
        .opt_string("storage_class", volume.storage_class)
        .opt_string("status", volume.status)
        .opt_string("created_at", volume.created_at)
        .build()
}

#[async_trait]
impl ResourceHandler for VolumeResource {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        NAMESPACED
    }

    fn validate_update(&self, from: &Attributes, to: &Attributes) -> Result<(), String> {
        let current = from.get("size_gb").and_then(Value::as_int);
        let desired = to.get("size_gb").and_then(Value::as_int);
        if let (Some(current), Some(desired)) = (current, desired)
            && desired < current
        {
            return Err(format!(
                "size_gb cannot shrink from {} to {}",
                current, desired
            ));
        }
        Ok(())
    }

    async fn create(
        &self,
        client: &NimbusClient,
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let reader = AttributeReader::new(attributes);
        let namespace = reader.string("namespace")?;
        let request = CreateVolumeRequest {
            name: reader.string("name")?,
            size_gb: reader.int("size_gb")?,
            storage_class: reader.opt_string("storage_class")?,
        };
        let volume = client.create_volume(&namespace, &request).await?;
        Ok(encode(&namespace, volume))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        Ok(encode(namespace, client.get_volume(namespace, name).await?))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        let reader = AttributeReader::new(attributes);
        let request = UpdateVolumeRequest {
            size_gb: reader.int("size_gb")?,
        };
        let volume = client.update_volume(namespace, name, &request).await?;
        Ok(encode(namespace, volume))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, name] = key_parts(key)?;
        Ok(client.delete_volume(namespace, name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::configurable_only;

    fn size(n: i64) -> Attributes {
        [("size_gb".to_string(), Value::Int(n))].into_iter().collect()
    }

    #[test]
    fn volumes_only_grow() {
        assert!(VolumeResource.validate_update(&size(10), &size(20)).is_ok());
        assert!(VolumeResource.validate_update(&size(10), &size(10)).is_ok());
        assert_eq!(
            VolumeResource.validate_update(&size(20), &size(10)).unwrap_err(),
            "size_gb cannot shrink from 20 to 10"
        );
    }

    #[test]
    fn storage_class_defaults_to_standard() {
        let mut attrs: Attributes = [
            ("namespace".to_string(), Value::string("prod")),
            ("name".to_string(), Value::string("data")),
            ("size_gb".to_string(), Value::Int(10)),
        ]
        .into_iter()
        .collect();
        assert!(schema().validate(&attrs).is_ok());
        schema().apply_defaults(&mut attrs);
        assert_eq!(attrs.get("storage_class"), Some(&Value::string("standard")));
    }

    #[test]
    fn encode_uses_namespace_from_identifier() {
        let attrs = encode(
            "prod",
            Volume {
                namespace: String::new(),
                name: "data".into(),
                size_gb: 10,
                storage_class: Some("ssd".into()),
                status: Some("available".into()),
                created_at: None,
            },
        );
        assert_eq!(attrs.get("namespace"), Some(&Value::string("prod")));
        assert_eq!(attrs.get("storage_class"), Some(&Value::string("ssd")));
        assert!(!attrs.contains_key("created_at"));
    }

    #[test]
    fn encoded_state_validates() {
        let attrs = encode(
            "prod",
            Volume {
                namespace: "prod".into(),
                name: "data".into(),
                size_gb: 50,
                storage_class: Some("standard".into()),
                status: Some("available".into()),
                created_at: Some("2026-10-18T12:00:00Z".into()),
            },
        );
        let configurable = configurable_only(&schema(), attrs);
        assert!(!configurable.contains_key("status"));
        assert!(schema().validate(&configurable).is_ok());
    }
}

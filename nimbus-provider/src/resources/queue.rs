//! queue - managed message queue

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::queues::{CreateQueueRequest, Queue, UpdateQueueRequest};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{HandlerResult, NAMESPACED, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

/// Four days
const DEFAULT_RETENTION_SECONDS: i64 = 345_600;
const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: i64 = 30;

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("queue")
        .with_description("Message queue scoped to a namespace.")
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
            AttributeSchema::new("kind", types::one_of(&["standard", "fifo"]))
                .force_new()
                .with_default(Value::string("standard")),
        )
        .attribute(
            AttributeSchema::new("message_retention_seconds", types::retention_seconds())
                .with_default(Value::Int(DEFAULT_RETENTION_SECONDS)),
        )
        .attribute(
            AttributeSchema::new(
                "visibility_timeout_seconds",
                types::visibility_timeout_seconds(),
            )
            .with_default(Value::Int(DEFAULT_VISIBILITY_TIMEOUT_SECONDS)),
        )
        .attribute(AttributeSchema::new("url", AttributeType::String).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
}

pub struct QueueResource;

fn encode(namespace: &str, queue: Queue) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("name", queue.name)
        .opt_string("kind", queue.kind)
        .opt_int("message_retention_seconds", queue.message_retention_seconds)
        .opt_int("visibility_timeout_seconds", queue.visibility_timeout_seconds)
        .opt_string("url", queue.url)
        .opt_string("status", queue.status)
        .build()
}

#[async_trait]
impl ResourceHandler for QueueResource {
    fn name(&self) -> &'static str {
        "queue"
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
        let request = CreateQueueRequest {
            name: reader.string("name")?,
            kind: reader.opt_string("kind")?,
            message_retention_seconds: reader.opt_int("message_retention_seconds")?,
            visibility_timeout_seconds: reader.opt_int("visibility_timeout_seconds")?,
        };
        let queue = client.create_queue(&namespace, &request).await?;
        Ok(encode(&namespace, queue))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        Ok(encode(namespace, client.get_queue(namespace, name).await?))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        let reader = AttributeReader::new(attributes);
        let request = UpdateQueueRequest {
            message_retention_seconds: reader.opt_int("message_retention_seconds")?,
            visibility_timeout_seconds: reader.opt_int("visibility_timeout_seconds")?,
        };
        let queue = client.update_queue(namespace, name, &request).await?;
        Ok(encode(namespace, queue))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, name] = key_parts(key)?;
        Ok(client.delete_queue(namespace, name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::configurable_only;

    fn queue() -> Attributes {
        [
            ("namespace".to_string(), Value::string("prod")),
            ("name".to_string(), Value::string("jobs")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn defaults_fill_timing() {
        let mut attrs = queue();
        schema().apply_defaults(&mut attrs);
        assert_eq!(attrs.get("kind"), Some(&Value::string("standard")));
        assert_eq!(
            attrs.get("message_retention_seconds"),
            Some(&Value::Int(345_600))
        );
        assert_eq!(attrs.get("visibility_timeout_seconds"), Some(&Value::Int(30)));
    }

    #[test]
    fn retention_is_bounded() {
        let mut attrs = queue();
        attrs.insert("message_retention_seconds".to_string(), Value::Int(30));
        let errors = schema().validate(&attrs).unwrap_err();
        assert_eq!(errors[0].path().as_deref(), Some("message_retention_seconds"));

        attrs.insert("message_retention_seconds".to_string(), Value::Int(1_209_600));
        assert!(schema().validate(&attrs).is_ok());
    }

    #[test]
    fn visibility_timeout_upper_bound() {
        let mut attrs = queue();
        attrs.insert("visibility_timeout_seconds".to_string(), Value::Int(43_201));
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn encoded_state_validates() {
        let attrs = encode(
            "prod",
            Queue {
                namespace: String::new(),
                name: "jobs".into(),
                kind: Some("fifo".into()),
                message_retention_seconds: Some(DEFAULT_RETENTION_SECONDS),
                visibility_timeout_seconds: Some(60),
                url: Some("https://queues.nimbus.cloud/prod/jobs".into()),
                status: Some("active".into()),
            },
        );
        assert_eq!(attrs.get("namespace"), Some(&Value::string("prod")));
        assert_eq!(attrs.get("status"), Some(&Value::string("active")));

        let configurable = configurable_only(&schema(), attrs);
        assert!(!configurable.contains_key("url"));
        assert!(schema().validate(&configurable).is_ok());
    }
}

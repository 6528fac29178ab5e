//! container_job - run-to-completion container, optionally on a cron schedule

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::containers::{ContainerJob, ContainerJobSpec, CreateContainerJobRequest};
use nimbus_core::resource::Attributes;
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::container::{decode_resources, encode_resources, resources_type};
use super::{HandlerResult, NAMESPACED, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("container_job")
        .with_description("Container that runs to completion, on demand or on a schedule.")
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
        .attribute(AttributeSchema::new("image", AttributeType::String).required())
        .attribute(AttributeSchema::new("command", types::string_list()))
        .attribute(AttributeSchema::new("args", types::string_list()))
        .attribute(AttributeSchema::new("env", types::string_map()))
        .attribute(AttributeSchema::new("secret_env", types::string_map()).sensitive())
        .attribute(AttributeSchema::new("resources", resources_type()))
        .attribute(
            AttributeSchema::new("schedule", types::cron_expression())
                .with_description("Five-field cron expression; unset runs on demand only."),
        )
        .attribute(AttributeSchema::new("timeout_seconds", types::positive_int()))
        .attribute(AttributeSchema::new("max_retries", types::non_negative_int()))
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("last_run_at", AttributeType::String).computed())
}

pub struct ContainerJobResource;

fn decode_spec(reader: &AttributeReader<'_>) -> HandlerResult<ContainerJobSpec> {
    Ok(ContainerJobSpec {
        image: reader.string("image")?,
        command: reader.opt_string_list("command")?,
        args: reader.opt_string_list("args")?,
        env: reader.opt_string_map("env")?,
        secret_env: reader.opt_string_map("secret_env")?,
        resources: decode_resources(reader)?,
        schedule: reader.opt_string("schedule")?,
        timeout_seconds: reader.opt_int("timeout_seconds")?,
        max_retries: reader.opt_int("max_retries")?,
    })
}

fn encode(namespace: &str, job: ContainerJob) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("name", job.name)
        .string("image", job.image)
        .string_list("command", &job.command)
        .string_list("args", &job.args)
        .string_map("env", &job.env)
        .object("resources", encode_resources(job.resources.as_ref()))
        .opt_string("schedule", job.schedule)
        .opt_int("timeout_seconds", job.timeout_seconds)
        .opt_int("max_retries", job.max_retries)
        .opt_string("status", job.status)
        .opt_string("last_run_at", job.last_run_at)
        .build()
}

#[async_trait]
impl ResourceHandler for ContainerJobResource {
    fn name(&self) -> &'static str {
        "container_job"
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
        let request = CreateContainerJobRequest {
            name: reader.string("name")?,
            spec: decode_spec(&reader)?,
        };
        let job = client.create_container_job(&namespace, &request).await?;
        Ok(encode(&namespace, job))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        Ok(encode(namespace, client.get_container_job(namespace, name).await?))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        let spec = decode_spec(&AttributeReader::new(attributes))?;
        let job = client.update_container_job(namespace, name, &spec).await?;
        Ok(encode(namespace, job))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, name] = key_parts(key)?;
        Ok(client.delete_container_job(namespace, name).await?)
    }
}

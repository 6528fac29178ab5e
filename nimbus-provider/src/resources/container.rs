//! container - long-running service built from an image
//!
//! Carries the nested `resources`, `scaling` and `volume_mounts` blocks; the
//! `resources` helpers are shared with container jobs.

use std::collections::HashSet;

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::containers::{
    AutoInput, Container, ContainerResources, ContainerSpec, CreateContainerRequest, Scaling,
    ScalingTrigger, VolumeMount,
};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{HandlerResult, NAMESPACED, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub(crate) fn resources_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("cpu_millis", types::positive_int())
            .with_description("CPU in thousandths of a core."),
        AttributeSchema::new("memory_mb", types::positive_int()).with_description("Memory in MiB."),
    ])
}

fn scaling_type() -> AttributeType {
    let trigger = AttributeType::Object(vec![
        AttributeSchema::new(
            "type",
            types::one_of(&["cpu", "memory", "requests", "concurrency"]),
        )
        .required(),
        AttributeSchema::new("threshold", types::positive_int()).required(),
    ]);
    AttributeType::Object(vec![
        AttributeSchema::new("min_instances", types::non_negative_int()),
        AttributeSchema::new("max_instances", types::positive_int()),
        AttributeSchema::new(
            "auto_input",
            AttributeType::Object(vec![
                AttributeSchema::new("cooldown_seconds", types::positive_int()),
                AttributeSchema::new("triggers", AttributeType::List(Box::new(trigger))),
            ]),
        ),
    ])
}

fn volume_mount_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("volume", types::resource_name()).required(),
        AttributeSchema::new("mount_path", types::absolute_path()).required(),
        AttributeSchema::new("read_only", AttributeType::Bool).with_default(Value::Bool(false)),
    ])
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("container")
        .with_description("Long-running container serving traffic from an image.")
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
            AttributeSchema::new("image", AttributeType::String)
                .required()
                .with_description("Image reference, e.g. `nginx:1.27`."),
        )
        .attribute(AttributeSchema::new("port", types::port()))
        .attribute(AttributeSchema::new("command", types::string_list()))
        .attribute(AttributeSchema::new("args", types::string_list()))
        .attribute(AttributeSchema::new("env", types::string_map()))
        .attribute(
            AttributeSchema::new("secret_env", types::string_map())
                .sensitive()
                .with_description(
                    "Environment variables stored encrypted; never returned by the API.",
                ),
        )
        .attribute(
            AttributeSchema::new("privacy", types::one_of(&["public", "private"]))
                .with_default(Value::string("public")),
        )
        .attribute(AttributeSchema::new("resources", resources_type()))
        .attribute(AttributeSchema::new("scaling", scaling_type()))
        .attribute(AttributeSchema::new(
            "volume_mounts",
            AttributeType::List(Box::new(volume_mount_type())),
        ))
        .attribute(AttributeSchema::new("url", AttributeType::String).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
}

pub(crate) fn decode_resources(
    reader: &AttributeReader<'_>,
) -> HandlerResult<Option<ContainerResources>> {
    let Some(resources) = reader.opt_object("resources")? else {
        return Ok(None);
    };
    Ok(Some(ContainerResources {
        cpu_millis: resources.opt_int("cpu_millis")?,
        memory_mb: resources.opt_int("memory_mb")?,
    }))
}

pub(crate) fn encode_resources(resources: Option<&ContainerResources>) -> AttributeWriter {
    match resources {
        Some(r) => AttributeWriter::new()
            .opt_int("cpu_millis", r.cpu_millis)
            .opt_int("memory_mb", r.memory_mb),
        None => AttributeWriter::new(),
    }
}

fn decode_scaling(reader: &AttributeReader<'_>) -> HandlerResult<Option<Scaling>> {
    let Some(scaling) = reader.opt_object("scaling")? else {
        return Ok(None);
    };
    let auto_input = match scaling.opt_object("auto_input")? {
        Some(auto) => Some(AutoInput {
            cooldown_seconds: auto.opt_int("cooldown_seconds")?,
            triggers: auto
                .objects("triggers")?
                .iter()
                .map(|t| {
                    Ok(ScalingTrigger {
                        kind: t.string("type")?,
                        threshold: t.int("threshold")?,
                    })
                })
                .collect::<HandlerResult<Vec<_>>>()?,
        }),
        None => None,
    };
    Ok(Some(Scaling {
        min_instances: scaling.opt_int("min_instances")?,
        max_instances: scaling.opt_int("max_instances")?,
        auto_input,
    }))
}

fn encode_scaling(scaling: Option<&Scaling>) -> AttributeWriter {
    let Some(scaling) = scaling else {
        return AttributeWriter::new();
    };
    let auto_input = match &scaling.auto_input {
        Some(auto) => AttributeWriter::new()
            .opt_int("cooldown_seconds", auto.cooldown_seconds)
            .objects(
                "triggers",
                auto.triggers
                    .iter()
                    .map(|t| {
                        AttributeWriter::new()
                            .string("type", &t.kind)
                            .int("threshold", t.threshold)
                    })
                    .collect(),
            ),
        None => AttributeWriter::new(),
    };
    AttributeWriter::new()
        .opt_int("min_instances", scaling.min_instances)
        .opt_int("max_instances", scaling.max_instances)
        .object("auto_input", auto_input)
}

fn decode_spec(reader: &AttributeReader<'_>) -> HandlerResult<ContainerSpec> {
    let volume_mounts = reader
        .objects("volume_mounts")?
        .iter()
        .map(|m| {
            Ok(VolumeMount {
                volume: m.string("volume")?,
                mount_path: m.string("mount_path")?,
                read_only: m.bool_or("read_only", false)?,
            })
        })
        .collect::<HandlerResult<Vec<_>>>()?;

    Ok(ContainerSpec {
        image: reader.string("image")?,
        port: reader.opt_int("port")?,
        command: reader.opt_string_list("command")?,
        args: reader.opt_string_list("args")?,
        env: reader.opt_string_map("env")?,
        secret_env: reader.opt_string_map("secret_env")?,
        privacy: reader.opt_string("privacy")?,
        resources: decode_resources(reader)?,
        scaling: decode_scaling(reader)?,
        volume_mounts: if reader.has("volume_mounts") {
            Some(volume_mounts)
        } else {
            None
        },
    })
}

fn encode(namespace: &str, container: Container) -> Attributes {
    let mounts = container
        .volume_mounts
        .iter()
        .map(|m| {
            AttributeWriter::new()
                .string("volume", &m.volume)
                .string("mount_path", &m.mount_path)
                .bool("read_only", m.read_only)
        })
        .collect();

    AttributeWriter::new()
        .string("namespace", namespace)
        .string("name", container.name)
        .string("image", container.image)
        .opt_int("port", container.port)
        .string_list("command", &container.command)
        .string_list("args", &container.args)
        .string_map("env", &container.env)
        .opt_string("privacy", container.privacy)
        .object("resources", encode_resources(container.resources.as_ref()))
        .object("scaling", encode_scaling(container.scaling.as_ref()))
        .objects("volume_mounts", mounts)
        .opt_string("url", container.url)
        .opt_string("status", container.status)
        .opt_string("created_at", container.created_at)
        .build()
}

pub struct ContainerResource;

#[async_trait]
impl ResourceHandler for ContainerResource {
    fn name(&self) -> &'static str {
        "container"
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        NAMESPACED
    }

    fn validate(&self, attributes: &Attributes) -> Result<(), String> {
        let reader = AttributeReader::new(attributes);

        if let Ok(Some(scaling)) = reader.opt_object("scaling")
            && let (Ok(Some(min)), Ok(Some(max))) = (
                scaling.opt_int("min_instances"),
                scaling.opt_int("max_instances"),
            )
            && min > max
        {
            return Err(format!(
                "scaling.min_instances ({}) must not exceed scaling.max_instances ({})",
                min, max
            ));
        }

        let mut paths = HashSet::new();
        for mount in reader.objects("volume_mounts").unwrap_or_default() {
            if let Ok(path) = mount.string("mount_path")
                && !paths.insert(path.clone())
            {
                return Err(format!(
                    "mount_path '{}' is used by more than one volume mount",
                    path
                ));
            }
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
        let request = CreateContainerRequest {
            name: reader.string("name")?,
            spec: decode_spec(&reader)?,
        };
        let container = client.create_container(&namespace, &request).await?;
        Ok(encode(&namespace, container))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        Ok(encode(namespace, client.get_container(namespace, name).await?))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, name] = key_parts(key)?;
        let spec = decode_spec(&AttributeReader::new(attributes))?;
        let container = client.update_container(namespace, name, &spec).await?;
        Ok(encode(namespace, container))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, name] = key_parts(key)?;
        Ok(client.delete_container(namespace, name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn object(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn base() -> Attributes {
        [
            ("namespace".to_string(), Value::string("prod")),
            ("name".to_string(), Value::string("web")),
            ("image".to_string(), Value::string("nginx:1.27")),
        ]
        .into_iter()
        .collect()
    }

    fn with(mut attrs: Attributes, key: &str, value: Value) -> Attributes {
        attrs.insert(key.to_string(), value);
        attrs
    }

    #[test]
    fn nested_validation_reports_path() {
        let attrs = with(
            base(),
            "scaling",
            object(vec![(
                "auto_input",
                object(vec![(
                    "triggers",
                    Value::List(vec![
                        object(vec![("type", Value::string("cpu")), ("threshold", Value::Int(70))]),
                        object(vec![
                            ("type", Value::string("disk")),
                            ("threshold", Value::Int(70)),
                        ]),
                    ]),
                )]),
            )]),
        );
        let errors = schema().validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].path().as_deref(),
            Some("scaling.auto_input.triggers[1].type")
        );
    }

    #[test]
    fn min_instances_must_not_exceed_max() {
        let attrs = with(
            base(),
            "scaling",
            object(vec![
                ("min_instances", Value::Int(5)),
                ("max_instances", Value::Int(2)),
            ]),
        );
        assert!(schema().validate(&attrs).is_ok());
        assert_eq!(
            ContainerResource.validate(&attrs).unwrap_err(),
            "scaling.min_instances (5) must not exceed scaling.max_instances (2)"
        );
    }

    #[test]
    fn duplicate_mount_paths_are_rejected() {
        let mount = |volume: &str| {
            object(vec![
                ("volume", Value::string(volume)),
                ("mount_path", Value::string("/data")),
            ])
        };
        let attrs = with(
            base(),
            "volume_mounts",
            Value::List(vec![mount("a"), mount("b")]),
        );
        assert!(ContainerResource.validate(&attrs).is_err());
    }

    #[test]
    fn mount_defaults_are_applied() {
        let mut attrs = with(
            base(),
            "volume_mounts",
            Value::List(vec![object(vec![
                ("volume", Value::string("data")),
                ("mount_path", Value::string("/var/lib/data")),
            ])]),
        );
        schema().apply_defaults(&mut attrs);
        let mounts = attrs["volume_mounts"].as_list().unwrap();
        assert_eq!(
            mounts[0].as_map().unwrap().get("read_only"),
            Some(&Value::Bool(false))
        );
        assert_eq!(attrs.get("privacy"), Some(&Value::string("public")));
    }

    #[test]
    fn decode_builds_full_spec() {
        let mut attrs = with(
            with(
                base(),
                "secret_env",
                object(vec![("TOKEN", Value::string("s3cr3t"))]),
            ),
            "resources",
            object(vec![("cpu_millis", Value::Int(250))]),
        );
        schema().apply_defaults(&mut attrs);
        let spec = decode_spec(&AttributeReader::new(&attrs)).unwrap();
        assert_eq!(spec.image, "nginx:1.27");
        assert_eq!(spec.privacy.as_deref(), Some("public"));
        assert_eq!(
            spec.secret_env,
            Some(HashMap::from([("TOKEN".to_string(), "s3cr3t".to_string())]))
        );
        assert_eq!(
            spec.resources,
            Some(ContainerResources {
                cpu_millis: Some(250),
                memory_mb: None
            })
        );
        assert_eq!(spec.volume_mounts, None);
    }

    #[test]
    fn encoded_state_passes_schema_validation() {
        let container = Container {
            namespace: "prod".into(),
            name: "web".into(),
            image: "nginx:1.27".into(),
            port: Some(8080),
            command: vec![],
            args: vec!["--verbose".into()],
            env: HashMap::from([("MODE".to_string(), "prod".to_string())]),
            privacy: Some("private".into()),
            resources: Some(ContainerResources {
                cpu_millis: Some(500),
                memory_mb: Some(256),
            }),
            scaling: Some(Scaling {
                min_instances: Some(0),
                max_instances: Some(3),
                auto_input: Some(AutoInput {
                    cooldown_seconds: Some(60),
                    triggers: vec![ScalingTrigger {
                        kind: "requests".into(),
                        threshold: 100,
                    }],
                }),
            }),
            volume_mounts: vec![VolumeMount {
                volume: "data".into(),
                mount_path: "/data".into(),
                read_only: true,
            }],
            url: Some("https://web.example".into()),
            status: Some("ready".into()),
            created_at: None,
        };
        let attrs: Attributes = encode("prod", container)
            .into_iter()
            .filter(|(k, _)| !matches!(k.as_str(), "url" | "status" | "created_at"))
            .collect();
        assert!(schema().validate(&attrs).is_ok());
        assert!(ContainerResource.validate(&attrs).is_ok());
        assert!(!attrs.contains_key("command"));
    }
}

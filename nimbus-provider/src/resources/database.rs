//! database - logical database inside a cluster

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_client::databases::{CreateDatabaseRequest, Database, UpdateDatabaseRequest};
use nimbus_core::resource::{Attributes, Value};
use nimbus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{CLUSTER_SCOPED, HandlerResult, ResourceHandler, key_parts};
use crate::convert::{AttributeReader, AttributeWriter};

pub fn schema() -> ResourceSchema {
    ResourceSchema::new("database")
        .with_description("Logical database inside a database cluster.")
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
            AttributeSchema::new("owner", AttributeType::String)
                .optional_computed()
                .with_description("Owning database user; defaults to the cluster admin."),
        )
        .attribute(
            AttributeSchema::new("encoding", AttributeType::String)
                .force_new()
                .with_default(Value::string("UTF8")),
        )
}

pub struct DatabaseResource;

fn encode(namespace: &str, cluster: &str, database: Database) -> Attributes {
    AttributeWriter::new()
        .string("namespace", namespace)
        .string("cluster", cluster)
        .string("name", database.name)
        .opt_string("owner", database.owner)
        .opt_string("encoding", database.encoding)
        .build()
}

#[async_trait]
impl ResourceHandler for DatabaseResource {
    fn name(&self) -> &'static str {
        "database"
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
        let request = CreateDatabaseRequest {
            name: reader.string("name")?,
            owner: reader.opt_string("owner")?,
            encoding: reader.opt_string("encoding")?,
        };
        let database = client.create_database(&namespace, &cluster, &request).await?;
        Ok(encode(&namespace, &cluster, database))
    }

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes> {
        let [namespace, cluster, name] = key_parts(key)?;
        let database = client.get_database(namespace, cluster, name).await?;
        Ok(encode(namespace, cluster, database))
    }

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes> {
        let [namespace, cluster, name] = key_parts(key)?;
        let request = UpdateDatabaseRequest {
            owner: AttributeReader::new(attributes).opt_string("owner")?,
        };
        let database = client
            .update_database(namespace, cluster, name, &request)
            .await?;
        Ok(encode(namespace, cluster, database))
    }

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()> {
        let [namespace, cluster, name] = key_parts(key)?;
        Ok(client.delete_database(namespace, cluster, name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::differ::{Diff, diff};
    use nimbus_core::resource::{Resource, ResourceId, State};

    #[test]
    fn identity_is_cluster_scoped() {
        assert_eq!(DatabaseResource.identity(), &["namespace", "cluster", "name"]);
    }

    #[test]
    fn encoding_defaults_to_utf8() {
        let mut attrs: Attributes = [
            ("namespace".to_string(), Value::string("prod")),
            ("cluster".to_string(), Value::string("main")),
            ("name".to_string(), Value::string("app")),
        ]
        .into_iter()
        .collect();
        assert!(schema().validate(&attrs).is_ok());
        schema().apply_defaults(&mut attrs);
        assert_eq!(attrs.get("encoding"), Some(&Value::string("UTF8")));
    }

    #[test]
    fn encode_takes_parents_from_key() {
        let attrs = encode(
            "prod",
            "main",
            Database {
                namespace: String::new(),
                cluster: String::new(),
                name: "app".into(),
                owner: None,
                encoding: Some("UTF8".into()),
            },
        );
        assert_eq!(attrs.get("cluster"), Some(&Value::string("main")));
        assert!(!attrs.contains_key("owner"));
    }

    #[test]
    fn owner_filled_by_api_is_not_drift() {
        let mut desired = Resource::new("database", "app")
            .with_attribute("namespace", Value::string("prod"))
            .with_attribute("cluster", Value::string("main"))
            .with_attribute("name", Value::string("app"));
        schema().apply_defaults(&mut desired.attributes);

        let current = State::existing(
            ResourceId::new("database", "app"),
            encode(
                "prod",
                "main",
                Database {
                    namespace: String::new(),
                    cluster: String::new(),
                    name: "app".into(),
                    owner: Some("admin".into()),
                    encoding: Some("UTF8".into()),
                },
            ),
        );
        assert_eq!(diff(&schema(), &desired, &current), Diff::NoChange);

        let desired = desired.with_attribute("owner", Value::string("app_user"));
        assert_eq!(
            diff(&schema(), &desired, &current),
            Diff::Update {
                changed_attributes: vec!["owner".to_string()]
            }
        );
    }

    #[test]
    fn encoded_state_validates() {
        let attrs = encode(
            "prod",
            "main",
            Database {
                namespace: "prod".into(),
                cluster: "main".into(),
                name: "app".into(),
                owner: Some("admin".into()),
                encoding: Some("UTF8".into()),
            },
        );
        assert!(schema().validate(&attrs).is_ok());
    }
}

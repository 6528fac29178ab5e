//! Resource adapters
//!
//! One module per Nimbus resource type. Each adapter declares its schema and
//! identity and translates between attributes and API calls; the shared
//! create/read/update/delete/import glue lives in [`crate::provider`].

use async_trait::async_trait;
use nimbus_client::NimbusClient;
use nimbus_core::provider::ResourceType;
use nimbus_core::resource::Attributes;
use nimbus_core::schema::ResourceSchema;
use thiserror::Error;

pub mod container;
pub mod container_job;
pub mod database;
pub mod database_cluster;
pub mod database_user;
pub mod namespace;
pub mod queue;
pub mod registry;
pub mod volume;

/// Identity of types addressed by namespace and name
pub(crate) const NAMESPACED: &[&str] = &["namespace", "name"];

/// Identity of types nested in a database cluster
pub(crate) const CLUSTER_SCOPED: &[&str] = &["namespace", "cluster", "name"];

#[derive(Debug, Error)]
pub enum HandlerError {
    /// Configuration could not be turned into a request
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] nimbus_client::Error),
}

impl HandlerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HandlerError::Api(e) if e.is_not_found())
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Adapter between one resource type and the Nimbus API
///
/// `key` is the identifier split into its identity segments, so its length
/// always equals `identity().len()`.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn identity(&self) -> &'static [&'static str];

    /// Cross-attribute rules the schema cannot express
    fn validate(&self, _attributes: &Attributes) -> Result<(), String> {
        Ok(())
    }

    /// Rules comparing the last known state with the desired configuration
    fn validate_update(&self, _from: &Attributes, _to: &Attributes) -> Result<(), String> {
        Ok(())
    }

    async fn create(
        &self,
        client: &NimbusClient,
        attributes: &Attributes,
    ) -> HandlerResult<Attributes>;

    async fn read(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<Attributes>;

    async fn update(
        &self,
        client: &NimbusClient,
        key: &[String],
        attributes: &Attributes,
    ) -> HandlerResult<Attributes>;

    async fn delete(&self, client: &NimbusClient, key: &[String]) -> HandlerResult<()>;
}

static HANDLERS: &[&dyn ResourceHandler] = &[
    &namespace::NamespaceResource,
    &volume::VolumeResource,
    &registry::RegistryResource,
    &container::ContainerResource,
    &container_job::ContainerJobResource,
    &database_cluster::DatabaseClusterResource,
    &database::DatabaseResource,
    &database_user::DatabaseUserResource,
    &queue::QueueResource,
];

/// Look up the adapter for a resource type
pub fn handler(resource_type: &str) -> Option<&'static dyn ResourceHandler> {
    HANDLERS.iter().copied().find(|h| h.name() == resource_type)
}

/// All adapters, in registration order
pub fn handlers() -> &'static [&'static dyn ResourceHandler] {
    HANDLERS
}

/// [`ResourceType`] view of an adapter
struct HandlerType(&'static dyn ResourceHandler);

impl ResourceType for HandlerType {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }

    fn identity(&self) -> &'static [&'static str] {
        self.0.identity()
    }
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    HANDLERS
        .iter()
        .map(|h| Box::new(HandlerType(*h)) as Box<dyn ResourceType>)
        .collect()
}

/// Borrow the identity segments as a fixed-size array
pub(crate) fn key_parts<const N: usize>(key: &[String]) -> HandlerResult<[&str; N]> {
    let parts: Vec<&str> = key.iter().map(String::as_str).collect();
    parts.try_into().map_err(|parts: Vec<&str>| {
        HandlerError::Invalid(format!(
            "expected {} identifier segment(s), got {}",
            N,
            parts.len()
        ))
    })
}

/// Encoded state minus the attributes only the API may set
#[cfg(test)]
pub(crate) fn configurable_only(schema: &ResourceSchema, attributes: Attributes) -> Attributes {
    attributes
        .into_iter()
        .filter(|(name, _)| {
            schema
                .attributes
                .get(name)
                .is_some_and(|a| a.is_configurable())
        })
        .collect()
}

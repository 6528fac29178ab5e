//! Nimbus Provider
//!
//! Resource adapters for the Nimbus cloud behind the nimbus-core
//! [`Provider`] contract.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration and environment overrides
//! - `convert` - Attribute reader/writer used by the adapters
//! - `provider` - NimbusProvider and the shared CRUD/import flow
//! - `resources` - One adapter per resource type

pub mod config;
pub mod convert;
pub mod provider;
pub mod resources;

// Re-export main types
pub use config::{ConfigError, ProviderConfig};
pub use provider::{NimbusProvider, validate_resource};
pub use resources::resource_types;

use nimbus_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use nimbus_core::resource::{Resource, ResourceId, State};

impl Provider for NimbusProvider {
    fn name(&self) -> &'static str {
        "nimbus"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let current = current.clone();
        Box::pin(async move { self.read_resource(&current).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, &identifier, &from, to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let import_id = import_id.to_string();
        Box::pin(async move { self.import_resource(id, &import_id).await })
    }
}

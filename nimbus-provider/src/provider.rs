//! Nimbus Provider implementation
//!
//! Shared create/read/update/delete/import flow around the per-type
//! [`ResourceHandler`]s: schema validation, defaults, identifiers, and
//! carrying sensitive values the API never returns.

use log::{info, warn};
use nimbus_client::NimbusClient;
use nimbus_core::diagnostics::{Diagnostic, Diagnostics};
use nimbus_core::differ::find_changed_attributes;
use nimbus_core::identity;
use nimbus_core::provider::{ProviderError, ProviderResult};
use nimbus_core::resource::{Attributes, Resource, ResourceId, State};
use nimbus_core::schema::ResourceSchema;

use crate::config::{ConfigError, ProviderConfig};
use crate::resources::{self, HandlerError, ResourceHandler};

/// Nimbus cloud Provider
#[derive(Debug, Clone)]
pub struct NimbusProvider {
    client: NimbusClient,
}

impl NimbusProvider {
    pub fn new(client: NimbusClient) -> Self {
        Self { client }
    }

    /// Build the API client from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.build_client()?))
    }

    pub fn client(&self) -> &NimbusClient {
        &self.client
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Create a resource and return its state with the composite identifier
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let id = resource.id;
        let handler = lookup(&id)?;
        let schema = handler.schema();
        let desired = prepare(handler, &schema, &id, resource.attributes)?;

        let mut attributes = handler
            .create(&self.client, &desired)
            .await
            .map_err(|e| api_error("create", &id, e))?;
        carry_sensitive(&schema, &mut attributes, &desired, None);

        let identifier = identity::from_attributes(&attributes, handler.identity())
            .or_else(|_| identity::from_attributes(&desired, handler.identity()))
            .map_err(|e| {
                ProviderError::new(format!("created object has no identifier: {}", e))
                    .for_resource(id.clone())
            })?;

        info!("Created {} ({})", id, identifier);
        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    /// Refresh a resource from the API
    ///
    /// A state without identifier, or an object the API no longer knows,
    /// yields `State::not_found`.
    pub async fn read_resource(&self, current: &State) -> ProviderResult<State> {
        let id = current.id.clone();
        let handler = lookup(&id)?;

        let Some(identifier) = current.identifier.as_deref() else {
            return Ok(State::not_found(id));
        };
        let key = split_identifier(handler, &id, identifier)?;

        let mut attributes = match handler.read(&self.client, &key).await {
            Ok(attributes) => attributes,
            Err(e) if e.is_not_found() => {
                warn!("{} ({}) no longer exists", id, identifier);
                return Ok(State::not_found(id));
            }
            Err(e) => return Err(api_error("read", &id, e)),
        };
        carry_sensitive(&handler.schema(), &mut attributes, &current.attributes, None);

        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    /// Update a resource in place
    ///
    /// Changes to force-new attributes are refused; the object must be
    /// replaced instead.
    pub async fn update_resource(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let handler = lookup(&id)?;
        let schema = handler.schema();
        let desired = prepare(handler, &schema, &id, to.attributes)?;

        let replace = replacement_attributes(&schema, &desired, &from.attributes);
        if !replace.is_empty() {
            return Err(ProviderError::new(format!(
                "cannot update in place, these attributes require replacement: {}",
                replace.join(", ")
            ))
            .for_resource(id));
        }
        handler
            .validate_update(&from.attributes, &desired)
            .map_err(|msg| ProviderError::new(msg).for_resource(id.clone()))?;

        let key = split_identifier(handler, &id, identifier)?;
        let mut attributes = handler
            .update(&self.client, &key, &desired)
            .await
            .map_err(|e| api_error("update", &id, e))?;
        carry_sensitive(&schema, &mut attributes, &desired, Some(&from.attributes));

        info!("Updated {} ({})", id, identifier);
        Ok(State::existing(id, attributes).with_identifier(identifier))
    }

    /// Delete a resource; an object that is already gone counts as deleted
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let handler = lookup(id)?;
        let key = split_identifier(handler, id, identifier)?;

        match handler.delete(&self.client, &key).await {
            Ok(()) => {
                info!("Deleted {} ({})", id, identifier);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("{} ({}) was already deleted", id, identifier);
                Ok(())
            }
            Err(e) => Err(api_error("delete", id, e)),
        }
    }

    /// Attach an existing remote object to `id`
    ///
    /// `import_id` is the composite key, e.g. `prod/main/app` for a database.
    pub async fn import_resource(&self, id: ResourceId, import_id: &str) -> ProviderResult<State> {
        let handler = lookup(&id)?;
        let seed = identity::to_attributes(import_id, handler.identity()).map_err(|e| {
            ProviderError::new(format!("invalid import id: {}", e)).for_resource(id.clone())
        })?;

        let state = self
            .read_resource(&State::existing(id.clone(), seed).with_identifier(import_id))
            .await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "cannot import non-existent remote object '{}'",
                import_id
            ))
            .for_resource(id));
        }

        info!("Imported {} ({})", state.id, import_id);
        Ok(state)
    }
}

/// Validate a resource configuration without calling the API
pub fn validate_resource(resource: &Resource) -> Diagnostics {
    let id = &resource.id;
    let Some(handler) = resources::handler(&id.resource_type) else {
        return Diagnostic::error(format!("Unknown resource type '{}'", id.resource_type))
            .for_resource(id.clone())
            .into();
    };

    let schema = handler.schema();
    if let Err(errors) = schema.validate(&resource.attributes) {
        return Diagnostics::from_type_errors(id, &errors);
    }

    let mut attributes = resource.attributes.clone();
    schema.apply_defaults(&mut attributes);
    match handler.validate(&attributes) {
        Ok(()) => Diagnostics::new(),
        Err(msg) => Diagnostic::error("Invalid resource configuration")
            .with_detail(msg)
            .for_resource(id.clone())
            .into(),
    }
}

fn lookup(id: &ResourceId) -> ProviderResult<&'static dyn ResourceHandler> {
    resources::handler(&id.resource_type).ok_or_else(|| {
        ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
            .for_resource(id.clone())
    })
}

/// Schema validation, defaults, then the handler's cross-field rules
fn prepare(
    handler: &dyn ResourceHandler,
    schema: &ResourceSchema,
    id: &ResourceId,
    mut attributes: Attributes,
) -> ProviderResult<Attributes> {
    if let Err(errors) = schema.validate(&attributes) {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(ProviderError::new(format!(
            "invalid configuration: {}",
            messages.join("; ")
        ))
        .for_resource(id.clone()));
    }
    schema.apply_defaults(&mut attributes);
    handler
        .validate(&attributes)
        .map_err(|msg| ProviderError::new(msg).for_resource(id.clone()))?;
    Ok(attributes)
}

fn split_identifier(
    handler: &dyn ResourceHandler,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<Vec<String>> {
    identity::split(identifier, handler.identity())
        .map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))
}

fn api_error(action: &str, id: &ResourceId, err: HandlerError) -> ProviderError {
    ProviderError::new(format!("{} request failed", action))
        .for_resource(id.clone())
        .with_cause(err)
}

/// Force-new attributes whose known value differs from the desired one
fn replacement_attributes(
    schema: &ResourceSchema,
    desired: &Attributes,
    current: &Attributes,
) -> Vec<String> {
    find_changed_attributes(schema, desired, current)
        .into_iter()
        .filter(|name| {
            current.contains_key(name) && schema.attributes.get(name).is_some_and(|a| a.force_new)
        })
        .collect()
}

/// Copy sensitive attributes the API left out of a response
///
/// Values come from `desired`; API-generated ones (e.g. a database user's
/// password) fall back to `previous` when configuration does not set them.
fn carry_sensitive(
    schema: &ResourceSchema,
    attributes: &mut Attributes,
    desired: &Attributes,
    previous: Option<&Attributes>,
) {
    for name in schema.sensitive_attributes() {
        if attributes.contains_key(&name) {
            continue;
        }
        let generated = schema.attributes.get(&name).is_some_and(|a| a.computed);
        let value = desired.get(&name).or_else(|| {
            previous
                .filter(|_| generated)
                .and_then(|previous| previous.get(&name))
        });
        if let Some(value) = value {
            attributes.insert(name, value.clone());
        }
    }
}

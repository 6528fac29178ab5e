//! Host configuration file (`nimbus.json`)
//!
//! ```json
//! {
//!   "provider": { "api_url": "https://api.nimbus.cloud", "project": "acme" },
//!   "backend": { "type": "local", "path": "nimbus.state.json" },
//!   "resources": [
//!     { "type": "namespace", "name": "prod", "attributes": { "name": "prod" } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use nimbus_core::resource::{Attributes, Resource, attributes_from_json};
use nimbus_state::BackendConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "nimbus.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    provider: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    backend: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    resources: Vec<RawResource>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResource {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug)]
pub struct HostConfig {
    /// `provider` block, handed to `ProviderConfig::from_attributes`
    pub provider: Attributes,
    pub backend: BackendConfig,
    /// Resources in file order
    pub resources: Vec<Resource>,
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::parse(&content, base_dir).map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Parse configuration; a relative local state path is resolved against `base_dir`
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, String> {
        let raw: RawConfig =
            serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;

        let mut backend = match &raw.backend {
            Some(object) => BackendConfig::from_json(object).map_err(|e| e.to_string())?,
            None => BackendConfig::local(nimbus_state::backends::LocalBackend::DEFAULT_STATE_FILE),
        };
        if backend.backend_type == "local"
            && let Some(path) = backend.get_string("path")
            && Path::new(path).is_relative()
        {
            let resolved = base_dir.join(path).to_string_lossy().into_owned();
            backend = BackendConfig::local(resolved);
        }

        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(raw.resources.len());
        for raw_resource in raw.resources {
            if !seen.insert((raw_resource.resource_type.clone(), raw_resource.name.clone())) {
                return Err(format!(
                    "Duplicate resource {}.{}",
                    raw_resource.resource_type, raw_resource.name
                ));
            }
            resources.push(
                Resource::new(raw_resource.resource_type, raw_resource.name)
                    .with_attributes(attributes_from_json(&raw_resource.attributes)),
            );
        }

        Ok(Self {
            provider: attributes_from_json(&raw.provider),
            backend,
            resources,
        })
    }
}

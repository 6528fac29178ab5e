//! Differ - Compare desired configuration with the last known state
//!
//! Works on a single resource at a time: decides whether the resource must be
//! created, updated in place, replaced, or left alone.

use std::collections::HashMap;

use crate::resource::{Attributes, Resource, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create,
    /// Resource exists with differences that can be applied in place
    Update { changed_attributes: Vec<String> },
    /// A force-new attribute changed -> the resource must be recreated
    Replace { attributes: Vec<String> },
    /// Resource exists with no differences -> no action needed
    NoChange,
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange)
    }
}

/// Compare desired configuration with the current state
///
/// `desired` should already have schema defaults applied.
pub fn diff(schema: &ResourceSchema, desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create;
    }

    let changed = find_changed_attributes(schema, &desired.attributes, &current.attributes);
    let replace: Vec<String> = changed
        .iter()
        .filter(|name| schema.attributes.get(*name).is_some_and(|a| a.force_new))
        .cloned()
        .collect();

    if !replace.is_empty() {
        Diff::Replace {
            attributes: replace,
        }
    } else if changed.is_empty() {
        Diff::NoChange
    } else {
        Diff::Update {
            changed_attributes: changed,
        }
    }
}

/// Find configurable attributes whose desired value differs from the state
pub fn find_changed_attributes(
    schema: &ResourceSchema,
    desired: &Attributes,
    current: &Attributes,
) -> Vec<String> {
    let mut changed = Vec::new();

    for name in schema.configurable_attributes() {
        let computed = schema.attributes.get(&name).is_some_and(|a| a.computed);
        // Empty collections are never stored in state
        let desired_value = desired.get(&name).filter(|v| !is_empty(v));
        let current_value = current.get(&name).filter(|v| !is_empty(v));
        match (desired_value, current_value) {
            (Some(d), Some(c)) if value_matches(d, c) => {}
            (None, None) => {}
            // Unset in configuration: the API's value stands
            (None, Some(_)) if computed => {}
            _ => changed.push(name),
        }
    }

    changed
}

/// Whether `current` satisfies `desired`
///
/// Objects only compare the keys configuration sets, so values the API fills
/// into nested blocks do not register as drift.
fn value_matches(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Map(d), Value::Map(c)) => map_matches(d, c),
        (Value::List(d), Value::List(c)) => {
            d.len() == c.len() && d.iter().zip(c).all(|(d, c)| value_matches(d, c))
        }
        _ => desired == current,
    }
}

fn map_matches(desired: &HashMap<String, Value>, current: &HashMap<String, Value>) -> bool {
    desired.iter().all(|(k, d)| match current.get(k) {
        Some(c) => value_matches(d, c),
        None => is_empty(d),
    })
}

/// Empty list, or a map holding nothing but empty values
fn is_empty(value: &Value) -> bool {
    match value {
        Value::List(items) => items.is_empty(),
        Value::Map(entries) => entries.values().all(is_empty),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;
    use crate::schema::{AttributeSchema, AttributeType};

    fn schema() -> ResourceSchema {
        ResourceSchema::new("container")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("image", AttributeType::String).required())
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("resources", AttributeType::Map(Box::new(AttributeType::Int)))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
    }

    fn current(attrs: Vec<(&str, Value)>) -> State {
        State::existing(
            ResourceId::new("container", "web"),
            attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn desired() -> Resource {
        Resource::new("container", "web")
            .with_attribute("name", Value::string("web"))
            .with_attribute("image", Value::string("nginx:1.27"))
    }

    #[test]
    fn diff_create_when_not_exists() {
        let state = State::not_found(ResourceId::new("container", "web"));
        assert_eq!(diff(&schema(), &desired(), &state), Diff::Create);
    }

    #[test]
    fn diff_no_change_ignores_computed() {
        let state = current(vec![
            ("name", Value::string("web")),
            ("image", Value::string("nginx:1.27")),
            ("status", Value::string("ready")),
        ]);
        let result = diff(&schema(), &desired(), &state);
        assert_eq!(result, Diff::NoChange);
        assert!(!result.is_change());
    }

    #[test]
    fn diff_update_on_changed_attribute() {
        let state = current(vec![
            ("name", Value::string("web")),
            ("image", Value::string("nginx:1.26")),
        ]);
        assert_eq!(
            diff(&schema(), &desired(), &state),
            Diff::Update {
                changed_attributes: vec!["image".to_string()]
            }
        );
    }

    #[test]
    fn diff_update_when_optional_attribute_removed() {
        let state = current(vec![
            ("name", Value::string("web")),
            ("image", Value::string("nginx:1.27")),
            ("description", Value::string("old")),
        ]);
        assert_eq!(
            diff(&schema(), &desired(), &state),
            Diff::Update {
                changed_attributes: vec!["description".to_string()]
            }
        );
    }

    #[test]
    fn diff_replace_on_force_new() {
        let state = current(vec![
            ("name", Value::string("api")),
            ("image", Value::string("nginx:1.26")),
        ]);
        assert_eq!(
            diff(&schema(), &desired(), &state),
            Diff::Replace {
                attributes: vec!["name".to_string()]
            }
        );
    }

    #[test]
    fn nested_values_filled_by_api_are_not_drift() {
        let mut desired_resources = HashMap::new();
        desired_resources.insert("cpu_millis".to_string(), Value::Int(500));
        let mut current_resources = desired_resources.clone();
        current_resources.insert("memory_mb".to_string(), Value::Int(256));

        let desired = desired().with_attribute("resources", Value::Map(desired_resources));
        let state = current(vec![
            ("name", Value::string("web")),
            ("image", Value::string("nginx:1.27")),
            ("resources", Value::Map(current_resources)),
        ]);
        assert_eq!(diff(&schema(), &desired, &state), Diff::NoChange);
    }

    #[test]
    fn empty_collections_match_absent_state() {
        let mut auto_input = HashMap::new();
        auto_input.insert("triggers".to_string(), Value::List(vec![]));
        let mut scaling = HashMap::new();
        scaling.insert("auto_input".to_string(), Value::Map(auto_input));

        let schema = schema()
            .attribute(AttributeSchema::new(
                "env",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
            .attribute(AttributeSchema::new(
                "command",
                AttributeType::List(Box::new(AttributeType::String)),
            ))
            .attribute(AttributeSchema::new(
                "scaling",
                AttributeType::Map(Box::new(AttributeType::Map(Box::new(AttributeType::String)))),
            ));
        let desired = desired()
            .with_attribute("env", Value::Map(HashMap::new()))
            .with_attribute("command", Value::List(vec![]))
            .with_attribute("scaling", Value::Map(scaling))
            .with_attribute("resources", Value::Map(HashMap::new()));
        let state = current(vec![
            ("name", Value::string("web")),
            ("image", Value::string("nginx:1.27")),
        ]);
        assert_eq!(diff(&schema, &desired, &state), Diff::NoChange);
    }

    #[test]
    fn emptied_collection_is_a_change() {
        let schema = schema().attribute(AttributeSchema::new(
            "env",
            AttributeType::Map(Box::new(AttributeType::String)),
        ));
        let mut env = HashMap::new();
        env.insert("MODE".to_string(), Value::string("prod"));
        let desired = desired().with_attribute("env", Value::Map(HashMap::new()));
        let state = current(vec![
            ("name", Value::string("web")),
            ("image", Value::string("nginx:1.27")),
            ("env", Value::Map(env)),
        ]);
        assert_eq!(
            diff(&schema, &desired, &state),
            Diff::Update {
                changed_attributes: vec!["env".to_string()]
            }
        );
    }
}

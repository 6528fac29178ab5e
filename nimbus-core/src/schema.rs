//! Schema - Define type schemas for resources
//!
//! Each resource type declares a schema describing which attributes the
//! configuration may set, which ones the API computes, and how values are
//! typed. Validation collects every problem instead of stopping at the first.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map with string keys
    Map(Box<AttributeType>),
    /// Nested block with its own attribute schemas
    Object(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Object(fields), Value::Map(map)) => {
                for field in fields {
                    if field.required && !map.contains_key(&field.name) {
                        return Err(TypeError::MissingRequired {
                            name: field.name.clone(),
                        });
                    }
                }
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    let Some(field) = fields.iter().find(|f| &f.name == key) else {
                        return Err(TypeError::UnknownAttribute { name: key.clone() });
                    };
                    if !field.is_configurable() {
                        return Err(TypeError::ReadOnlyAttribute { name: key.clone() });
                    }
                    field
                        .attr_type
                        .validate(&map[key])
                        .map_err(|e| TypeError::ObjectFieldError {
                            field: key.clone(),
                            inner: Box::new(e),
                        })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Object(_) => "Object".to_string(),
        }
    }

    /// Fill defaults inside nested objects
    fn apply_nested_defaults(&self, value: &mut Value) {
        match (self, value) {
            (AttributeType::Object(fields), Value::Map(map)) => apply_defaults_to(fields, map),
            (AttributeType::List(inner), Value::List(items)) => {
                for item in items {
                    inner.apply_nested_defaults(item);
                }
            }
            _ => {}
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeType::Enum(variants) => serde_json::json!({ "enum": variants }),
            AttributeType::Custom { name, base, .. } => {
                serde_json::json!({ "custom": name, "base": base.to_json() })
            }
            AttributeType::List(inner) => serde_json::json!({ "list": inner.to_json() }),
            AttributeType::Map(inner) => serde_json::json!({ "map": inner.to_json() }),
            AttributeType::Object(fields) => serde_json::json!({
                "object": fields.iter().map(AttributeSchema::to_json).collect::<Vec<_>>()
            }),
            other => serde_json::Value::String(other.type_name().to_lowercase()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed by the API and cannot be set")]
    ReadOnlyAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Field '{field}': {inner}")]
    ObjectFieldError { field: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

impl TypeError {
    /// Attribute path the error refers to (e.g. `scaling.auto_input.triggers[0].type`)
    pub fn path(&self) -> Option<String> {
        match self {
            TypeError::MissingRequired { name }
            | TypeError::UnknownAttribute { name }
            | TypeError::ReadOnlyAttribute { name } => Some(name.clone()),
            TypeError::AttributeError { name, inner }
            | TypeError::ObjectFieldError { field: name, inner } => Some(match inner.path() {
                Some(rest) if rest.starts_with('[') => format!("{}{}", name, rest),
                Some(rest) => format!("{}.{}", name, rest),
                None => name.clone(),
            }),
            TypeError::ListItemError { index, inner } => Some(match inner.path() {
                Some(rest) => format!("[{}].{}", index, rest),
                None => format!("[{}]", index),
            }),
            TypeError::MapValueError { key, inner } => Some(match inner.path() {
                Some(rest) => format!("[\"{}\"].{}", key, rest),
                None => format!("[\"{}\"]", key),
            }),
            _ => None,
        }
    }

    /// The innermost error, without the path wrappers
    pub fn root_cause(&self) -> &TypeError {
        match self {
            TypeError::AttributeError { inner, .. }
            | TypeError::ObjectFieldError { inner, .. }
            | TypeError::ListItemError { inner, .. }
            | TypeError::MapValueError { inner, .. } => inner.root_cause(),
            other => other,
        }
    }
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    /// Must be present in configuration
    pub required: bool,
    /// May be present in configuration
    pub optional: bool,
    /// Set by the API
    pub computed: bool,
    /// Never printed; the API does not return it on read
    pub sensitive: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    /// New optional attribute
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: true,
            computed: false,
            sensitive: false,
            force_new: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Read-only attribute set by the API
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self.required = false;
        self
    }

    /// Attribute the configuration may set, otherwise chosen by the API
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.optional = true;
        self.required = false;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Whether configuration may set this attribute
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".into(), self.name.clone().into());
        obj.insert("type".into(), self.attr_type.to_json());
        obj.insert("required".into(), self.required.into());
        obj.insert("optional".into(), self.optional.into());
        obj.insert("computed".into(), self.computed.into());
        if self.sensitive {
            obj.insert("sensitive".into(), true.into());
        }
        if self.force_new {
            obj.insert("force_new".into(), true.into());
        }
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.to_json());
        }
        if let Some(desc) = &self.description {
            obj.insert("description".into(), desc.clone().into());
        }
        serde_json::Value::Object(obj)
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate configuration attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        for name in names {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        let mut keys: Vec<&String> = attributes.keys().collect();
        keys.sort();
        for name in keys {
            match self.attributes.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if !schema.is_configurable() => {
                    errors.push(TypeError::ReadOnlyAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(&attributes[name]) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for attributes absent from configuration
    pub fn apply_defaults(&self, attributes: &mut Attributes) {
        for schema in self.attributes.values() {
            if let Some(value) = attributes.get_mut(&schema.name) {
                schema.attr_type.apply_nested_defaults(value);
            } else if let Some(default) = &schema.default {
                attributes.insert(schema.name.clone(), default.clone());
            }
        }
    }

    /// Names of attributes matching a predicate, sorted
    fn names_where(&self, pred: impl Fn(&AttributeSchema) -> bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .attributes
            .values()
            .filter(|a| pred(*a))
            .map(|a| a.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn sensitive_attributes(&self) -> Vec<String> {
        self.names_where(|a| a.sensitive)
    }

    pub fn force_new_attributes(&self) -> Vec<String> {
        self.names_where(|a| a.force_new)
    }

    pub fn configurable_attributes(&self) -> Vec<String> {
        self.names_where(AttributeSchema::is_configurable)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut attrs: Vec<&AttributeSchema> = self.attributes.values().collect();
        attrs.sort_by(|a, b| a.name.cmp(&b.name));
        serde_json::json!({
            "resource_type": self.resource_type,
            "description": self.description,
            "attributes": attrs.into_iter().map(AttributeSchema::to_json).collect::<Vec<_>>(),
        })
    }
}

fn apply_defaults_to(fields: &[AttributeSchema], map: &mut HashMap<String, Value>) {
    for field in fields {
        if let Some(value) = map.get_mut(&field.name) {
            field.attr_type.apply_nested_defaults(value);
        } else if let Some(default) = &field.default {
            map.insert(field.name.clone(), default.clone());
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n > 0 => Ok(()),
                Value::Int(_) => Err("Value must be positive".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Integer greater than or equal to zero
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n >= 0 => Ok(()),
                Value::Int(_) => Err("Value must not be negative".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// TCP port (1-65535)
    pub fn port() -> AttributeType {
        AttributeType::Custom {
            name: "Port".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (1..=65535).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Port {} out of range 1-65535", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Name of a Nimbus object (namespace, container, cluster, ...)
    pub fn resource_name() -> AttributeType {
        AttributeType::Custom {
            name: "ResourceName".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_resource_name(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Absolute filesystem path
    pub fn absolute_path() -> AttributeType {
        AttributeType::Custom {
            name: "AbsolutePath".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if s.starts_with('/') => Ok(()),
                Value::String(s) => Err(format!("Path '{}' must be absolute", s)),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Queue message retention in seconds (1 minute to 14 days)
    pub fn retention_seconds() -> AttributeType {
        AttributeType::Custom {
            name: "RetentionSeconds".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (60..=1_209_600).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Retention {} out of range 60-1209600", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Queue visibility timeout in seconds (up to 12 hours)
    pub fn visibility_timeout_seconds() -> AttributeType {
        AttributeType::Custom {
            name: "VisibilityTimeoutSeconds".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (0..=43_200).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Visibility timeout {} out of range 0-43200", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Five-field cron expression (`minute hour day-of-month month day-of-week`)
    pub fn cron_expression() -> AttributeType {
        AttributeType::Custom {
            name: "CronExpression".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_cron_expression(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Map of string values
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// List of string values
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    /// Enum from string slices
    pub fn one_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|s| s.to_string()).collect())
    }
}

/// Validate a Nimbus object name
///
/// 1-63 characters of lowercase ASCII letters, digits and `-`, starting with
/// a letter and not ending with `-`. Valid names never contain the identifier
/// separator.
pub fn validate_resource_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > 63 {
        return Err(format!(
            "Invalid name '{}': must be 1-63 characters long",
            name
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(format!(
            "Invalid name '{}': must start with a lowercase letter",
            name
        ));
    }
    if name.ends_with('-') {
        return Err(format!("Invalid name '{}': must not end with '-'", name));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(format!(
            "Invalid name '{}': character '{}' is not allowed",
            name, c
        ));
    }
    Ok(())
}

/// Validate a five-field cron expression
///
/// Only the shape is checked: five whitespace-separated fields built from
/// digits, `*`, `,`, `-` and `/`.
pub fn validate_cron_expression(expr: &str) -> Result<(), String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!(
            "Invalid schedule '{}': expected 5 fields, got {}",
            expr,
            fields.len()
        ));
    }
    for field in fields {
        if !field
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '-' | '/'))
        {
            return Err(format!(
                "Invalid schedule '{}': field '{}' is not a cron field",
                expr, field
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_expression_shape() {
        assert!(validate_cron_expression("*/15 2 * * 1-5").is_ok());
        assert!(validate_cron_expression("0 0 1,15 * *").is_ok());
        assert!(validate_cron_expression("0 0 * *").is_err());
        assert!(validate_cron_expression("0 0 * * MON").is_err());
    }

    #[test]
    fn queue_ranges() {
        let retention = types::retention_seconds();
        assert!(retention.validate(&Value::Int(345_600)).is_ok());
        assert!(retention.validate(&Value::Int(59)).is_err());
        let visibility = types::visibility_timeout_seconds();
        assert!(visibility.validate(&Value::Int(0)).is_ok());
        assert!(visibility.validate(&Value::Int(43_201)).is_err());
    }

    fn scaling_type() -> AttributeType {
        AttributeType::Object(vec![
            AttributeSchema::new("min_instances", types::non_negative_int()),
            AttributeSchema::new(
                "triggers",
                AttributeType::List(Box::new(AttributeType::Object(vec![
                    AttributeSchema::new("type", types::one_of(&["cpu", "memory"])).required(),
                    AttributeSchema::new("threshold", types::positive_int()).required(),
                ]))),
            ),
        ])
    }

    fn trigger(kind: &str, threshold: i64) -> Value {
        let mut map = HashMap::new();
        map.insert("type".to_string(), Value::string(kind));
        map.insert("threshold".to_string(), Value::Int(threshold));
        Value::Map(map)
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = types::one_of(&["a", "b"]);
        assert!(t.validate(&Value::string("a")).is_ok());
        assert!(t.validate(&Value::string("c")).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::string("1")).is_err());
    }

    #[test]
    fn validate_port() {
        let t = types::port();
        assert!(t.validate(&Value::Int(8080)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(70000)).is_err());
    }

    #[test]
    fn validate_resource_names() {
        assert!(validate_resource_name("web").is_ok());
        assert!(validate_resource_name("web-01").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("Web").is_err());
        assert!(validate_resource_name("1web").is_err());
        assert!(validate_resource_name("web-").is_err());
        assert!(validate_resource_name("prod/web").is_err());
        assert!(validate_resource_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn validate_nested_object() {
        let t = scaling_type();
        let mut map = HashMap::new();
        map.insert("min_instances".to_string(), Value::Int(0));
        map.insert(
            "triggers".to_string(),
            Value::List(vec![trigger("cpu", 80)]),
        );
        assert!(t.validate(&Value::Map(map)).is_ok());
    }

    #[test]
    fn nested_error_path() {
        let schema = ResourceSchema::new("container")
            .attribute(AttributeSchema::new("scaling", scaling_type()));

        let mut scaling = HashMap::new();
        scaling.insert(
            "triggers".to_string(),
            Value::List(vec![trigger("cpu", 80), trigger("disk", 10)]),
        );
        let mut attrs = HashMap::new();
        attrs.insert("scaling".to_string(), Value::Map(scaling));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path().as_deref(), Some("scaling.triggers[1].type"));
        assert!(matches!(
            errors[0].root_cause(),
            TypeError::InvalidEnumVariant { .. }
        ));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("volume")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert!(matches!(&errors[0], TypeError::MissingRequired { name } if name == "name"));
    }

    #[test]
    fn unknown_and_read_only_attributes_rejected() {
        let schema = ResourceSchema::new("volume")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed());

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::string("data"));
        attrs.insert("status".to_string(), Value::string("ready"));
        attrs.insert("colour".to_string(), Value::string("blue"));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], TypeError::UnknownAttribute { name } if name == "colour"));
        assert!(matches!(&errors[1], TypeError::ReadOnlyAttribute { name } if name == "status"));
    }

    #[test]
    fn optional_computed_attribute_is_configurable() {
        let schema = ResourceSchema::new("database_user").attribute(
            AttributeSchema::new("password", AttributeType::String)
                .optional_computed()
                .sensitive(),
        );

        let mut attrs = HashMap::new();
        attrs.insert("password".to_string(), Value::string("s3cret"));
        assert!(schema.validate(&attrs).is_ok());
        assert_eq!(schema.sensitive_attributes(), vec!["password".to_string()]);
    }

    #[test]
    fn apply_defaults_fills_nested_fields() {
        let mount = AttributeType::Object(vec![
            AttributeSchema::new("volume", AttributeType::String).required(),
            AttributeSchema::new("read_only", AttributeType::Bool)
                .with_default(Value::Bool(false)),
        ]);
        let schema = ResourceSchema::new("container")
            .attribute(
                AttributeSchema::new("privacy", types::one_of(&["public", "private"]))
                    .with_default(Value::string("public")),
            )
            .attribute(AttributeSchema::new(
                "volume_mounts",
                AttributeType::List(Box::new(mount)),
            ));

        let mut item = HashMap::new();
        item.insert("volume".to_string(), Value::string("data"));
        let mut attrs = HashMap::new();
        attrs.insert(
            "volume_mounts".to_string(),
            Value::List(vec![Value::Map(item)]),
        );

        schema.apply_defaults(&mut attrs);

        assert_eq!(attrs.get("privacy"), Some(&Value::string("public")));
        let mounts = attrs["volume_mounts"].as_list().unwrap();
        assert_eq!(
            mounts[0].as_map().unwrap().get("read_only"),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn schema_to_json_lists_attributes_sorted() {
        let schema = ResourceSchema::new("namespace")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("description", AttributeType::String));

        let json = schema.to_json();
        let attrs = json["attributes"].as_array().unwrap();
        assert_eq!(attrs[0]["name"], "description");
        assert_eq!(attrs[1]["name"], "name");
        assert_eq!(attrs[1]["required"], true);
    }
}

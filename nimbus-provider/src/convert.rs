//! Attribute conversion helpers
//!
//! [`AttributeReader`] decodes validated configuration into request fields;
//! [`AttributeWriter`] encodes API responses back into attributes.

use std::collections::HashMap;

use nimbus_core::resource::{Attributes, Value};

use crate::resources::{HandlerError, HandlerResult};

/// Typed access to a (possibly nested) attribute map
pub struct AttributeReader<'a> {
    attributes: &'a HashMap<String, Value>,
    path: String,
}

impl<'a> AttributeReader<'a> {
    pub fn new(attributes: &'a Attributes) -> Self {
        Self {
            attributes,
            path: String::new(),
        }
    }

    fn nested(attributes: &'a HashMap<String, Value>, path: String) -> Self {
        Self { attributes, path }
    }

    fn path_of(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn mismatch(&self, name: &str, expected: &str) -> HandlerError {
        HandlerError::Invalid(format!(
            "attribute '{}' must be {}",
            self.path_of(name),
            expected
        ))
    }

    fn missing(&self, name: &str) -> HandlerError {
        HandlerError::Invalid(format!("attribute '{}' is required", self.path_of(name)))
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn string(&self, name: &str) -> HandlerResult<String> {
        self.opt_string(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_string(&self, name: &str) -> HandlerResult<Option<String>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.mismatch(name, "a string")),
        }
    }

    pub fn int(&self, name: &str) -> HandlerResult<i64> {
        self.opt_int(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_int(&self, name: &str) -> HandlerResult<Option<i64>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(_) => Err(self.mismatch(name, "an integer")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> HandlerResult<bool> {
        match self.attributes.get(name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.mismatch(name, "a boolean")),
        }
    }

    pub fn opt_string_list(&self, name: &str) -> HandlerResult<Option<Vec<String>>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::List(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.mismatch(name, "a list of strings"))
                })
                .collect::<HandlerResult<Vec<_>>>()
                .map(Some),
            Some(_) => Err(self.mismatch(name, "a list of strings")),
        }
    }

    pub fn opt_string_map(&self, name: &str) -> HandlerResult<Option<HashMap<String, String>>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Map(map)) => map
                .iter()
                .map(|(k, v)| {
                    v.as_str()
                        .map(|s| (k.clone(), s.to_string()))
                        .ok_or_else(|| self.mismatch(name, "a map of strings"))
                })
                .collect::<HandlerResult<HashMap<_, _>>>()
                .map(Some),
            Some(_) => Err(self.mismatch(name, "a map of strings")),
        }
    }

    /// Nested object block
    pub fn opt_object(&self, name: &str) -> HandlerResult<Option<AttributeReader<'a>>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Map(map)) => Ok(Some(AttributeReader::nested(map, self.path_of(name)))),
            Some(_) => Err(self.mismatch(name, "an object")),
        }
    }

    /// List of object blocks; absent means empty
    pub fn objects(&self, name: &str) -> HandlerResult<Vec<AttributeReader<'a>>> {
        match self.attributes.get(name) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Map(map) => Ok(AttributeReader::nested(
                        map,
                        format!("{}[{}]", self.path_of(name), i),
                    )),
                    _ => Err(self.mismatch(name, "a list of objects")),
                })
                .collect(),
            Some(_) => Err(self.mismatch(name, "a list of objects")),
        }
    }
}

/// Builder for attributes encoded from an API response
///
/// Absent optionals and empty collections are left out so they compare equal
/// to an unset configuration attribute.
#[derive(Debug, Default)]
pub struct AttributeWriter {
    attributes: Attributes,
}

impl AttributeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.to_string(), Value::String(value.into()));
        self
    }

    pub fn opt_string(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.string(name, v),
            None => self,
        }
    }

    pub fn int(mut self, name: &str, value: i64) -> Self {
        self.attributes.insert(name.to_string(), Value::Int(value));
        self
    }

    pub fn opt_int(self, name: &str, value: Option<i64>) -> Self {
        match value {
            Some(v) => self.int(name, v),
            None => self,
        }
    }

    pub fn bool(mut self, name: &str, value: bool) -> Self {
        self.attributes.insert(name.to_string(), Value::Bool(value));
        self
    }

    pub fn string_list(mut self, name: &str, values: &[String]) -> Self {
        if !values.is_empty() {
            self.attributes.insert(
                name.to_string(),
                Value::List(values.iter().cloned().map(Value::String).collect()),
            );
        }
        self
    }

    pub fn string_map(mut self, name: &str, values: &HashMap<String, String>) -> Self {
        if !values.is_empty() {
            self.attributes.insert(
                name.to_string(),
                Value::Map(
                    values
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
        }
        self
    }

    /// Nested object block; skipped when it has no attributes
    pub fn object(mut self, name: &str, value: AttributeWriter) -> Self {
        if !value.attributes.is_empty() {
            self.attributes
                .insert(name.to_string(), Value::Map(value.attributes));
        }
        self
    }

    pub fn objects(mut self, name: &str, values: Vec<AttributeWriter>) -> Self {
        if !values.is_empty() {
            self.attributes.insert(
                name.to_string(),
                Value::List(
                    values
                        .into_iter()
                        .map(|w| Value::Map(w.attributes))
                        .collect(),
                ),
            );
        }
        self
    }

    pub fn build(self) -> Attributes {
        self.attributes
    }
}

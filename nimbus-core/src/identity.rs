//! Identity - Composite resource identifiers
//!
//! Nimbus objects are addressed by the names of their parents and their own
//! name joined with `/` (e.g. `prod/main/app` for a database). The joined
//! string is both the state identifier and the import key.

use thiserror::Error;

use crate::resource::{Attributes, Value};

/// Separator between identifier segments
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identifier segment {index} is empty")]
    EmptySegment { index: usize },

    #[error("identifier segment '{segment}' must not contain '/'")]
    SeparatorInSegment { segment: String },

    #[error(
        "unexpected identifier format '{id}': expected {expected} segment(s) like '{}'",
        example.join("/")
    )]
    WrongArity {
        id: String,
        expected: usize,
        example: Vec<String>,
    },

    #[error("attribute '{0}' is required to build the identifier")]
    MissingAttribute(String),
}

/// Join identifier segments
pub fn join<S: AsRef<str>>(parts: &[S]) -> Result<String, IdentityError> {
    for (index, part) in parts.iter().enumerate() {
        let part = part.as_ref();
        if part.is_empty() {
            return Err(IdentityError::EmptySegment { index });
        }
        if part.contains(SEPARATOR) {
            return Err(IdentityError::SeparatorInSegment {
                segment: part.to_string(),
            });
        }
    }
    Ok(parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<&str>>()
        .join("/"))
}

/// Split an identifier into exactly `fields.len()` non-empty segments
///
/// `fields` names the segments and is only used to render the error message.
pub fn split(id: &str, fields: &[&str]) -> Result<Vec<String>, IdentityError> {
    let segments: Vec<&str> = id.split(SEPARATOR).collect();
    if segments.len() != fields.len() || segments.iter().any(|s| s.is_empty()) {
        return Err(IdentityError::WrongArity {
            id: id.to_string(),
            expected: fields.len(),
            example: fields.iter().map(|f| format!("<{}>", f)).collect(),
        });
    }
    Ok(segments.into_iter().map(str::to_string).collect())
}

/// Build an identifier from the named string attributes
pub fn from_attributes(attributes: &Attributes, fields: &[&str]) -> Result<String, IdentityError> {
    let parts = fields
        .iter()
        .map(|field| {
            attributes
                .get(*field)
                .and_then(Value::as_str)
                .ok_or_else(|| IdentityError::MissingAttribute(field.to_string()))
        })
        .collect::<Result<Vec<&str>, _>>()?;
    join(&parts)
}

/// Split an identifier and return the segments as string attributes
pub fn to_attributes(id: &str, fields: &[&str]) -> Result<Attributes, IdentityError> {
    let segments = split(id, fields)?;
    Ok(fields
        .iter()
        .zip(segments)
        .map(|(field, segment)| (field.to_string(), Value::String(segment)))
        .collect())
}

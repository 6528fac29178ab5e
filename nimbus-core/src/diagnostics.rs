//! Diagnostics - Structured errors and warnings reported to the operator
//!
//! Every failure surfaced by the provider ends up as a [`Diagnostic`]. The
//! summary names the operation that failed; the detail carries the underlying
//! error text verbatim.

use std::fmt;

use crate::provider::ProviderError;
use crate::resource::ResourceId;
use crate::schema::TypeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: Option<String>,
    /// Resource the diagnostic refers to
    pub resource: Option<ResourceId>,
    /// Attribute path (e.g. `scaling.min_instances`)
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            resource: None,
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource = Some(id);
        self
    }

    pub fn at_attribute(mut self, path: impl Into<String>) -> Self {
        self.attribute = Some(path.into());
        self
    }

    /// Diagnostic for a failed provider operation
    ///
    /// `summary` describes the operation (e.g. "Error creating container");
    /// the error chain becomes the detail.
    pub fn from_provider_error(summary: impl Into<String>, err: &ProviderError) -> Self {
        let mut detail = err.message.clone();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        let mut diag = Self::error(summary).with_detail(detail);
        diag.resource = err.resource_id.clone();
        diag
    }

    /// Diagnostic for an invalid configuration attribute
    pub fn from_type_error(err: &TypeError) -> Self {
        let diag = Self::error("Invalid attribute value").with_detail(err.root_cause().to_string());
        match err.path() {
            Some(path) => diag.at_attribute(path),
            None => diag,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(id) = &self.resource {
            write!(f, "\n  with {}", id)?;
            if let Some(attr) = &self.attribute {
                write!(f, ".{}", attr)?;
            }
        } else if let Some(attr) = &self.attribute {
            write!(f, "\n  on {}", attr)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\n  {}", detail)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// One diagnostic per schema validation error
    pub fn from_type_errors(id: &ResourceId, errors: &[TypeError]) -> Self {
        Self {
            items: errors
                .iter()
                .map(|e| Diagnostic::from_type_error(e).for_resource(id.clone()))
                .collect(),
        }
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            items: vec![diagnostic],
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

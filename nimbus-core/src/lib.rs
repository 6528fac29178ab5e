//! Nimbus Core
//!
//! Resource model, attribute schemas and the provider contract shared by the
//! Nimbus provider, its state store and the CLI host.

pub mod diagnostics;
pub mod differ;
pub mod identity;
pub mod provider;
pub mod resource;
pub mod schema;

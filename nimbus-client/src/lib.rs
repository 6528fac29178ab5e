//! # nimbus-client
//!
//! Asynchronous client for the Nimbus cloud REST API.
//!
//! ## Modules
//!
//! - [`client`] - HTTP plumbing, authentication and retry policy
//! - [`error`] - Error type and HTTP status mapping
//! - [`namespaces`] - Namespaces
//! - [`storage`] - Volumes and container registries
//! - [`containers`] - Containers and container jobs
//! - [`databases`] - Database clusters, databases and database users
//! - [`queues`] - Message queues

#![deny(missing_docs)]

pub mod client;
pub mod containers;
pub mod databases;
pub mod error;
pub mod namespaces;
pub mod queues;
pub mod storage;

pub use client::{NimbusClient, NimbusClientBuilder, RetryPolicy};
pub use error::{Error, Result};

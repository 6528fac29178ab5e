//! Nimbus State Management
//!
//! Persists the resources managed by the Nimbus provider host together with
//! their composite identifiers, and guards mutating commands with a lock.
//!
//! # Overview
//!
//! - **StateFile**: every managed resource with its identifier and attributes
//! - **StateBackend**: storage trait; `local` keeps a JSON file on disk
//! - **LockInfo**: who holds the state lock and until when
//!
//! # Example
//!
//! ```ignore
//! use nimbus_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local("nimbus.state.json")).await?;
//!
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... create, update or delete resources ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

// Re-export main types for convenience
pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::create_backend;
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};

//! Remote Store Layer
//!
//! This module handles all interactions with the DealCanvas REST API:
//!
//! - `RemoteStore` - async trait over every endpoint the core consumes
//! - `HttpStore` - reqwest-based JSON client with bearer authentication
//! - `InMemoryStore` - in-process stand-in with a call log and failure injection
//!
//! Authentication itself (login, token refresh) is outside this crate; the
//! store only carries the bearer credential it is given.

mod error;
mod http_store;
mod memory_store;
mod remote_store;

pub use error::{StoreError, StoreResult};
pub use http_store::HttpStore;
pub use memory_store::{InMemoryStore, StoreCall, StoreOperation};
pub use remote_store::RemoteStore;

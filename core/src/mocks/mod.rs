//! Mock storage implementations for testing.
//!
//! This module provides in-memory and always-failing implementations of
//! [`CarolStorage`](crate::storage::CarolStorage) for use in unit and
//! integration tests.

pub mod failing;
pub mod memory;

pub use failing::FailingStorage;
pub use memory::InMemoryStorage;

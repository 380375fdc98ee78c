//! [`CarolStorage`](crate::storage::CarolStorage) implementations that live in
//! the core crate.
//!
//! The PostgreSQL store lives in its own crate.

mod file;
pub(crate) mod table;

pub use file::JsonFileStore;

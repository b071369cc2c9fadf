//! Backend implementations of [`DocumentStore`](crate::store::DocumentStore).
//!
//! # Implementing a Backend
//!
//! 1. Create a store struct (e.g., `PostgresStore`)
//! 2. Implement `find_all`, `delete_all`, `insert_all` and `replace_one`
//! 3. Override `replace_all` if the backend can swap a collection atomically
//! 4. Override `ensure_collection` and `close` if the backend holds schema or connections

pub mod file;
pub mod memory;
pub mod postgres;

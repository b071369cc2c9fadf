//! Content migration - deduplicate embedded content identifiers
//!
//! Finds `subContentId` values that occur more than once across a document
//! collection and rewrites them with fresh identifiers, then swaps the
//! collection contents in the backing store.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

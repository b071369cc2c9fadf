//! Domain models for content documents and their serialized corpus.

mod corpus;
mod document;
pub mod extended;

pub use corpus::Corpus;
pub use document::{Document, ID_FIELD};
pub use extended::ObjectId;

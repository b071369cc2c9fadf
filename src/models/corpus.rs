//! The serialized text form of an ordered document sequence.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::Document;

/// Serialized documents, processed as one text blob.
///
/// A collection corpus is a JSON array; a single-document corpus is a JSON
/// object. Output is compact with canonically ordered keys, so parsing and
/// re-serializing a corpus produced here yields identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus(String);

impl Corpus {
    /// Serializes an ordered document sequence.
    pub fn serialize(documents: &[Document]) -> Result<Self, AppError> {
        Ok(Self(serde_json::to_string(documents)?))
    }

    /// Serializes a single document.
    pub fn serialize_one(document: &Document) -> Result<Self, AppError> {
        Ok(Self(serde_json::to_string(document)?))
    }

    /// Wraps already-serialized text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Parses a collection corpus back into documents.
    pub fn parse(&self) -> Result<Vec<Document>, AppError> {
        let values: Vec<JsonValue> = serde_json::from_str(&self.0)?;
        values.into_iter().map(Document::from_value).collect()
    }

    /// Parses a single-document corpus.
    pub fn parse_one(&self) -> Result<Document, AppError> {
        Document::from_value(serde_json::from_str(&self.0)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, the unit the replacement invariant is stated in.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

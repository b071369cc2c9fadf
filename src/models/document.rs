//! Document model: a JSON object whose `_id` field is its store identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;
use crate::models::extended::ObjectId;

/// Name of the field holding a document's store-assigned key.
pub const ID_FIELD: &str = "_id";

/// A content document as stored in a collection.
///
/// Documents are arbitrarily nested JSON objects. Extended scalar types
/// (object ids, dates, binary) are carried in canonical Extended JSON form,
/// see [`crate::models::extended`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, JsonValue>);

impl Document {
    /// Creates a document from its top-level fields.
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value into a document.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotAnObject`] if the value is not a JSON object.
    pub fn from_value(value: JsonValue) -> Result<Self, AppError> {
        match value {
            JsonValue::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::NotAnObject(truncate(&other.to_string(), 64))),
        }
    }

    /// Returns the document's identity, if it has one.
    pub fn id(&self) -> Option<&JsonValue> {
        self.0.get(ID_FIELD)
    }

    /// Assigns a fresh [`ObjectId`] if the document has no `_id`.
    pub fn ensure_id(&mut self) {
        if !self.0.contains_key(ID_FIELD) {
            self.0
                .insert(ID_FIELD.to_string(), ObjectId::new().into());
        }
    }

    /// Returns a top-level field.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns the top-level fields.
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Consumes the document and returns it as a JSON value.
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

impl TryFrom<JsonValue> for Document {
    type Error = AppError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Document> for JsonValue {
    fn from(document: Document) -> Self {
        document.into_value()
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

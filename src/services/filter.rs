//! Selection of documents by the content library they hold.
//!
//! A document is selected when its `metadata.mainLibrary` starts with the
//! configured prefix, or when it is one of the container libraries below and
//! embeds content whose library starts with the prefix. Paths descend into
//! arrays at every step, so `content.content.library` reaches the library of
//! every item in a `content` list.

use serde_json::Value as JsonValue;

use crate::models::Document;

/// Container libraries and the path to the library of their embedded content.
const CONTAINERS: &[(&str, &[&str])] = &[
    ("H5P.Column", &["parameters", "content", "content", "library"]),
    (
        "H5P.InteractiveBook",
        &["parameters", "chapters", "params", "content", "content", "library"],
    ),
    (
        "H5P.BranchingScenario",
        &["parameters", "branchingScenario", "content", "type", "library"],
    ),
];

/// Selects documents whose main or embedded library starts with a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFilter {
    prefix: String,
}

impl LibraryFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, document: &Document) -> bool {
        let Some(main_library) = document
            .get("metadata")
            .and_then(|metadata| metadata.get("mainLibrary"))
            .and_then(JsonValue::as_str)
        else {
            return false;
        };

        if main_library.starts_with(&self.prefix) {
            return true;
        }

        CONTAINERS
            .iter()
            .filter(|(container, _)| *container == main_library)
            .any(|(_, path)| {
                let Some((first, rest)) = path.split_first() else {
                    return false;
                };
                let mut found = Vec::new();
                if let Some(value) = document.get(first) {
                    collect(value, rest, &mut found);
                }
                found
                    .iter()
                    .filter_map(|value| value.as_str())
                    .any(|library| library.starts_with(&self.prefix))
            })
    }
}

/// Gathers every value reachable through `path`, descending into arrays.
fn collect<'a>(value: &'a JsonValue, path: &[&str], found: &mut Vec<&'a JsonValue>) {
    if let JsonValue::Array(items) = value {
        for item in items {
            collect(item, path, found);
        }
        return;
    }
    match path.split_first() {
        None => found.push(value),
        Some((key, rest)) => {
            if let Some(child) = value.get(key) {
                collect(child, rest, found);
            }
        }
    }
}

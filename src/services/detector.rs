//! Duplicate identifier detection over serialized corpus text.

use std::collections::HashMap;

use regex::Regex;

use crate::error::AppError;

/// Reports identifier values that occur more than once in a corpus.
pub trait DetectDuplicates: Send + Sync {
    /// Returns every value occurring at least twice, in first-seen order.
    fn get_duplicates(&self, corpus: &str) -> Vec<String>;
}

/// Matches `"<field>" : "<value>"` with `<value>` drawn from `[0-9a-z-]`.
///
/// Matching is syntactic: the field is found at any nesting depth, any
/// number of times, without parsing the surrounding document.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    field: String,
    pattern: Regex,
}

impl DuplicateDetector {
    /// Creates a detector for the given field name (matched literally).
    pub fn new(field: &str) -> Result<Self, AppError> {
        let pattern = Regex::new(&format!(
            r#""{}"\s?:\s?"([0-9a-z-]+)""#,
            regex::escape(field)
        ))?;

        Ok(Self {
            field: field.to_string(),
            pattern,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl DetectDuplicates for DuplicateDetector {
    fn get_duplicates(&self, corpus: &str) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut first_seen = Vec::new();

        for captures in self.pattern.captures_iter(corpus) {
            let Some(value) = captures.get(1) else {
                continue;
            };
            let count = counts.entry(value.as_str()).or_insert(0);
            if *count == 0 {
                first_seen.push(value.as_str());
            }
            *count += 1;
        }

        first_seen
            .into_iter()
            .filter(|value| counts.get(value).copied().unwrap_or(0) > 1)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DuplicateDetector {
        DuplicateDetector::new("subContentId").unwrap()
    }

    #[test]
    fn test_no_matches_is_empty() {
        assert!(detector().get_duplicates(r#"[{"slide":{"metadata":"abc"}}]"#).is_empty());
        assert!(detector().get_duplicates("").is_empty());
    }

    #[test]
    fn test_unique_values_are_not_duplicates() {
        let corpus = r#"{"_id":{"$oid":"5f9d88b9e4b0c8d6f4e3d2c1"},"slides":[{"slide":{"subContentId":"abc"}},{"slide":{"subContentId":"123"}}]}"#;
        assert!(detector().get_duplicates(corpus).is_empty());
    }

    #[test]
    fn test_identical_values_are_reported_once() {
        let corpus = r#"{"_id":{"$oid":"5f9d88b9e4b0c8d6f4e3d2c1"},"slides":[{"slide":{"subContentId":"123"}},{"slide":{"subContentId":"123"}}]}"#;
        assert_eq!(detector().get_duplicates(corpus), vec!["123".to_string()]);
    }

    #[test]
    fn test_order_is_first_seen() {
        let corpus = r#"[{"subContentId":"zzz"},{"subContentId":"aaa"},{"subContentId":"once"},{"subContentId":"aaa"},{"subContentId":"zzz"},{"subContentId":"zzz"}]"#;
        assert_eq!(
            detector().get_duplicates(corpus),
            vec!["zzz".to_string(), "aaa".to_string()]
        );
    }

    #[test]
    fn test_optional_whitespace_around_colon() {
        let corpus = r#"{"subContentId" : "a-1"} {"subContentId":"a-1"} {"subContentId": "a-1"}"#;
        assert_eq!(detector().get_duplicates(corpus), vec!["a-1".to_string()]);
    }

    #[test]
    fn test_values_outside_token_class_are_ignored() {
        let corpus = r#"{"subContentId":"ABC"} {"subContentId":"ABC"} {"subContentId":"a b"} {"subContentId":"a b"}"#;
        assert!(detector().get_duplicates(corpus).is_empty());
    }

    #[test]
    fn test_other_fields_are_ignored() {
        let corpus = r#"{"contentId":"abc"} {"contentId":"abc"} {"subContentIds":"abc"}"#;
        assert!(detector().get_duplicates(corpus).is_empty());
    }

    #[test]
    fn test_custom_field_is_escaped() {
        let detector = DuplicateDetector::new("answer.id").unwrap();
        let corpus = r#"{"answer.id":"x1"} {"answer.id":"x1"} {"answerXid":"y1"} {"answerXid":"y1"}"#;
        assert_eq!(detector.get_duplicates(corpus), vec!["x1".to_string()]);
        assert_eq!(detector.field(), "answer.id");
    }
}

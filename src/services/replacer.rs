//! Replacement of duplicate identifier values with fresh ones.

use std::borrow::Cow;

use regex::{Captures, Regex, RegexBuilder};
use uuid::Uuid;

use crate::error::AppError;

/// Fresh tokens containing a duplicate value are re-drawn at most this often.
const MAX_DRAWS: usize = 16;

/// Compiled size limit for the alternation of duplicate values.
const DEFAULT_PATTERN_SIZE_LIMIT: usize = 256 * (1 << 20);

/// Result of a replacement pass.
#[derive(Debug, Clone)]
pub struct Replacement<'a> {
    /// The rewritten corpus, borrowed when nothing was replaced.
    pub text: Cow<'a, str>,
    /// Number of occurrences replaced.
    pub occurrences: usize,
}

impl Replacement<'_> {
    fn unchanged(text: &str) -> Replacement<'_> {
        Replacement {
            text: Cow::Borrowed(text),
            occurrences: 0,
        }
    }
}

/// Rewrites a corpus so that none of the given values remain.
///
/// Fails only when the values cannot be compiled into a matcher, in which
/// case nothing has been rewritten.
pub trait ReplaceIds: Send + Sync {
    fn replace_with_new_ids<'a>(
        &self,
        corpus: &'a str,
        duplicates: &[String],
    ) -> Result<Replacement<'a>, AppError>;
}

/// Replaces every substring occurrence of a duplicate value with a new
/// random UUID v4 (`xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`, y in 8..=b).
///
/// Occurrences are replaced independently: two occurrences of one value get
/// two different identifiers. Matching is not restricted to the identifier
/// field. Replacing a 36-character value keeps the corpus length unchanged.
#[derive(Debug, Clone, Copy)]
pub struct IdReplacer {
    size_limit: usize,
}

impl Default for IdReplacer {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_PATTERN_SIZE_LIMIT,
        }
    }
}

impl IdReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the compiled size of the duplicate-value matcher, in bytes.
    pub fn with_size_limit(size_limit: usize) -> Self {
        Self { size_limit }
    }

    /// Generates a random 36-character identifier.
    pub fn create_uuid() -> String {
        Uuid::new_v4().to_string()
    }

    /// Draws an identifier in which `duplicates` finds no match.
    fn fresh_id(duplicates: &Regex) -> String {
        let mut id = Self::create_uuid();
        for _ in 1..MAX_DRAWS {
            if !duplicates.is_match(&id) {
                break;
            }
            id = Self::create_uuid();
        }
        id
    }
}

impl ReplaceIds for IdReplacer {
    fn replace_with_new_ids<'a>(
        &self,
        corpus: &'a str,
        duplicates: &[String],
    ) -> Result<Replacement<'a>, AppError> {
        // Empty values would match between every character.
        let mut values: Vec<&str> = duplicates
            .iter()
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .collect();
        if values.is_empty() {
            return Ok(Replacement::unchanged(corpus));
        }

        values.sort_unstable();
        values.dedup();
        // Longest first so a value is never cut short by one of its prefixes.
        values.sort_by_key(|value| std::cmp::Reverse(value.len()));

        let alternation = values
            .iter()
            .map(|value| regex::escape(value))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&alternation)
            .size_limit(self.size_limit)
            .dfa_size_limit(self.size_limit)
            .build()?;
        tracing::debug!("Compiled replacement pattern for {} values", values.len());

        let mut occurrences = 0;
        let text = pattern.replace_all(corpus, |_: &Captures| {
            occurrences += 1;
            Self::fresh_id(&pattern)
        });

        Ok(Replacement { text, occurrences })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{DetectDuplicates, DuplicateDetector};

    fn corpus_with(values: &[&str]) -> String {
        let slides: Vec<String> = values
            .iter()
            .map(|v| format!(r#"{{"slide":{{"subContentId":"{}"}}}}"#, v))
            .collect();
        format!(
            r#"{{"_id":{{"$oid":"5f9d88b9e4b0c8d6f4e3d2c1"}},"slides":[{}]}}"#,
            slides.join(",")
        )
    }

    #[test]
    fn test_create_uuid_layout() {
        for _ in 0..64 {
            let id = IdReplacer::create_uuid();
            assert_eq!(id.len(), 36);
            let groups: Vec<&str> = id.split('-').collect();
            assert_eq!(
                groups.iter().map(|g| g.len()).collect::<Vec<_>>(),
                vec![8, 4, 4, 4, 12]
            );
            assert!(id.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
            assert!(id.chars().all(|c| !c.is_ascii_uppercase()));
            assert!(groups[2].starts_with('4'));
            assert!(matches!(groups[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
        }
    }

    #[test]
    fn test_no_duplicates_returns_input_unchanged() {
        let corpus = corpus_with(&["abc", "123"]);
        let result = IdReplacer::new().replace_with_new_ids(&corpus, &[]).unwrap();

        assert!(matches!(result.text, Cow::Borrowed(text) if std::ptr::eq(text, corpus.as_str())));
        assert_eq!(result.occurrences, 0);
    }

    #[test]
    fn test_duplicate_removed_and_length_preserved() {
        let duplicate = IdReplacer::create_uuid();
        let corpus = corpus_with(&[duplicate.as_str(), duplicate.as_str()]);

        let result = IdReplacer::new().replace_with_new_ids(&corpus, &[duplicate.clone()]).unwrap();

        assert!(!result.text.contains(&duplicate));
        assert_eq!(result.text.len(), corpus.len());
        assert_eq!(result.occurrences, 2);
    }

    #[test]
    fn test_each_occurrence_gets_its_own_id() {
        let duplicate = IdReplacer::create_uuid();
        let corpus = corpus_with(&[duplicate.as_str(), duplicate.as_str(), duplicate.as_str()]);

        let result = IdReplacer::new().replace_with_new_ids(&corpus, &[duplicate]).unwrap();

        let detector = DuplicateDetector::new("subContentId").unwrap();
        assert!(detector.get_duplicates(&result.text).is_empty());
        assert_eq!(result.occurrences, 3);
    }

    #[test]
    fn test_replaces_bare_substrings_outside_the_field() {
        let duplicate = IdReplacer::create_uuid();
        let corpus = format!(
            r##"{{"subContentId":"{d}","link":"#{d}","other":{{"subContentId":"{d}"}}}}"##,
            d = duplicate
        );

        let result = IdReplacer::new().replace_with_new_ids(&corpus, &[duplicate.clone()]).unwrap();

        assert!(!result.text.contains(&duplicate));
        assert_eq!(result.occurrences, 3);
    }

    #[test]
    fn test_prefix_values_do_not_leave_remnants() {
        let corpus = r#"{"a":"abcd","b":"abcd","c":"ab","d":"ab"}"#;
        let duplicates = vec!["ab".to_string(), "abcd".to_string()];

        let result = IdReplacer::new().replace_with_new_ids(corpus, &duplicates).unwrap();

        assert!(!result.text.contains("ab"));
        assert_eq!(result.occurrences, 4);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let corpus = r#"{"subContentId":"x"}"#;
        let result = IdReplacer::new().replace_with_new_ids(corpus, &[String::new()]).unwrap();
        assert_eq!(result.text, corpus);
        assert_eq!(result.occurrences, 0);
    }

    #[test]
    fn test_many_duplicate_values_are_all_replaced() {
        let values: Vec<String> = (0..2_000).map(|_| IdReplacer::create_uuid()).collect();
        let slides: Vec<String> = values
            .iter()
            .flat_map(|v| [v, v])
            .map(|v| format!(r#"{{"subContentId":"{}"}}"#, v))
            .collect();
        let corpus = format!("[{}]", slides.join(","));

        let result = IdReplacer::new().replace_with_new_ids(&corpus, &values).unwrap();

        assert_eq!(result.occurrences, 4_000);
        assert_eq!(result.text.len(), corpus.len());
        assert!(values.iter().all(|v| !result.text.contains(v.as_str())));
        let detector = DuplicateDetector::new("subContentId").unwrap();
        assert!(detector.get_duplicates(&result.text).is_empty());
    }

    #[test]
    fn test_oversized_pattern_is_an_error() {
        let values: Vec<String> = (0..64).map(|_| IdReplacer::create_uuid()).collect();
        let corpus = format!(r#"{{"subContentId":"{}"}}"#, values[0]);

        let result = IdReplacer::with_size_limit(64).replace_with_new_ids(&corpus, &values);

        assert!(matches!(result, Err(AppError::Pattern(_))));
    }
}

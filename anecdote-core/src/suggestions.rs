//! Topic suggestions and supported languages.

use crate::anecdote::Anecdote;
use serde::{Deserialize, Serialize};

/// Maximum number of suggestions shown.
pub const MAX_SUGGESTIONS: usize = 6;

/// How many suggestions may come from the user's own history.
pub const MAX_HISTORY_SUGGESTIONS: usize = 3;

/// Languages stories can be written in.
pub const SUPPORTED_LANGUAGES: [&str; 11] = [
    "English",
    "Hindi",
    "Spanish",
    "French",
    "Mandarin Chinese",
    "Arabic",
    "Bengali",
    "Portuguese",
    "Russian",
    "Japanese",
    "German",
];

/// The language new sessions start in.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Broad subject of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectCategory {
    Science,
    History,
    Math,
    Literature,
    Art,
    General,
}

impl SubjectCategory {
    pub fn name(&self) -> &'static str {
        match self {
            SubjectCategory::Science => "Science",
            SubjectCategory::History => "History",
            SubjectCategory::Math => "Math",
            SubjectCategory::Literature => "Literature",
            SubjectCategory::Art => "Art",
            SubjectCategory::General => "General",
        }
    }
}

/// Curated starting points.
pub const DEFAULT_SUGGESTIONS: [(&str, SubjectCategory); 6] = [
    ("Newton's Apple", SubjectCategory::Science),
    ("Pythagoras", SubjectCategory::Math),
    ("The Trojan Horse", SubjectCategory::History),
    ("Shakespeare", SubjectCategory::Literature),
    ("Discovery of Penicillin", SubjectCategory::Science),
    ("Leonardo da Vinci", SubjectCategory::Art),
];

/// A clickable topic suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub label: String,
    pub category: SubjectCategory,
}

impl Suggestion {
    pub fn new(label: impl Into<String>, category: SubjectCategory) -> Self {
        Self {
            label: label.into(),
            category,
        }
    }
}

/// Canonical spelling of `language` if it is supported (case-insensitive).
pub fn supported_language(language: &str) -> Option<&'static str> {
    let wanted = language.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(wanted))
}

/// Suggestions for a user with the given history (newest first).
///
/// Up to three distinct recent topics come first, then curated defaults
/// that are not already listed, capped at six.
pub fn derive_suggestions(history: &[Anecdote]) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = Vec::with_capacity(MAX_SUGGESTIONS);

    for anecdote in history {
        if suggestions.len() == MAX_HISTORY_SUGGESTIONS {
            break;
        }
        if !suggestions.iter().any(|s| s.label == anecdote.topic) {
            suggestions.push(Suggestion::new(&anecdote.topic, SubjectCategory::General));
        }
    }

    let from_history = suggestions.len();
    for (label, category) in DEFAULT_SUGGESTIONS {
        if !suggestions[..from_history].iter().any(|s| s.label == label) {
            suggestions.push(Suggestion::new(label, category));
        }
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_anecdote;

    fn labels(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_defaults_without_history() {
        let suggestions = derive_suggestions(&[]);
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(suggestions[0].label, "Newton's Apple");
        assert_eq!(suggestions[1].category, SubjectCategory::Math);
    }

    #[test]
    fn test_recent_topics_come_first_and_dedupe() {
        let history = vec![
            sample_anecdote("A", "Physics"),
            sample_anecdote("B", "Physics"),
            sample_anecdote("C", "World History"),
            sample_anecdote("D", "Biology"),
            sample_anecdote("E", "Chemistry"),
        ];

        let suggestions = derive_suggestions(&history);
        assert_eq!(
            labels(&suggestions),
            [
                "Physics",
                "World History",
                "Biology",
                "Newton's Apple",
                "Pythagoras",
                "The Trojan Horse"
            ]
        );
        assert_eq!(suggestions[0].category, SubjectCategory::General);
    }

    #[test]
    fn test_defaults_already_in_history_are_skipped() {
        let history = vec![sample_anecdote("A", "Pythagoras")];
        let suggestions = derive_suggestions(&history);

        assert_eq!(
            labels(&suggestions),
            [
                "Pythagoras",
                "Newton's Apple",
                "The Trojan Horse",
                "Shakespeare",
                "Discovery of Penicillin",
                "Leonardo da Vinci"
            ]
        );
        assert_eq!(suggestions[0].category, SubjectCategory::General);
    }

    #[test]
    fn test_supported_language() {
        assert_eq!(supported_language("hindi"), Some("Hindi"));
        assert_eq!(supported_language(" Mandarin Chinese "), Some("Mandarin Chinese"));
        assert_eq!(supported_language("Klingon"), None);
    }
}

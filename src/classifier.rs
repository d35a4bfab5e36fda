//! Picks a search strategy from trigger phrases in a free-text query.

use crate::model::SearchMode;

/// Checked in order; the first group with a hit wins.
const TRIGGERS: &[(SearchMode, &[&str])] = &[
    (
        SearchMode::ExcludeContent,
        &[
            "dont look through content",
            "don't look through content",
            "exclude content",
            "without content",
        ],
    ),
    (
        SearchMode::PartialMatch,
        &["partial match", "similar to", "like"],
    ),
    (
        SearchMode::NameOnly,
        &[
            "just find a file named",
            "file named",
            "contains word",
            "file called",
        ],
    ),
    (
        SearchMode::ContentOnly,
        &["content only", "search content", "inside content"],
    ),
];

#[derive(Clone, Default)]
pub struct SearchModeClassifier;

impl SearchModeClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, query: &str) -> SearchMode {
        let lowered = query.to_lowercase();
        TRIGGERS
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| lowered.contains(p)))
            .map(|(mode, _)| *mode)
            .unwrap_or(SearchMode::Comprehensive)
    }
}

use crate::error::Result;
use crate::model::{CountMethod, FileRecord, MatchType, SearchScope};
use crate::query::{FieldMatcher, KeywordPattern};

/// How every keyword of one analysis is counted.
#[derive(Debug, Clone, Copy)]
pub struct CountOptions {
    pub method: CountMethod,
    pub match_type: MatchType,
    pub scope: SearchScope,
    pub case_sensitive: bool,
}

impl Default for CountOptions {
    fn default() -> Self {
        Self {
            method: CountMethod::Presence,
            match_type: MatchType::WholeWord,
            scope: SearchScope::ContentOnly,
            case_sensitive: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct KeywordCounter {
    matcher: FieldMatcher,
}

impl KeywordCounter {
    pub fn new() -> Self {
        Self {
            matcher: FieldMatcher::new(),
        }
    }

    /// Counts one keyword against the base set; the base set is never narrowed.
    pub fn count(&self, base: &[&FileRecord], keyword: &str, opts: &CountOptions) -> Result<u64> {
        let pattern = KeywordPattern::new(keyword, opts.match_type, opts.case_sensitive)?;
        let matching = self
            .matcher
            .filter_scope(base.iter().copied(), opts.scope, &pattern);

        let count = match opts.method {
            CountMethod::Presence => matching.len() as u64,
            // occurrences are plain substring counts whatever the match type
            CountMethod::Frequency => matching
                .iter()
                .flat_map(|r| opts.scope.fields().iter().filter_map(|f| r.field(*f)))
                .map(|text| {
                    self.matcher
                        .count_occurrences(text, keyword, opts.case_sensitive)
                        as u64
                })
                .sum(),
        };
        Ok(count)
    }

    /// Counts every keyword, preserving keyword order.
    pub fn count_all(
        &self,
        base: &[&FileRecord],
        keywords: &[String],
        opts: &CountOptions,
    ) -> Result<Vec<(String, u64)>> {
        keywords
            .iter()
            .map(|k| Ok((k.clone(), self.count(base, k, opts)?)))
            .collect()
    }
}

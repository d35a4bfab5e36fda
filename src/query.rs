use regex::{Regex, RegexBuilder};

use crate::error::{LibrarySearchError, Result};
use crate::model::{Field, FileRecord, MatchType, RecordFilter, SearchMode, SearchScope};

const NAME_FIELDS: &[Field] = &[Field::Name, Field::Title, Field::FileLabel];
const CONTENT_FIELDS: &[Field] = &[Field::Content, Field::ContentSample];
const EXCLUDE_CONTENT_FIELDS: &[Field] = &[
    Field::Name,
    Field::Title,
    Field::Description,
    Field::Note,
    Field::FileLabel,
    Field::AlternateTitle,
];
const PARTIAL_FIELDS: &[Field] = &[Field::Content, Field::Title, Field::Name, Field::Description];
/// Fields the web search form looks at.
const WEB_FIELDS: &[Field] = &[
    Field::Content,
    Field::Title,
    Field::Description,
    Field::Name,
    Field::ContentSample,
    Field::Note,
];
const NAME_LOOKUP_FIELDS: &[Field] = &[Field::Name, Field::Title];
const COMPREHENSIVE_FIELDS: &[Field] = &[
    Field::Content,
    Field::Title,
    Field::Description,
    Field::Name,
    Field::ContentSample,
    Field::Note,
    Field::FileLabel,
    Field::AlternateTitle,
    Field::LectureSeriesNames,
    Field::MimeoTitles,
    Field::LrhArticle,
];

/// Keyword compiled once per analysis, reused across every record.
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    text: String,
    folded: String,
    match_type: MatchType,
    case_sensitive: bool,
    word_re: Option<Regex>,
}

impl KeywordPattern {
    pub fn new(text: &str, match_type: MatchType, case_sensitive: bool) -> Result<Self> {
        let word_re = if match_type == MatchType::WholeWord && !text.is_empty() {
            let escaped = regex::escape(text);
            Some(compile_regex(&format!(r"\b{escaped}\b"), case_sensitive)?)
        } else {
            None
        };
        Ok(Self {
            text: text.to_string(),
            folded: fold(text, case_sensitive),
            match_type,
            case_sensitive,
            word_re,
        })
    }

    /// Plain substring pattern, used for the prompt's pre-filter clause.
    pub fn substring(text: &str, case_sensitive: bool) -> Self {
        Self {
            text: text.to_string(),
            folded: fold(text, case_sensitive),
            match_type: MatchType::Partial,
            case_sensitive,
            word_re: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_match(&self, value: &str) -> bool {
        if self.text.is_empty() {
            return true;
        }
        match self.match_type {
            MatchType::WholeWord => self
                .word_re
                .as_ref()
                .map(|re| re.is_match(value))
                .unwrap_or(false),
            MatchType::ExactPhrase => fold(value, self.case_sensitive) == self.folded,
            MatchType::Partial => fold(value, self.case_sensitive).contains(&self.folded),
        }
    }
}

/// 字段匹配器：按搜索模式或关键词范围决定检查哪些字段以及如何匹配。
#[derive(Clone, Default)]
pub struct FieldMatcher;

impl FieldMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn fields_for(mode: SearchMode) -> &'static [Field] {
        match mode {
            SearchMode::NameOnly => NAME_FIELDS,
            SearchMode::ContentOnly => CONTENT_FIELDS,
            SearchMode::ExcludeContent => EXCLUDE_CONTENT_FIELDS,
            SearchMode::PartialMatch => PARTIAL_FIELDS,
            SearchMode::Comprehensive => COMPREHENSIVE_FIELDS,
        }
    }

    /// Library search for `mode`. Partial matching searches each token longer
    /// than two characters; other modes search the whole trimmed term.
    pub fn query(&self, mode: SearchMode, term: &str, filter: RecordFilter, limit: usize) -> FileQuery {
        let term = term.trim();
        let terms = if term.is_empty() {
            Vec::new()
        } else if mode == SearchMode::PartialMatch {
            term.split_whitespace()
                .filter(|t| t.chars().count() > 2)
                .map(|t| t.to_lowercase())
                .collect()
        } else {
            vec![term.to_lowercase()]
        };
        FileQuery {
            filter,
            fields: Self::fields_for(mode),
            terms,
            limit,
        }
    }

    /// Web form search over the six primary text fields.
    pub fn web_query(&self, term: &str, filter: RecordFilter, limit: usize) -> FileQuery {
        FileQuery {
            fields: WEB_FIELDS,
            ..self.query(SearchMode::Comprehensive, term, filter, limit)
        }
    }

    /// Newest file whose name or title contains `name`.
    pub fn name_query(&self, name: &str) -> FileQuery {
        FileQuery {
            fields: NAME_LOOKUP_FIELDS,
            ..self.query(SearchMode::Comprehensive, name, RecordFilter::default(), 1)
        }
    }

    pub fn matches_scope(
        &self,
        record: &FileRecord,
        scope: SearchScope,
        pattern: &KeywordPattern,
    ) -> bool {
        if pattern.is_empty() {
            return true;
        }
        scope
            .fields()
            .iter()
            .filter_map(|f| record.field(*f))
            .any(|value| pattern.is_match(value))
    }

    pub fn filter_scope<'a, I>(
        &self,
        records: I,
        scope: SearchScope,
        pattern: &KeywordPattern,
    ) -> Vec<&'a FileRecord>
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        records
            .into_iter()
            .filter(|r| self.matches_scope(r, scope, pattern))
            .collect()
    }

    /// Non-overlapping occurrences of `needle` in `text`.
    pub fn count_occurrences(&self, text: &str, needle: &str, case_sensitive: bool) -> usize {
        if needle.is_empty() {
            return 0;
        }
        if case_sensitive {
            text.matches(needle).count()
        } else {
            text.to_lowercase().matches(&needle.to_lowercase()).count()
        }
    }
}

pub fn compile_regex(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    builder.case_insensitive(!case_sensitive);
    builder.build().map_err(|e| {
        LibrarySearchError::InvalidRequest(format!("bad pattern {pattern}: {e}"))
    })
}

/// A library search as the store runs it: any term in any listed field,
/// newest first, at most `limit` records.
#[derive(Debug, Clone)]
pub struct FileQuery {
    pub filter: RecordFilter,
    pub fields: &'static [Field],
    /// Lower-cased. Empty means no text constraint.
    pub terms: Vec<String>,
    pub limit: usize,
}

impl FileQuery {
    pub fn matches(&self, record: &FileRecord) -> bool {
        self.terms.is_empty()
            || self
                .terms
                .iter()
                .any(|term| any_field_contains(record, self.fields, term))
    }
}

/// `needle` must already be lowercased.
fn any_field_contains(record: &FileRecord, fields: &[Field], needle: &str) -> bool {
    fields
        .iter()
        .filter_map(|f| record.field(*f))
        .any(|value| value.to_lowercase().contains(needle))
}

fn fold(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, name: &str, content: &str) -> FileRecord {
        FileRecord {
            id,
            name: name.into(),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    fn filter<'a>(records: &'a [FileRecord], mode: SearchMode, term: &str) -> Vec<&'a FileRecord> {
        let query = FieldMatcher::new().query(mode, term, RecordFilter::default(), usize::MAX);
        records.iter().filter(|r| query.matches(r)).collect()
    }

    #[test]
    fn empty_term_matches_everything_in_every_mode() {
        let records = vec![rec(1, "a", "x"), rec(2, "b", "y"), rec(3, "c", "")];
        for mode in SearchMode::ALL {
            assert_eq!(filter(&records, *mode, "").len(), 3, "mode {mode}");
            assert_eq!(filter(&records, *mode, "   ").len(), 3, "mode {mode}");
        }
    }

    #[test]
    fn partial_match_ignores_short_tokens() {
        let records = vec![
            rec(1, "one", "a cat sat"),
            rec(2, "two", "an ox stood"),
            rec(3, "three", "nothing here"),
        ];
        let hits = filter(&records, SearchMode::PartialMatch, "a ox cat");
        let ids: Vec<i64> = hits.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn partial_match_without_long_tokens_applies_no_filter() {
        let records = vec![rec(1, "one", "abc"), rec(2, "two", "def")];
        assert_eq!(filter(&records, SearchMode::PartialMatch, "a ox").len(), 2);
    }

    #[test]
    fn name_only_skips_content() {
        let mut titled = rec(2, "other.pdf", "");
        titled.title = Some("Prayer Book".into());
        let records = vec![rec(1, "notes.txt", "prayer everywhere"), titled];
        let hits = filter(&records, SearchMode::NameOnly, "PRAYER");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn exclude_content_reads_alternate_title_but_not_content() {
        let mut alt = rec(2, "b", "");
        alt.alternate_title = Some("The Evil Purpose".into());
        let records = vec![rec(1, "a", "evil"), alt];
        let hits = filter(&records, SearchMode::ExcludeContent, "evil");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn comprehensive_reaches_lrh_article() {
        let mut r = rec(1, "a", "");
        r.lrh_article = Some("Article on Ethics".into());
        let m = FieldMatcher::new();
        let query = |mode| m.query(mode, "ethics", RecordFilter::default(), 10);
        assert!(query(SearchMode::Comprehensive).matches(&r));
        assert!(!query(SearchMode::ContentOnly).matches(&r));
    }

    #[test]
    fn web_query_covers_six_fields() {
        let mut noted = rec(1, "a", "");
        noted.note = Some("about ethics".into());
        let mut labelled = rec(2, "b", "");
        labelled.file_label = Some("ethics".into());
        let q = FieldMatcher::new().web_query(" Ethics ", RecordFilter::default(), 5);
        assert_eq!(q.terms, vec!["ethics"]);
        assert!(q.matches(&noted));
        assert!(!q.matches(&labelled));
    }

    #[test]
    fn name_query_reads_name_and_title_only() {
        let mut titled = rec(1, "x.pdf", "dianetics");
        titled.title = Some("Dianetics Today".into());
        let q = FieldMatcher::new().name_query("DIANETICS");
        assert_eq!(q.limit, 1);
        assert!(q.matches(&titled));
        assert!(!q.matches(&rec(2, "y.pdf", "dianetics")));
    }

    #[test]
    fn whole_word_respects_boundaries_and_case() {
        let insensitive = KeywordPattern::new("err", MatchType::WholeWord, false).unwrap();
        assert!(insensitive.is_match("ERR and terror"));
        assert!(!insensitive.is_match("terror"));

        let sensitive = KeywordPattern::new("God", MatchType::WholeWord, true).unwrap();
        assert!(sensitive.is_match("for God's sake"));
        assert!(!sensitive.is_match("for god's sake"));
    }

    #[test]
    fn whole_word_escapes_pattern_characters() {
        let p = KeywordPattern::new("a.b", MatchType::WholeWord, false).unwrap();
        assert!(p.is_match("see a.b here"));
        assert!(!p.is_match("see axb here"));
    }

    #[test]
    fn exact_phrase_compares_whole_value() {
        let p = KeywordPattern::new("Evil", MatchType::ExactPhrase, false).unwrap();
        assert!(p.is_match("evil"));
        assert!(!p.is_match("evil deeds"));
    }

    #[test]
    fn scope_limits_fields() {
        let mut r = rec(1, "evil.txt", "nothing");
        r.note = Some("evil note".into());
        let m = FieldMatcher::new();
        let p = KeywordPattern::new("evil", MatchType::Partial, false).unwrap();
        assert!(!m.matches_scope(&r, SearchScope::ContentOnly, &p));
        assert!(m.matches_scope(&r, SearchScope::TitlesOnly, &p));
        assert!(m.matches_scope(&r, SearchScope::AllFields, &p));
    }

    #[test]
    fn occurrences_are_non_overlapping() {
        let m = FieldMatcher::new();
        assert_eq!(m.count_occurrences("aaaa", "aa", true), 2);
        assert_eq!(m.count_occurrences("Cat cat CAT", "cat", false), 3);
        assert_eq!(m.count_occurrences("Cat cat CAT", "cat", true), 1);
        assert_eq!(m.count_occurrences("anything", "", false), 0);
    }
}

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::ParsedKeywordPrompt;

const QUOTE_CHARS: &[char] = &['"', '\'', '`'];

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static pattern"))
}

fn backtick_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("static pattern"))
}

/// Text after `mentioning`, stopping before a trailing "[and] plot [a] chart" clause.
fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\bmentioning\s+(.+?)(?:\s+(?:and\s+)?plot\s+a?\s*chart\b.*)?$")
            .expect("static pattern")
    })
}

fn filter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^(.+?)\s+(?:and\s+)?plot\s+a?\s*chart").expect("static pattern")
    })
}

fn filter_verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:please\s+)?(?:search|find)(?:\s+|$)").expect("static pattern")
    })
}

fn mention_tail_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\s*\bmentioning\b.*$").expect("static pattern"))
}

fn and_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+(?:and|&)\s+").expect("static pattern"))
}

/// 关键词提示解析器：从自然语言提示中提取关键词列表与可选的预过滤条件。
#[derive(Clone, Default)]
pub struct KeywordPromptParser;

impl KeywordPromptParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, prompt: &str) -> ParsedKeywordPrompt {
        let mut raw: Vec<String> = Vec::new();

        raw.extend(quoted_re().captures_iter(prompt).map(|c| c[1].to_string()));
        raw.extend(backtick_re().captures_iter(prompt).map(|c| c[1].to_string()));
        if let Some(caps) = mention_re().captures(prompt) {
            raw.extend(split_mention(&caps[1]));
        }

        ParsedKeywordPrompt {
            keywords: dedup_keywords(raw),
            search_filter: self.extract_filter(prompt),
        }
    }

    fn extract_filter(&self, prompt: &str) -> Option<String> {
        let caps = filter_re().captures(prompt)?;
        let prefix = caps[1].trim();
        let without_verb = filter_verb_re().replace(prefix, "");
        let filter = mention_tail_re().replace(&without_verb, "");
        let filter = filter.trim();
        if filter.is_empty() {
            None
        } else {
            Some(filter.to_string())
        }
    }
}

fn split_mention(text: &str) -> Vec<String> {
    let text = text.trim().trim_end_matches(['.', '?', '!']);
    let normalized = and_re().replace_all(text, ", ");
    normalized
        .split(',')
        .map(|piece| piece.trim().trim_matches(QUOTE_CHARS).trim().to_string())
        .collect()
}

/// Trim, drop empties, keep the first occurrence of each keyword.
fn dedup_keywords(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

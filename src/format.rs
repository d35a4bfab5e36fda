//! Text renderings of search results for LLM and web clients.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{FileRecord, ResponseType};

const SUMMARY_TOP: usize = 5;
const SUMMARY_DESCRIPTION_CHARS: usize = 120;
const DETAILED_SAMPLE_CHARS: usize = 300;
const DETAILED_NOTE_CHARS: usize = 200;
const FULL_CONTENT_MAX: usize = 2000;
const PARTIAL_CONTENT_MAX: usize = 5000;
const PARTIAL_CONTENT_SHOWN: usize = 1500;
const EXCERPT_HEAD: usize = 800;
const EXCERPT_SECTION: usize = 400;
const EXCERPT_LEAD: usize = 200;
const EXCERPT_TAIL: usize = 400;
const NO_CONTENT_SAMPLE_CHARS: usize = 500;

const NAME_STOP_WORDS: &[&str] = &[
    "please", "give", "me", "brief", "summary", "summery", "of", "the", "book", "file", "document",
];

fn summary_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:summary|summery)\s+(?:of|for)\s+(?:the\s+book\s+)?(.+)$")
            .expect("static pattern")
    })
}

fn after_preposition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:of the book|of|for|about)\s+(\S+)").expect("static pattern")
    })
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static pattern"))
}

fn file_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bID\s*[:#]?\s*(\d+)\b").expect("static pattern"))
}

#[derive(Clone, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, files: &[&FileRecord], style: ResponseType, query: &str) -> String {
        if files.is_empty() {
            return self.no_results(query);
        }
        let header = format!("Found {} file(s) matching '{}':\n\n", files.len(), query);
        match style {
            ResponseType::List => self.list(files, header),
            ResponseType::Detailed => self.detailed(files, header),
            ResponseType::Summary | ResponseType::ContentSummary => self.summary(files, header),
        }
    }

    pub fn no_results(&self, query: &str) -> String {
        format!(
            "I couldn't find any files matching your query: '{query}'. You might try:\n\
             - Using different keywords\n\
             - Checking the spelling\n\
             - Using broader search terms\n\
             - Specifying a different source or type"
        )
    }

    pub fn not_found_by_id(&self, id: i64) -> String {
        format!(
            "File with ID {id} not found. Search the library first to get a valid file ID."
        )
    }

    pub fn not_found_by_name(&self, name: &str) -> String {
        if name.is_empty() {
            return "I couldn't tell which file you want summarized. Put the file name in quotes, \
                    e.g. Please give me a brief summary of \"[filename]\", or pass a file ID."
                .to_string();
        }
        format!("File '{name}' not found. Please check the name and try again.")
    }

    fn list(&self, files: &[&FileRecord], mut out: String) -> String {
        for (index, file) in files.iter().enumerate() {
            out.push_str(&format!("{}. [ID: {}] {}", index + 1, file.id, file.display_title()));
            if let Some(date) = file.formatted_date() {
                out.push_str(&format!(" ({date})"));
            }
            if let Some(source) = non_empty(&file.source) {
                out.push_str(&format!(" - Source: {source}"));
            }
            out.push('\n');
        }
        out.push_str(
            "\n💡 **Tip**: For content summary of any file, ask: \
             \"Please give me a brief summary of [filename]\" or use the file ID.",
        );
        out
    }

    fn detailed(&self, files: &[&FileRecord], mut out: String) -> String {
        for (index, file) in files.iter().enumerate() {
            out.push_str(&format!("--- File {} ---\n", index + 1));
            out.push_str(&format!("🆔 **ID**: {}\n", file.id));
            out.push_str(&format!("📄 **Title**: {}\n", file.display_title()));
            if let Some(description) = non_empty(&file.description) {
                out.push_str(&format!("📝 **Description**: {description}\n"));
            }
            if let Some(file_type) = non_empty(&file.file_type) {
                out.push_str(&format!("📂 **Type**: {file_type}\n"));
            }
            if let Some(source) = non_empty(&file.source) {
                out.push_str(&format!("📖 **Source**: {source}\n"));
            }
            if let Some(date) = file.formatted_date() {
                out.push_str(&format!("📅 **Date**: {date}\n"));
            }
            if let Some(number) = non_empty(&file.file_number) {
                out.push_str(&format!("🔢 **File Number**: {number}\n"));
            }
            if let Some(code) = non_empty(&file.lecture_code) {
                out.push_str(&format!("📚 **Lecture Code**: {code}\n"));
            }
            if file.has_content() {
                out.push_str(&format!(
                    "📊 **Content Available**: {} characters\n",
                    thousands(file.content_len())
                ));
            }
            if let Some(sample) = non_empty(&file.content_sample) {
                out.push_str(&format!(
                    "📖 **Content Sample**: {}\n",
                    truncate_with_ellipsis(sample, DETAILED_SAMPLE_CHARS)
                ));
            }
            if let Some(note) = non_empty(&file.note) {
                out.push_str(&format!(
                    "📋 **Note**: {}\n",
                    truncate_with_ellipsis(note, DETAILED_NOTE_CHARS)
                ));
            }
            out.push_str(&format!(
                "💡 **Get Full Content**: Ask \"Please give me a brief summary of ID {}\" or \
                 \"Please give me a brief summary of \"{}\"\"\n\n",
                file.id, file.name
            ));
        }
        out
    }

    fn summary(&self, files: &[&FileRecord], mut out: String) -> String {
        let types = distinct(files.iter().filter_map(|f| non_empty(&f.file_type)));
        let sources = distinct(files.iter().filter_map(|f| non_empty(&f.source)));
        let with_content = files.iter().filter(|f| f.has_content()).count();

        if !types.is_empty() {
            out.push_str(&format!("📂 **Types found**: {}\n", types.join(", ")));
        }
        if !sources.is_empty() {
            out.push_str(&format!("📖 **Sources**: {}\n", sources.join(", ")));
        }
        out.push_str(&format!(
            "📊 **Content Available**: {} out of {} files have full content\n\n",
            with_content,
            files.len()
        ));

        out.push_str("**Top results**:\n");
        for (index, file) in files.iter().take(SUMMARY_TOP).enumerate() {
            out.push_str(&format!(
                "{}. **[ID: {}]** {}",
                index + 1,
                file.id,
                file.display_title()
            ));
            if let Some(date) = file.formatted_date() {
                out.push_str(&format!(" ({date})"));
            }
            if let Some(source) = non_empty(&file.source) {
                out.push_str(&format!(" - *{source}*"));
            }
            if let Some(description) = non_empty(&file.description) {
                out.push_str(&format!(
                    "\n   📝 {}",
                    truncate_with_ellipsis(description, SUMMARY_DESCRIPTION_CHARS)
                ));
            }
            if file.has_content() {
                out.push_str(&format!(
                    "\n   📊 Content: {} characters",
                    thousands(file.content_len())
                ));
            }
            out.push('\n');
        }

        if files.len() > SUMMARY_TOP {
            out.push_str(&format!(
                "\n... and **{} more results**. Use `response_type='detailed'` for complete information.\n",
                files.len() - SUMMARY_TOP
            ));
        }
        out.push_str(
            "\n💡 **Get content summary**: Ask \"Please give me a brief summary of [filename]\" \
             or \"Please give me a brief summary of ID [number]\"",
        );
        out
    }

    /// Full text, a head cut, or three labelled excerpts depending on length.
    pub fn content_summary(&self, file: &FileRecord, query: &str) -> String {
        let mut out = String::from("=== CONTENT SUMMARY ===\n\n");
        out.push_str(&format!("📄 **File**: {}\n", file.display_title()));
        out.push_str(&format!("🆔 **ID**: {}\n", file.id));
        if let Some(source) = non_empty(&file.source) {
            out.push_str(&format!("📖 **Source**: {source}\n"));
        }
        if let Some(file_type) = non_empty(&file.file_type) {
            out.push_str(&format!("📂 **Type**: {file_type}\n"));
        }
        if let Some(date) = file.formatted_date() {
            out.push_str(&format!("📅 **Date**: {date}\n"));
        }
        if let Some(description) = non_empty(&file.description) {
            out.push_str(&format!("📝 **Description**: {description}\n"));
        }
        out.push_str("\n--- CONTENT ---\n");

        let content = match non_empty(&file.content) {
            Some(c) => c,
            None => {
                out.push_str("⚠️  No content available for this file.\n");
                if let Some(sample) = non_empty(&file.content_sample) {
                    out.push_str(&format!(
                        "\n**Available Content Sample**:\n{}\n",
                        truncate_with_ellipsis(sample, NO_CONTENT_SAMPLE_CHARS)
                    ));
                }
                return out;
            }
        };

        let chars: Vec<char> = content.chars().collect();
        let total = chars.len();
        out.push_str(&format!(
            "📊 **Content Length**: {} characters\n\n",
            thousands(total)
        ));

        if total <= FULL_CONTENT_MAX {
            out.push_str("**Full Content**:\n");
            out.push_str(content);
        } else if total <= PARTIAL_CONTENT_MAX {
            out.push_str(&format!(
                "**Content** (showing first {} characters):\n",
                thousands(PARTIAL_CONTENT_SHOWN)
            ));
            out.push_str(&slice_chars(&chars, 0, PARTIAL_CONTENT_SHOWN));
            out.push_str(&format!(
                "\n\n[Content continues... {} characters remaining]",
                thousands(total - PARTIAL_CONTENT_SHOWN)
            ));
        } else {
            let mut shown = EXCERPT_HEAD + EXCERPT_TAIL;
            out.push_str("**Content Summary** (showing key excerpts):\n\n");
            out.push_str(&format!(
                "**Beginning**:\n{}\n\n",
                slice_chars(&chars, 0, EXCERPT_HEAD)
            ));
            if let Some((word, start)) = relevant_position(&chars, query) {
                let excerpt = slice_chars(&chars, start, EXCERPT_SECTION);
                shown += excerpt.chars().count();
                out.push_str(&format!(
                    "**Relevant Section** (contains '{word}'):\n...{excerpt}...\n\n"
                ));
            }
            out.push_str(&format!(
                "**End**:\n...{}\n\n",
                slice_chars(&chars, total - EXCERPT_TAIL, EXCERPT_TAIL)
            ));
            out.push_str(&format!(
                "[Total content length: {} characters, about {} characters not shown]",
                thousands(total),
                thousands(total.saturating_sub(shown))
            ));
        }
        out
    }

    /// Best-effort file name from a "summary of ..." style request.
    pub fn extract_file_name(&self, query: &str) -> String {
        if let Some(caps) = quoted_re().captures(query) {
            return caps[1].trim().to_string();
        }
        if let Some(caps) = summary_of_re().captures(query) {
            let name = caps[1].trim().trim_end_matches(['.', '?', '!']).trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
        if let Some(caps) = after_preposition_re().captures(query) {
            return caps[1].trim_end_matches(['.', '?', '!']).to_string();
        }
        query
            .to_lowercase()
            .split(' ')
            .filter(|w| !w.is_empty() && !NAME_STOP_WORDS.contains(w))
            .take(3)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `ID 42` style references, as suggested by the list and detailed hints.
    pub fn extract_file_id(&self, query: &str) -> Option<i64> {
        file_id_re()
            .captures(query)
            .and_then(|caps| caps[1].parse().ok())
    }
}

/// First query word longer than 3 characters found in the content, with the
/// excerpt start `EXCERPT_LEAD` characters before it.
fn relevant_position(chars: &[char], query: &str) -> Option<(String, usize)> {
    if query.chars().count() <= 3 {
        return None;
    }
    let folded: Vec<char> = chars.iter().map(|c| fold_char(*c)).collect();
    query
        .to_lowercase()
        .split(' ')
        .filter(|w| w.chars().count() > 3)
        .find_map(|word| {
            let needle: Vec<char> = word.chars().map(fold_char).collect();
            if needle.len() > folded.len() {
                return None;
            }
            folded
                .windows(needle.len())
                .position(|w| w == needle.as_slice())
                .map(|pos| (word.to_string(), pos.saturating_sub(EXCERPT_LEAD)))
        })
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn slice_chars(chars: &[char], start: usize, len: usize) -> String {
    let start = start.min(chars.len());
    let end = start.saturating_add(len).min(chars.len());
    chars[start..end].iter().collect()
}

fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push_str("...");
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// 1234567 -> "1,234,567"
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(id: i64, title: &str) -> FileRecord {
        FileRecord {
            id,
            name: format!("{}.pdf", title.to_lowercase()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn with_content(len: usize) -> FileRecord {
        FileRecord {
            id: 1,
            name: "long.txt".into(),
            content: Some("a".repeat(len)),
            ..Default::default()
        }
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1500), "1,500");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn list_is_one_line_per_record() {
        let mut a = rec(1, "Faith");
        a.date = NaiveDate::from_ymd_opt(1952, 3, 1);
        a.source = Some("lectures".into());
        let b = rec(2, "Hope");
        let out = ResponseFormatter::new().render(&[&a, &b], ResponseType::List, "faith");
        assert!(out.starts_with("Found 2 file(s) matching 'faith':"));
        assert!(out.contains("1. [ID: 1] Faith (1952-03-01) - Source: lectures\n"));
        assert!(out.contains("2. [ID: 2] Hope\n"));
    }

    #[test]
    fn detailed_truncates_sample_at_300() {
        let mut a = rec(1, "Faith");
        a.content_sample = Some("s".repeat(301));
        a.content = Some("c".repeat(1234));
        let out = ResponseFormatter::new().render(&[&a], ResponseType::Detailed, "q");
        assert!(out.contains(&format!("**Content Sample**: {}...\n", "s".repeat(300))));
        assert!(out.contains("**Content Available**: 1,234 characters"));

        a.content_sample = Some("s".repeat(300));
        let out = ResponseFormatter::new().render(&[&a], ResponseType::Detailed, "q");
        assert!(out.contains(&format!("**Content Sample**: {}\n", "s".repeat(300))));
    }

    #[test]
    fn summary_lists_top_five_and_remaining() {
        let records: Vec<FileRecord> = (1..=7)
            .map(|i| {
                let mut r = rec(i, &format!("T{i}"));
                r.file_type = Some(if i % 2 == 0 { "book" } else { "audio" }.into());
                r.source = Some("coolbeans".into());
                r.description = Some("d".repeat(130));
                if i <= 3 {
                    r.content = Some("text".into());
                }
                r
            })
            .collect();
        let refs: Vec<&FileRecord> = records.iter().collect();
        let out = ResponseFormatter::new().render(&refs, ResponseType::Summary, "q");
        assert!(out.contains("**Types found**: audio, book\n"));
        assert!(out.contains("**Sources**: coolbeans\n"));
        assert!(out.contains("3 out of 7 files have full content"));
        assert!(out.contains("5. **[ID: 5]** T5"));
        assert!(!out.contains("6. **[ID: 6]**"));
        assert!(out.contains("and **2 more results**"));
        assert!(out.contains(&format!("📝 {}...", "d".repeat(120))));
    }

    #[test]
    fn empty_results_give_guidance() {
        let out = ResponseFormatter::new().render(&[], ResponseType::Summary, "zzz");
        assert!(out.contains("couldn't find any files matching your query: 'zzz'"));
        assert!(out.contains("Using broader search terms"));
    }

    #[test]
    fn content_of_2000_chars_is_shown_in_full() {
        let out = ResponseFormatter::new().content_summary(&with_content(2000), "summary");
        assert!(out.contains("**Full Content**:\n"));
        assert!(out.ends_with(&"a".repeat(2000)));
    }

    #[test]
    fn content_of_2001_chars_is_cut_at_1500() {
        let out = ResponseFormatter::new().content_summary(&with_content(2001), "summary");
        assert!(out.contains("(showing first 1,500 characters)"));
        assert!(out.contains("[Content continues... 501 characters remaining]"));
        assert!(!out.contains("**Full Content**"));
    }

    #[test]
    fn content_of_5001_chars_uses_excerpts() {
        let out = ResponseFormatter::new().content_summary(&with_content(5001), "summary");
        assert!(out.contains("**Beginning**:\n"));
        assert!(out.contains("**End**:\n..."));
        assert!(out.contains("[Total content length: 5,001 characters"));
        assert!(!out.contains("**Relevant Section**"));
    }

    #[test]
    fn relevant_section_centres_on_first_long_query_word() {
        let mut text = "x".repeat(3000);
        text.push_str("Dianetics");
        text.push_str(&"y".repeat(3000));
        let file = FileRecord {
            id: 9,
            name: "book".into(),
            content: Some(text),
            ..Default::default()
        };
        let out = ResponseFormatter::new().content_summary(&file, "the ego of dianetics");
        let expected = format!("{}Dianetics{}", "x".repeat(200), "y".repeat(191));
        assert!(out.contains("**Relevant Section** (contains 'dianetics'):\n..."));
        assert!(out.contains(&format!("...{expected}...")));
    }

    #[test]
    fn missing_content_falls_back_to_sample() {
        let mut file = rec(3, "Empty");
        file.content_sample = Some("sample text".into());
        let out = ResponseFormatter::new().content_summary(&file, "q");
        assert!(out.contains("No content available for this file."));
        assert!(out.contains("**Available Content Sample**:\nsample text\n"));
    }

    #[test]
    fn file_name_extraction_order() {
        let f = ResponseFormatter::new();
        assert_eq!(f.extract_file_name(r#"summary of "Self Analysis" please"#), "Self Analysis");
        assert_eq!(
            f.extract_file_name("Please give me a brief summary of the book Science of Survival."),
            "Science of Survival"
        );
        assert_eq!(f.extract_file_name("tell me about Dianetics today"), "Dianetics");
        assert_eq!(f.extract_file_name("Please give me brief Axioms Logics Book Extra"), "axioms logics extra");
    }

    #[test]
    fn file_id_reference_is_detected() {
        let f = ResponseFormatter::new();
        assert_eq!(f.extract_file_id("Please give me a brief summary of ID 42"), Some(42));
        assert_eq!(f.extract_file_id("summary of id: 7"), Some(7));
        assert_eq!(f.extract_file_id("summary of Idea Book"), None);
    }
}

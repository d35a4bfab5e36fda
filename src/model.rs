use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// `index_status` value of a fully indexed file.
pub const FULLY_INDEXED: i64 = 3;

/// Row of the file table, as ingested by the external indexing pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub content_sample: Option<String>,
    pub note: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub source: Option<String>,
    pub date: Option<NaiveDate>,
    pub file_label: Option<String>,
    pub alternate_title: Option<String>,
    pub lecture_series_names: Option<String>,
    pub mimeo_titles: Option<String>,
    pub lrh_article: Option<String>,
    pub file_number: Option<String>,
    pub lecture_code: Option<String>,
    pub url: Option<String>,
    pub index_status: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Text columns the matchers can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Title,
    Description,
    Content,
    ContentSample,
    Note,
    FileLabel,
    AlternateTitle,
    LectureSeriesNames,
    MimeoTitles,
    LrhArticle,
}

impl Field {
    /// Column of the `files` table holding this field.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Title => "title",
            Field::Description => "description",
            Field::Content => "content",
            Field::ContentSample => "content_sample",
            Field::Note => "note",
            Field::FileLabel => "file_label",
            Field::AlternateTitle => "alternate_title",
            Field::LectureSeriesNames => "lecture_series_names",
            Field::MimeoTitles => "mimeo_titles",
            Field::LrhArticle => "lrh_article",
        }
    }
}

impl FileRecord {
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Name => Some(self.name.as_str()),
            Field::Title => self.title.as_deref(),
            Field::Description => self.description.as_deref(),
            Field::Content => self.content.as_deref(),
            Field::ContentSample => self.content_sample.as_deref(),
            Field::Note => self.note.as_deref(),
            Field::FileLabel => self.file_label.as_deref(),
            Field::AlternateTitle => self.alternate_title.as_deref(),
            Field::LectureSeriesNames => self.lecture_series_names.as_deref(),
            Field::MimeoTitles => self.mimeo_titles.as_deref(),
            Field::LrhArticle => self.lrh_article.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Title when present, file name otherwise.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().map(|c| !c.is_empty()).unwrap_or(false)
    }

    /// Content length in characters.
    pub fn content_len(&self) -> usize {
        self.content.as_deref().map(|c| c.chars().count()).unwrap_or(0)
    }

    pub fn formatted_date(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum!(
    /// Which fields a library search looks at.
    SearchMode {
        Comprehensive => "comprehensive",
        NameOnly => "name_only",
        ContentOnly => "content_only",
        ExcludeContent => "exclude_content",
        PartialMatch => "partial_match",
    }
);

named_enum!(ResponseType {
    Summary => "summary",
    List => "list",
    Detailed => "detailed",
    ContentSummary => "content_summary",
});

named_enum!(CountMethod {
    Presence => "presence",
    Frequency => "frequency",
});

named_enum!(MatchType {
    WholeWord => "whole_word",
    Partial => "partial",
    ExactPhrase => "exact_phrase",
});

named_enum!(
    /// Field scope of the keyword-analysis path.
    SearchScope {
        ContentOnly => "content_only",
        TitlesOnly => "titles_only",
        AllFields => "all_fields",
    }
);

named_enum!(ChartType {
    Bar => "bar",
    Line => "line",
    Pie => "pie",
    Doughnut => "doughnut",
});

impl SearchScope {
    pub fn fields(&self) -> &'static [Field] {
        match self {
            SearchScope::ContentOnly => &[Field::Content, Field::ContentSample],
            SearchScope::TitlesOnly => &[Field::Title, Field::Name],
            SearchScope::AllFields => &[
                Field::Content,
                Field::Title,
                Field::Name,
                Field::Description,
                Field::Note,
            ],
        }
    }
}

/// Keywords and pre-filter pulled out of a natural-language chart prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedKeywordPrompt {
    pub keywords: Vec<String>,
    pub search_filter: Option<String>,
}

/// Caller identity handed explicitly into every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub session_id: String,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_ip: None,
            user_agent: None,
        }
    }

    /// Context with a freshly generated session id.
    pub fn anonymous() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Pattern filters the file store applies before any matching.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub source: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "processing" => Some(RequestStatus::Processing),
            "completed" => Some(RequestStatus::Completed),
            "failed" => Some(RequestStatus::Failed),
            _ => None,
        }
    }
}

/// Audit row opened when an operation starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub session_id: String,
    pub request_text: String,
    pub request_type: String,
    pub search_parameters: serde_json::Value,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewRequest {
    pub fn new(
        ctx: &RequestContext,
        request_text: impl Into<String>,
        request_type: impl Into<String>,
        search_parameters: serde_json::Value,
    ) -> Self {
        Self {
            session_id: ctx.session_id.clone(),
            request_text: request_text.into(),
            request_type: request_type.into(),
            search_parameters,
            user_ip: ctx.user_ip.clone(),
            user_agent: ctx.user_agent.clone(),
        }
    }
}

/// Snapshot of a matched file stored on the audit row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoundFile {
    pub id: i64,
    pub name: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub content_sample: Option<String>,
    pub has_content: bool,
    pub content_length: usize,
}

impl From<&FileRecord> for FoundFile {
    fn from(f: &FileRecord) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            title: f.title.clone(),
            file_type: f.file_type.clone(),
            source: f.source.clone(),
            date: f.formatted_date(),
            content_sample: f
                .content_sample
                .as_deref()
                .map(|s| s.chars().take(200).collect()),
            has_content: f.has_content(),
            content_length: f.content_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequestRecord {
    pub id: i64,
    pub session_id: String,
    pub request_text: String,
    pub request_type: String,
    pub search_parameters: serde_json::Value,
    pub response_text: Option<String>,
    pub found_files: Option<Vec<FoundFile>>,
    pub files_count: i64,
    pub status: RequestStatus,
    /// Seconds, three decimals.
    pub processing_time: Option<f64>,
    pub error_message: Option<String>,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

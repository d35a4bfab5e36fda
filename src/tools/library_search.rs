use serde::Deserialize;
use serde_json::{json, Value};

use super::{integer, invalid, one_of, optional_text, required_text, ToolOutput, ToolSpec};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::model::{RequestContext, ResponseType, SearchMode};
use crate::search::{LibrarySearchParams, SearchEngine};

pub const NAME: &str = "coolbeans_library_search";

const MAX_QUERY_CHARS: usize = 1000;
const MAX_FILTER_CHARS: usize = 255;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibrarySearchArgs {
    pub query: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub response_type: Option<String>,
    pub limit: Option<Value>,
    pub search_mode: Option<String>,
    pub file_id: Option<Value>,
}

impl LibrarySearchArgs {
    pub fn validate(self, config: &SearchConfig) -> Result<LibrarySearchParams> {
        let query = required_text(
            self.query,
            MAX_QUERY_CHARS,
            "You must provide a search query.",
            "The query cannot be longer than 1,000 characters.",
        )?;
        let source = optional_text(self.source, MAX_FILTER_CHARS, "The source cannot be longer than 255 characters.")?;
        let file_type = optional_text(self.file_type, MAX_FILTER_CHARS, "The type cannot be longer than 255 characters.")?;
        let response_type = one_of(
            self.response_type.as_deref(),
            ResponseType::from_name,
            ResponseType::Summary,
            "Response type must be one of: summary, list, detailed, or content_summary.",
        )?;
        let limit = match self.limit.filter(|v| !v.is_null()) {
            None => config.default_limit as i64,
            Some(v) => integer(&v).ok_or_else(|| invalid("Limit must be an integer."))?,
        };
        if limit < 1 {
            return Err(invalid("Limit must be at least 1."));
        }
        if limit > config.max_limit as i64 {
            return Err(invalid(format!("Limit cannot exceed {}.", config.max_limit)));
        }
        let search_mode = match self.search_mode.as_deref() {
            None => None,
            Some(mode) => Some(SearchMode::from_name(mode).ok_or_else(|| {
                invalid("Search mode must be one of: comprehensive, name_only, content_only, exclude_content, or partial_match.")
            })?),
        };
        let file_id = match self.file_id.filter(|v| !v.is_null()) {
            None => None,
            Some(v) => Some(integer(&v).ok_or_else(|| invalid("File ID must be an integer."))?),
        };

        Ok(LibrarySearchParams {
            query,
            source,
            file_type,
            response_type,
            limit: limit as usize,
            search_mode,
            file_id,
        })
    }
}

pub fn run(
    engine: &SearchEngine,
    ctx: &RequestContext,
    params: &LibrarySearchParams,
) -> Result<ToolOutput> {
    engine.classify_and_search(ctx, params).map(ToolOutput::text)
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        name: NAME,
        description: "Comprehensive search tool for the CoolBeans Library database. Features: 1) Smart search across multiple fields (titles, content, descriptions, notes) with intelligent mode detection, 2) Content summaries - get full text content of specific files by name or ID, 3) Multiple response formats (summary with IDs, detailed lists, content summaries), 4) Advanced filtering by source/type, 5) Handles natural language queries like \"books about prayer\", \"summary of [filename]\", \"exclude content searches\".",
        input_schema: json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query or content summary request. For searches: keywords, topics, titles. For summaries: \"brief summary of [filename]\" or natural language request."
                },
                "source": {
                    "type": "string",
                    "description": "Optional: Filter by source (e.g., \"coolbeans\", \"lectures\", \"archive\")"
                },
                "type": {
                    "type": "string",
                    "description": "Optional: Filter by file type (e.g., \"book\", \"audio\", \"document\", \"pdf\")"
                },
                "response_type": {
                    "type": "string",
                    "enum": ["summary", "list", "detailed", "content_summary"],
                    "description": "Response format: summary (overview + top results), list (simple list with IDs), detailed (full metadata), content_summary (full content of specific file)"
                },
                "search_mode": {
                    "type": "string",
                    "enum": ["comprehensive", "name_only", "content_only", "exclude_content", "partial_match"],
                    "description": "Search strategy: comprehensive (all fields), name_only (titles/names only), content_only (document content), exclude_content (no content search), partial_match (individual words)"
                },
                "file_id": {
                    "type": "integer",
                    "description": "Optional: Specific file ID for content summary requests"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum search results (1-50, default: 10)"
                }
            }
        }),
    }
}

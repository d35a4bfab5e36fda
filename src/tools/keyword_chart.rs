use serde::Deserialize;
use serde_json::{json, Value};

use super::{invalid, one_of, optional_text, required_text, ToolOutput, ToolSpec};
use crate::counter::CountOptions;
use crate::error::Result;
use crate::model::{ChartType, CountMethod, MatchType, RequestContext, SearchScope};
use crate::search::{ChartReply, KeywordChartParams, SearchEngine};

pub const NAME: &str = "keyword_chart_data";

const MAX_PROMPT_CHARS: usize = 2000;
const MAX_FILTER_CHARS: usize = 255;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeywordChartArgs {
    pub prompt: Option<String>,
    pub count_method: Option<String>,
    pub match_type: Option<String>,
    pub search_scope: Option<String>,
    pub case_sensitive: Option<Value>,
    pub source_filter: Option<String>,
    pub type_filter: Option<String>,
    pub chart_type: Option<String>,
}

/// `true`/`false`, `1`/`0` and their string forms.
fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl KeywordChartArgs {
    pub fn validate(self) -> Result<KeywordChartParams> {
        let prompt = required_text(
            self.prompt,
            MAX_PROMPT_CHARS,
            "You must provide a search prompt.",
            "The prompt cannot be longer than 2,000 characters.",
        )?;
        let method = one_of(
            self.count_method.as_deref(),
            CountMethod::from_name,
            CountMethod::Presence,
            "Count method must be either \"presence\" or \"frequency\".",
        )?;
        let match_type = one_of(
            self.match_type.as_deref(),
            MatchType::from_name,
            MatchType::WholeWord,
            "Match type must be one of: whole_word, partial, exact_phrase.",
        )?;
        let scope = one_of(
            self.search_scope.as_deref(),
            SearchScope::from_name,
            SearchScope::ContentOnly,
            "Search scope must be one of: content_only, titles_only, all_fields.",
        )?;
        let case_sensitive = match self.case_sensitive.filter(|v| !v.is_null()) {
            None => false,
            Some(v) => boolean(&v)
                .ok_or_else(|| invalid("The case sensitive field must be true or false."))?,
        };
        let chart_type = one_of(
            self.chart_type.as_deref(),
            ChartType::from_name,
            ChartType::Bar,
            "Chart type must be one of: bar, line, pie, doughnut.",
        )?;

        Ok(KeywordChartParams {
            prompt,
            counting: CountOptions {
                method,
                match_type,
                scope,
                case_sensitive,
            },
            source_filter: optional_text(
                self.source_filter,
                MAX_FILTER_CHARS,
                "The source filter cannot be longer than 255 characters.",
            )?,
            type_filter: optional_text(
                self.type_filter,
                MAX_FILTER_CHARS,
                "The type filter cannot be longer than 255 characters.",
            )?,
            chart_type,
        })
    }
}

pub fn run(
    engine: &SearchEngine,
    ctx: &RequestContext,
    params: &KeywordChartParams,
) -> Result<ToolOutput> {
    match engine.parse_and_chart(ctx, params)? {
        ChartReply::Chart(chart) => {
            let structured = serde_json::to_value(&chart)?;
            let text = serde_json::to_string_pretty(&structured)?;
            Ok(ToolOutput::text(text).with_structured(structured))
        }
        ChartReply::Message(text) => Ok(ToolOutput::text(text)),
    }
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        name: NAME,
        description: "Generate chart-ready data for keyword analysis across the CoolBeans Library. Parse natural language prompts to extract search filters and keywords, then analyze file content to provide counts for visualization. Supports presence vs frequency counting, various matching methods (whole word, partial, case sensitivity), and different search scopes (content, titles, all fields).",
        input_schema: json!({
            "type": "object",
            "required": ["prompt"],
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Natural language prompt describing the chart analysis. Examples: \"search coolbeans and plot chart of books mentioning evil, pray, money\", \"analyze files for keywords `data`, `analysis`, `results`\""
                },
                "count_method": {
                    "type": "string",
                    "enum": ["presence", "frequency"],
                    "description": "Counting method: \"presence\" counts files containing keyword (default), \"frequency\" counts total occurrences"
                },
                "match_type": {
                    "type": "string",
                    "enum": ["whole_word", "partial", "exact_phrase"],
                    "description": "Matching method: \"whole_word\" (default), \"partial\" (substring), \"exact_phrase\""
                },
                "search_scope": {
                    "type": "string",
                    "enum": ["content_only", "titles_only", "all_fields"],
                    "description": "Search scope: \"content_only\" (default), \"titles_only\", \"all_fields\""
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Whether matching should be case-sensitive (default: false)"
                },
                "source_filter": {
                    "type": "string",
                    "description": "Optional: Filter by source before keyword analysis"
                },
                "type_filter": {
                    "type": "string",
                    "description": "Optional: Filter by file type before keyword analysis"
                },
                "chart_type": {
                    "type": "string",
                    "enum": ["bar", "line", "pie", "doughnut"],
                    "description": "Suggested chart type for visualization (default: bar)"
                }
            }
        }),
    }
}

//! Tool registry: names, input schemas, argument validation and dispatch.

pub mod calculator;
pub mod keyword_chart;
pub mod library_search;
pub mod system_information;
pub mod text_processor;
pub mod weather;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{LibrarySearchError, Result};
use crate::model::RequestContext;
use crate::search::SearchEngine;

pub use calculator::CalculatorArgs;
pub use keyword_chart::KeywordChartArgs;
pub use library_search::LibrarySearchArgs;
pub use system_information::SystemInformationArgs;
pub use text_processor::TextProcessorArgs;
pub use weather::WeatherArgs;

/// A tool invocation as it arrives from a client: `{"name": ..., "arguments": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    Calculator(CalculatorArgs),
    TextProcessor(TextProcessorArgs),
    Weather(WeatherArgs),
    CoolbeansLibrarySearch(LibrarySearchArgs),
    KeywordChartData(KeywordChartArgs),
    SystemInformation(SystemInformationArgs),
}

impl ToolCall {
    /// Builds a call from a tool name and its raw arguments. Missing
    /// arguments are treated as an empty object.
    pub fn from_parts(name: &str, arguments: Option<Value>) -> Result<Self> {
        if !tool_specs().iter().any(|s| s.name == name) {
            return Err(LibrarySearchError::InvalidRequest(format!("unknown tool: {name}")));
        }
        let arguments = match arguments {
            None | Some(Value::Null) => json!({}),
            Some(v) => v,
        };
        serde_json::from_value(json!({ "name": name, "arguments": arguments })).map_err(|e| {
            LibrarySearchError::Validation(format!("Invalid arguments for {name}: {e}"))
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Calculator(_) => calculator::NAME,
            ToolCall::TextProcessor(_) => text_processor::NAME,
            ToolCall::Weather(_) => weather::NAME,
            ToolCall::CoolbeansLibrarySearch(_) => library_search::NAME,
            ToolCall::KeywordChartData(_) => keyword_chart::NAME,
            ToolCall::SystemInformation(_) => system_information::NAME,
        }
    }
}

/// Declared tool metadata as listed to MCP clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        library_search::spec(),
        keyword_chart::spec(),
        calculator::spec(),
        text_processor::spec(),
        weather::spec(),
        system_information::spec(),
    ]
}

/// What a tool hands back: one or more text blocks, optional structured data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: Vec<String>,
    pub structured: Option<Value>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![text.into()],
            ..Default::default()
        }
    }

    pub fn lines(lines: Vec<String>) -> Self {
        Self {
            content: lines,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![message.into()],
            structured: None,
            is_error: true,
        }
    }

    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured = Some(value);
        self
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content.join("\n")
    }

    /// MCP `tools/call` result object.
    pub fn to_mcp_result(&self) -> Value {
        let content: Vec<Value> = self
            .content
            .iter()
            .map(|text| json!({ "type": "text", "text": text }))
            .collect();
        let mut result = json!({ "content": content, "isError": self.is_error });
        if let Some(structured) = &self.structured {
            result["structuredContent"] = structured.clone();
        }
        result
    }
}

/// Validates and runs one tool call. Never fails: problems become error outputs.
pub fn dispatch(engine: &SearchEngine, ctx: &RequestContext, call: ToolCall) -> ToolOutput {
    debug!(tool = call.name(), session_id = %ctx.session_id, "tool call");
    let result = match call {
        ToolCall::Calculator(args) => args.validate().and_then(calculator::run),
        ToolCall::TextProcessor(args) => args.validate().map(text_processor::run),
        ToolCall::Weather(args) => args.validate().map(weather::run),
        ToolCall::CoolbeansLibrarySearch(args) => args
            .validate(engine.config())
            .and_then(|params| library_search::run(engine, ctx, &params)),
        ToolCall::KeywordChartData(args) => args
            .validate()
            .and_then(|params| keyword_chart::run(engine, ctx, &params)),
        ToolCall::SystemInformation(args) => args
            .validate()
            .and_then(|operation| system_information::run(engine, ctx, operation)),
    };
    result.unwrap_or_else(|e| ToolOutput::error(e.to_string()))
}

pub(crate) fn invalid(message: impl Into<String>) -> LibrarySearchError {
    LibrarySearchError::Validation(message.into())
}

/// Required non-empty string no longer than `max` characters.
pub(crate) fn required_text(
    value: Option<String>,
    max: usize,
    missing: &str,
    too_long: &str,
) -> Result<String> {
    let value = value.filter(|v| !v.trim().is_empty()).ok_or_else(|| invalid(missing))?;
    if value.chars().count() > max {
        return Err(invalid(too_long));
    }
    Ok(value)
}

/// Optional filter string; blank counts as absent.
pub(crate) fn optional_text(value: Option<String>, max: usize, too_long: &str) -> Result<Option<String>> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) if v.chars().count() > max => Err(invalid(too_long)),
        other => Ok(other),
    }
}

pub(crate) fn one_of<T>(
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
    default: T,
    message: &str,
) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => parse(v).ok_or_else(|| invalid(message)),
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Integers may arrive as JSON integers or integer strings.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_are_tagged_by_name() {
        let call: ToolCall = serde_json::from_value(json!({
            "name": "calculator",
            "arguments": { "operation": "add", "a": 5, "b": 3 }
        }))
        .unwrap();
        assert_eq!(call.name(), "calculator");
    }

    #[test]
    fn missing_arguments_become_empty_object() {
        let call = ToolCall::from_parts("weather", None).unwrap();
        match call {
            ToolCall::Weather(args) => assert!(args.location.is_none()),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = ToolCall::from_parts("file_browser", None).unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn specs_cover_every_tool() {
        let names: Vec<&str> = tool_specs().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "coolbeans_library_search",
                "keyword_chart_data",
                "calculator",
                "text_processor",
                "weather",
                "system_information"
            ]
        );
        for spec in tool_specs() {
            assert_eq!(spec.input_schema["type"], "object");
        }
    }

    #[test]
    fn mcp_result_shape() {
        let out = ToolOutput::lines(vec!["a".into(), "b".into()]).to_mcp_result();
        assert_eq!(out["content"][1]["text"], "b");
        assert_eq!(out["isError"], false);
        assert!(out.get("structuredContent").is_none());

        let err = ToolOutput::error("nope").to_mcp_result();
        assert_eq!(err["isError"], true);
    }

    #[test]
    fn loose_numbers() {
        assert_eq!(numeric(&json!("2.5")), Some(2.5));
        assert_eq!(numeric(&json!(true)), None);
        assert_eq!(integer(&json!("7")), Some(7));
        assert_eq!(integer(&json!(1.5)), None);
    }
}

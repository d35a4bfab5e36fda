use serde::Deserialize;
use serde_json::json;

use super::{invalid, ToolOutput, ToolSpec};
use crate::config::{Config, ServerMode};
use crate::error::Result;
use crate::mcp::{PROTOCOL_VERSION, SERVER_NAME};
use crate::model::RequestContext;
use crate::search::SearchEngine;

pub const NAME: &str = "system_information";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CrateVersion,
    RuntimeDetails,
    ServerDetails,
    ApplicationConfiguration,
}

impl Operation {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "crate_version" => Some(Operation::CrateVersion),
            "runtime_details" => Some(Operation::RuntimeDetails),
            "server_details" => Some(Operation::ServerDetails),
            "application_configuration" => Some(Operation::ApplicationConfiguration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CrateVersion => "crate_version",
            Operation::RuntimeDetails => "runtime_details",
            Operation::ServerDetails => "server_details",
            Operation::ApplicationConfiguration => "application_configuration",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemInformationArgs {
    pub operation: Option<String>,
}

impl SystemInformationArgs {
    pub fn validate(self) -> Result<Operation> {
        let operation = self.operation.ok_or_else(|| {
            invalid(
                "You must specify an operation: crate_version, runtime_details, server_details, or application_configuration.",
            )
        })?;
        Operation::from_name(&operation).ok_or_else(|| {
            invalid(
                "Operation must be one of: crate_version, runtime_details, server_details, or application_configuration.",
            )
        })
    }
}

pub fn run(engine: &SearchEngine, ctx: &RequestContext, operation: Operation) -> Result<ToolOutput> {
    engine
        .system_information(ctx, operation.as_str(), |config| report(operation, config))
        .map(ToolOutput::text)
}

/// Plain-text answer for one operation.
pub fn report(operation: Operation, config: &Config) -> String {
    match operation {
        Operation::CrateVersion => format!("{SERVER_NAME} {}", env!("CARGO_PKG_VERSION")),
        Operation::RuntimeDetails => lines(&[
            ("os", std::env::consts::OS.to_string()),
            ("family", std::env::consts::FAMILY.to_string()),
            ("arch", std::env::consts::ARCH.to_string()),
            ("pointer_width", format!("{}-bit", usize::BITS)),
            ("profile", profile().to_string()),
        ]),
        Operation::ServerDetails => {
            let server = &config.server;
            let mode = match server.mode {
                ServerMode::Stdio => "stdio",
                ServerMode::Http => "http",
                ServerMode::Both => "both",
            };
            let http = if server.serves_http() {
                server.http_bind()
            } else {
                "disabled".to_string()
            };
            lines(&[
                ("name", SERVER_NAME.to_string()),
                ("protocol_version", PROTOCOL_VERSION.to_string()),
                ("mode", mode.to_string()),
                ("http_bind", http),
                ("process_id", std::process::id().to_string()),
            ])
        }
        Operation::ApplicationConfiguration => lines(&[
            ("db_path", config.store.db_path.display().to_string()),
            ("default_limit", config.search.default_limit.to_string()),
            ("max_limit", config.search.max_limit.to_string()),
        ]),
    }
}

fn profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn lines(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        name: NAME,
        description: "Provides system information including the server version, runtime platform, server details, and application configuration.",
        input_schema: json!({
            "type": "object",
            "required": ["operation"],
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["crate_version", "runtime_details", "server_details", "application_configuration"],
                    "description": "The system information to check."
                }
            }
        }),
    }
}

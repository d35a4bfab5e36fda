use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::{LibrarySearchError, Result};
use crate::model::RequestContext;
use crate::search::SearchEngine;
use crate::tools::{self, ToolCall, ToolOutput};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "library-search-mcp";

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Requests without an id are notifications and get no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self::err(Value::Null, -32700, format!("parse error: {message}"))
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Newline-delimited JSON-RPC over stdin/stdout. One session per process.
pub async fn run_stdio(engine: Arc<SearchEngine>) -> Result<()> {
    let ctx = RequestContext::anonymous();
    info!(session_id = %ctx.session_id, "stdio MCP session started");
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    serve_lines(engine, ctx, BufReader::new(stdin), &mut stdout).await
}

/// Serves every line of `input`, writing one response line per request.
/// A line that is not UTF-8 gets a parse error and the session continues.
pub async fn serve_lines<R, W>(
    engine: Arc<SearchEngine>,
    ctx: RequestContext,
    mut input: R,
    output: &mut W,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(error = %e, "discarding non UTF-8 input line");
                write_response(output, &RpcResponse::parse_error(e.to_string())).await?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<RpcRequest>(line) {
            Ok(req) => handle_request(engine.clone(), &ctx, req).await,
            Err(e) => Some(RpcResponse::parse_error(e.to_string())),
        };
        if let Some(resp) = resp {
            write_response(output, &resp).await?;
        }
    }
    Ok(())
}

/// Dispatches one JSON-RPC request. Returns `None` for notifications.
pub async fn handle_request(
    engine: Arc<SearchEngine>,
    ctx: &RequestContext,
    req: RpcRequest,
) -> Option<RpcResponse> {
    debug!(method = %req.method, "rpc request");
    let resp = match req.method.as_str() {
        "initialize" => RpcResponse::ok(req.id.clone(), initialize_result()),
        "notifications/initialized" | "notifications/cancelled" => {
            if req.is_notification() {
                return None;
            }
            RpcResponse::ok(req.id.clone(), json!({}))
        }
        "ping" => RpcResponse::ok(req.id.clone(), json!({})),
        "tools/list" => RpcResponse::ok(req.id.clone(), json!({ "tools": tools::tool_specs() })),
        "tools/call" => handle_tool_call(engine, ctx, &req).await,
        _ if req.is_notification() => return None,
        _ => RpcResponse::err(
            req.id.clone(),
            -32601,
            format!("method not found: {}", req.method),
        ),
    };
    Some(resp)
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn handle_tool_call(
    engine: Arc<SearchEngine>,
    ctx: &RequestContext,
    req: &RpcRequest,
) -> RpcResponse {
    let params: ToolCallParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => return RpcResponse::err(req.id.clone(), -32602, format!("invalid params: {e}")),
    };
    let call = match ToolCall::from_parts(&params.name, params.arguments) {
        Ok(call) => call,
        Err(e @ LibrarySearchError::InvalidRequest(_)) => {
            return RpcResponse::err(req.id.clone(), -32602, e.to_string())
        }
        // bad arguments are reported as a tool result the model can read
        Err(e) => return RpcResponse::ok(req.id.clone(), ToolOutput::error(e.to_string()).to_mcp_result()),
    };

    match run_tool(engine, ctx.clone(), call).await {
        Ok(output) => RpcResponse::ok(req.id.clone(), output.to_mcp_result()),
        Err(e) => RpcResponse::err(req.id.clone(), -32603, e.to_string()),
    }
}

/// Runs a tool on the blocking pool; the search core is synchronous.
pub async fn run_tool(
    engine: Arc<SearchEngine>,
    ctx: RequestContext,
    call: ToolCall,
) -> Result<ToolOutput> {
    let name = call.name();
    let output = tokio::task::spawn_blocking(move || tools::dispatch(&engine, &ctx, call))
        .await
        .map_err(|e| LibrarySearchError::Internal(e.to_string()))?;
    if output.is_error {
        warn!(tool = name, "tool returned an error result");
    }
    Ok(output)
}

async fn write_response<W: AsyncWrite + Unpin>(out: &mut W, resp: &RpcResponse) -> Result<()> {
    let line = serde_json::to_string(resp)?;
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

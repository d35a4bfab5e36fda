use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{LibrarySearchError, Result};
use crate::mcp::{handle_request, run_tool, RpcRequest};
use crate::model::{RequestContext, ResponseType};
use crate::search::{LibrarySearchParams, SearchEngine};
use crate::tools::{integer, invalid, one_of, optional_text, required_text, ToolCall};

const DEFAULT_RECENT: usize = 10;
const MAX_RECENT: usize = 100;

type SseSender = mpsc::UnboundedSender<Event>;

type Sessions = Arc<RwLock<HashMap<String, SseSender>>>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self {
            engine,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Owned by an SSE stream; unregisters the session when the client goes away.
struct SessionGuard {
    sessions: Sessions,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
        if removed.is_some() {
            info!(session_id = %self.session_id, "SSE session closed");
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    error: String,
}

impl ErrorResponse {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<LibrarySearchError> for ErrorResponse {
    fn from(e: LibrarySearchError) -> Self {
        let status = match &e {
            LibrarySearchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LibrarySearchError::NotFound(_) => StatusCode::NOT_FOUND,
            LibrarySearchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

/// Caller identity from `x-session-id`, `user-agent` and the peer address.
fn request_context(
    headers: &HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    session_id: Option<String>,
) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let mut ctx = match session_id.or_else(|| header("x-session-id")) {
        Some(id) => RequestContext::new(id),
        None => RequestContext::anonymous(),
    };
    ctx.user_agent = header("user-agent");
    ctx.user_ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()));
    ctx
}

/// Body of the web search form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebSearchBody {
    pub query: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub response_type: Option<String>,
    pub limit: Option<Value>,
}

fn web_response_type(name: &str) -> Option<ResponseType> {
    ResponseType::from_name(name).filter(|t| *t != ResponseType::ContentSummary)
}

impl WebSearchBody {
    fn validate(self, max_limit: usize, default_limit: usize) -> Result<LibrarySearchParams> {
        let query = required_text(
            self.query,
            1000,
            "You must provide a search query.",
            "The query cannot be longer than 1,000 characters.",
        )?;
        let response_type = one_of(
            self.response_type.as_deref(),
            web_response_type,
            ResponseType::Summary,
            "Response type must be one of: summary, list, or detailed.",
        )?;
        let limit = match self.limit.filter(|v| !v.is_null()) {
            None => default_limit as i64,
            Some(v) => integer(&v).ok_or_else(|| invalid("Limit must be an integer."))?,
        };
        if limit < 1 {
            return Err(invalid("Limit must be at least 1."));
        }
        if limit > max_limit as i64 {
            return Err(invalid(format!("Limit cannot exceed {max_limit}.")));
        }
        Ok(LibrarySearchParams {
            query,
            source: optional_text(self.source, 255, "The source cannot be longer than 255 characters.")?,
            file_type: optional_text(self.file_type, 255, "The type cannot be longer than 255 characters.")?,
            response_type,
            limit: limit as usize,
            search_mode: None,
            file_id: None,
        })
    }
}

/// Runs a synchronous engine call on the blocking pool.
async fn blocking<T, F>(engine: Arc<SearchEngine>, f: F) -> Result<T>
where
    F: FnOnce(&SearchEngine) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| LibrarySearchError::Internal(e.to_string()))?
}

async fn search_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<WebSearchBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(e) => {
            return ErrorResponse::new(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"))
                .into_response()
        }
    };
    let cfg = state.engine.config();
    let params = match body.validate(cfg.max_limit, cfg.default_limit) {
        Ok(p) => p,
        Err(e) => return ErrorResponse::from(e).into_response(),
    };
    let ctx = request_context(&headers, peer, None);
    match blocking(state.engine.clone(), move |engine| engine.web_search(&ctx, &params)).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            warn!(error = %e, "web search failed");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

async fn recent_requests_handler(
    State(state): State<AppState>,
    q: std::result::Result<Query<RecentQuery>, QueryRejection>,
) -> Response {
    let limit = match q {
        Ok(Query(q)) => q.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT),
        Err(e) => {
            return ErrorResponse::new(StatusCode::BAD_REQUEST, format!("invalid query: {e}"))
                .into_response()
        }
    };
    match blocking(state.engine.clone(), move |engine| engine.recent_requests(limit)).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => ErrorResponse::from(e).into_response(),
    }
}

async fn request_details_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match blocking(state.engine.clone(), move |engine| engine.request(id)).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => ErrorResponse::from(e).into_response(),
    }
}

async fn stats_handler(State(state): State<AppState>) -> Response {
    match blocking(state.engine.clone(), |engine| engine.stats()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => ErrorResponse::from(e).into_response(),
    }
}

async fn tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let arguments = match payload {
        Ok(Json(v)) => Some(v),
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(e) => {
            return ErrorResponse::new(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"))
                .into_response()
        }
    };
    let call = match ToolCall::from_parts(&name, arguments) {
        Ok(call) => call,
        Err(LibrarySearchError::InvalidRequest(msg)) => {
            return ErrorResponse::new(StatusCode::NOT_FOUND, msg).into_response()
        }
        Err(e) => return ErrorResponse::from(e).into_response(),
    };
    let ctx = request_context(&headers, peer, None);
    match run_tool(state.engine.clone(), ctx, call).await {
        Ok(output) => {
            let status = if output.is_error {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::OK
            };
            (status, Json(output.to_mcp_result())).into_response()
        }
        Err(e) => ErrorResponse::from(e).into_response(),
    }
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = uuid::Uuid::new_v4().to_string();

    let endpoint_url = format!("/message?session_id={session_id}");
    let _ = tx.send(Event::default().event("endpoint").data(endpoint_url));

    state
        .sessions
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(session_id.clone(), tx);
    info!(session_id = %session_id, "SSE session opened");

    let guard = SessionGuard {
        sessions: state.sessions.clone(),
        session_id,
    };
    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        let _ = &guard;
        Ok::<_, axum::Error>(event)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<RpcRequest>,
) -> StatusCode {
    let sender = state
        .sessions
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&q.session_id)
        .cloned();

    let Some(sender) = sender else {
        return StatusCode::NOT_FOUND;
    };
    let ctx = request_context(&headers, peer, Some(q.session_id.clone()));
    let engine = state.engine.clone();
    tokio::spawn(async move {
        let Some(resp) = handle_request(engine, &ctx, req).await else {
            return;
        };
        let Ok(json_str) = serde_json::to_string(&resp) else {
            return;
        };
        // the stream's guard unregisters the session once the client is gone
        if sender
            .send(Event::default().event("message").data(json_str))
            .is_err()
        {
            warn!(session_id = %ctx.session_id, "SSE client went away before the response");
        }
    });
    StatusCode::ACCEPTED
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "name": crate::mcp::SERVER_NAME }))
}

pub fn build_router(engine: Arc<SearchEngine>) -> Router {
    router(AppState::new(engine))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/search", post(search_handler))
        .route("/requests", get(recent_requests_handler))
        .route("/requests/:id", get(request_details_handler))
        .route("/stats", get(stats_handler))
        .route("/tools/:name", post(tool_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state)
}

pub async fn serve_http(engine: Arc<SearchEngine>, server: &ServerConfig) -> Result<()> {
    let router = build_router(engine);
    let addr = server.http_bind();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LibrarySearchError::ConfigError(format!("bind {addr} failed: {e}")))?;
    info!(%addr, "HTTP server listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

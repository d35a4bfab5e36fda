//! session_store.rs - Per-request audit log (`mcp_requests`)

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::{FoundFile, NewRequest, RequestStatus, SearchRequestRecord};
use crate::store::{lock, open_connection, timestamp};

const REQUEST_COLUMNS: &str = "id, session_id, request_text, request_type, search_parameters, \
     response_text, found_files, files_count, status, processing_time, error_message, user_ip, \
     user_agent, created_at, updated_at";

/// Fields written when an operation finishes successfully.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub response_text: String,
    pub found_files: Option<Vec<FoundFile>>,
    pub files_count: i64,
    pub processing_time: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub total_requests: i64,
    pub successful_requests: i64,
}

/// Append/update capability against the audit log. The start row and the
/// final update are two separate writes.
pub trait RequestLog: Send + Sync {
    /// Opens a row in `processing` state and returns its id.
    fn start(&self, request: &NewRequest) -> Result<i64>;

    fn complete(&self, id: i64, completion: &Completion) -> Result<()>;

    fn fail(&self, id: i64, error_message: &str, processing_time: f64) -> Result<()>;

    fn get(&self, id: i64) -> Result<Option<SearchRequestRecord>>;

    /// Newest first.
    fn recent(&self, limit: usize) -> Result<Vec<SearchRequestRecord>>;

    fn counts(&self) -> Result<RequestCounts>;
}

pub struct SqliteRequestLog {
    conn: Mutex<Connection>,
}

impl SqliteRequestLog {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(open_connection(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS mcp_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                request_text TEXT NOT NULL,
                request_type TEXT NOT NULL,
                search_parameters TEXT,
                response_text TEXT,
                found_files TEXT,
                files_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                processing_time REAL,
                error_message TEXT,
                user_ip TEXT,
                user_agent TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_requests_session ON mcp_requests(session_id, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_requests_status ON mcp_requests(status);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

fn row_to_request(row: &Row<'_>) -> rusqlite::Result<SearchRequestRecord> {
    let params_json: Option<String> = row.get(4)?;
    let found_json: Option<String> = row.get(6)?;
    let status: String = row.get(8)?;
    Ok(SearchRequestRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        request_text: row.get(2)?,
        request_type: row.get(3)?,
        search_parameters: params_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or(serde_json::Value::Null),
        response_text: row.get(5)?,
        found_files: found_json.and_then(|s| serde_json::from_str(&s).ok()),
        files_count: row.get(7)?,
        status: RequestStatus::from_name(&status).unwrap_or(RequestStatus::Pending),
        processing_time: row.get(9)?,
        error_message: row.get(10)?,
        user_ip: row.get(11)?,
        user_agent: row.get(12)?,
        created_at: timestamp(row.get(13)?),
        updated_at: timestamp(row.get(14)?),
    })
}

impl RequestLog for SqliteRequestLog {
    fn start(&self, request: &NewRequest) -> Result<i64> {
        let params_json = serde_json::to_string(&request.search_parameters)?;
        let now = Utc::now().timestamp();
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO mcp_requests (session_id, request_text, request_type, search_parameters,
                 files_count, status, user_ip, user_agent, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?8)",
            params![
                request.session_id,
                request.request_text,
                request.request_type,
                params_json,
                RequestStatus::Processing.as_str(),
                request.user_ip,
                request.user_agent,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(request_id = id, session_id = %request.session_id, "audit row opened");
        Ok(id)
    }

    fn complete(&self, id: i64, completion: &Completion) -> Result<()> {
        let found_json = completion
            .found_files
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = lock(&self.conn)?;
        conn.execute(
            "UPDATE mcp_requests
             SET status = ?2, response_text = ?3, found_files = ?4, files_count = ?5,
                 processing_time = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                RequestStatus::Completed.as_str(),
                completion.response_text,
                found_json,
                completion.files_count,
                round_millis(completion.processing_time),
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    fn fail(&self, id: i64, error_message: &str, processing_time: f64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "UPDATE mcp_requests
             SET status = ?2, error_message = ?3, processing_time = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                RequestStatus::Failed.as_str(),
                error_message,
                round_millis(processing_time),
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<SearchRequestRecord>> {
        let conn = lock(&self.conn)?;
        let record = conn
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM mcp_requests WHERE id = ?1"),
                params![id],
                row_to_request,
            )
            .optional()?;
        Ok(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<SearchRequestRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM mcp_requests ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let records = stmt
            .query_map(params![limit as i64], row_to_request)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn counts(&self) -> Result<RequestCounts> {
        let conn = lock(&self.conn)?;
        let (total_requests, successful_requests) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END), 0)
             FROM mcp_requests",
            params![RequestStatus::Completed.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(RequestCounts {
            total_requests,
            successful_requests,
        })
    }
}

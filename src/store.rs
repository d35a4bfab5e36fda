//! store.rs - Read access to the indexed file library

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LibrarySearchError, Result};
use crate::model::{FileRecord, RecordFilter, FULLY_INDEXED};
use crate::query::FileQuery;

const FILE_COLUMNS: &str = "id, name, title, description, content, content_sample, note, type, \
     source, date, file_label, alternate_title, lecture_series_names, mimeo_titles, lrh_article, \
     file_number, lecture_code, url, index_status, deleted_at, created_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub total_files: i64,
    pub indexed_files: i64,
}

/// Record-query capability. Every read is limited to non-deleted, fully indexed files.
pub trait FileStore: Send + Sync {
    /// Searchable files matching the source/type patterns, newest first.
    fn searchable_files(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>>;

    /// At most `query.limit` searchable files accepted by `query`, newest first.
    fn search(&self, query: &FileQuery) -> Result<Vec<FileRecord>>;

    fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>>;

    fn stats(&self) -> Result<FileStats>;
}

/// Opens a file-backed connection with WAL and a busy timeout.
pub(crate) fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous  = NORMAL;",
    )?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(conn)
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| LibrarySearchError::Internal("database connection lock poisoned".into()))
}

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

pub struct SqliteFileStore {
    conn: Mutex<Connection>,
}

impl SqliteFileStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(open_connection(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS files (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                name                 TEXT NOT NULL,
                title                TEXT,
                description          TEXT,
                content              TEXT,
                content_sample       TEXT,
                note                 TEXT,
                type                 TEXT,
                source               TEXT,
                date                 TEXT,
                file_label           TEXT,
                alternate_title      TEXT,
                lecture_series_names TEXT,
                mimeo_titles         TEXT,
                lrh_article          TEXT,
                file_number          TEXT,
                lecture_code         TEXT,
                url                  TEXT,
                index_status         INTEGER NOT NULL DEFAULT 0,
                deleted_at           INTEGER,
                created_at           INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_files_searchable ON files(index_status, deleted_at);
            CREATE INDEX IF NOT EXISTS idx_files_created ON files(created_at);",
        )?;
        Ok(())
    }

    /// Inserts a file row as the indexing pipeline would; returns the new id.
    /// A zero `id` lets SQLite assign one.
    pub fn insert(&self, record: &FileRecord) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let id = (record.id != 0).then_some(record.id);
        conn.execute(
            &format!(
                "INSERT INTO files ({FILE_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
            ),
            params![
                id,
                record.name,
                record.title,
                record.description,
                record.content,
                record.content_sample,
                record.note,
                record.file_type,
                record.source,
                record.date.map(|d| d.format("%Y-%m-%d").to_string()),
                record.file_label,
                record.alternate_title,
                record.lecture_series_names,
                record.mimeo_titles,
                record.lrh_article,
                record.file_number,
                record.lecture_code,
                record.url,
                record.index_status,
                record.deleted_at.map(|d| d.timestamp()),
                record.created_at.timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let date: Option<String> = row.get(9)?;
    let deleted_at: Option<i64> = row.get(19)?;
    Ok(FileRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        content: row.get(4)?,
        content_sample: row.get(5)?,
        note: row.get(6)?,
        file_type: row.get(7)?,
        source: row.get(8)?,
        date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        file_label: row.get(10)?,
        alternate_title: row.get(11)?,
        lecture_series_names: row.get(12)?,
        mimeo_titles: row.get(13)?,
        lrh_article: row.get(14)?,
        file_number: row.get(15)?,
        lecture_code: row.get(16)?,
        url: row.get(17)?,
        index_status: row.get(18)?,
        deleted_at: deleted_at.map(timestamp),
        created_at: timestamp(row.get(20)?),
    })
}

/// `SELECT` over searchable files, built up clause by clause.
struct SearchSql {
    text: String,
    args: Vec<Value>,
}

impl SearchSql {
    fn new(filter: &RecordFilter) -> Self {
        let mut sql = Self {
            text: format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE deleted_at IS NULL AND index_status = ?"
            ),
            args: vec![Value::Integer(FULLY_INDEXED)],
        };
        if let Some(source) = &filter.source {
            sql.text.push_str(" AND source LIKE ?");
            sql.args.push(Value::Text(format!("%{source}%")));
        }
        if let Some(file_type) = &filter.file_type {
            sql.text.push_str(" AND type LIKE ?");
            sql.args.push(Value::Text(format!("%{file_type}%")));
        }
        sql
    }

    /// Any term, as a literal substring, in any of the query's fields.
    fn any_field_like(&mut self, query: &FileQuery) {
        if query.terms.is_empty() || query.fields.is_empty() {
            return;
        }
        let mut clauses = Vec::with_capacity(query.terms.len() * query.fields.len());
        for term in &query.terms {
            let pattern = format!("%{}%", escape_like(term));
            for field in query.fields {
                clauses.push(format!("{} LIKE ? ESCAPE '\\'", field.column()));
                self.args.push(Value::Text(pattern.clone()));
            }
        }
        self.text.push_str(&format!(" AND ({})", clauses.join(" OR ")));
    }

    fn order_by_newest(&mut self) {
        self.text.push_str(" ORDER BY created_at DESC, id DESC");
    }

    fn limit(&mut self, limit: usize) {
        self.text.push_str(" LIMIT ?");
        self.args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl FileStore for SqliteFileStore {
    fn searchable_files(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>> {
        let mut sql = SearchSql::new(filter);
        sql.order_by_newest();
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql.text)?;
        let files = stmt
            .query_map(params_from_iter(sql.args), row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    fn search(&self, query: &FileQuery) -> Result<Vec<FileRecord>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let mut sql = SearchSql::new(&query.filter);
        // SQLite LIKE folds ASCII case only; other terms are checked row by row below
        let pushed_down = query.terms.iter().all(|t| t.is_ascii());
        if pushed_down {
            sql.any_field_like(query);
        }
        sql.order_by_newest();
        if pushed_down {
            sql.limit(query.limit);
        }

        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql.text)?;
        let mut rows = stmt.query(params_from_iter(sql.args))?;
        let mut files = Vec::new();
        while files.len() < query.limit {
            let Some(row) = rows.next()? else {
                break;
            };
            let file = row_to_file(row)?;
            if query.matches(&file) {
                files.push(file);
            }
        }
        debug!(
            terms = query.terms.len(),
            pushed_down,
            files = files.len(),
            "file search"
        );
        Ok(files)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let conn = lock(&self.conn)?;
        let file = conn
            .query_row(
                &format!(
                    "SELECT {FILE_COLUMNS} FROM files
                     WHERE id = ?1 AND deleted_at IS NULL AND index_status = ?2"
                ),
                params![id, FULLY_INDEXED],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    fn stats(&self) -> Result<FileStats> {
        let conn = lock(&self.conn)?;
        let (total_files, indexed_files) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN index_status = ?1 THEN 1 ELSE 0 END), 0)
             FROM files WHERE deleted_at IS NULL",
            params![FULLY_INDEXED],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(FileStats {
            total_files,
            indexed_files,
        })
    }
}

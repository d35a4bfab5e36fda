use std::sync::Arc;

use library_search_mcp::model::{FoundFile, NewRequest, RequestContext, RequestStatus};
use library_search_mcp::session_store::{Completion, RequestLog, SqliteRequestLog};
use serde_json::json;
use tempfile::tempdir;

fn new_request(session: &str, text: &str) -> NewRequest {
    let mut ctx = RequestContext::new(session);
    ctx.user_ip = Some("10.0.0.7".into());
    ctx.user_agent = Some("integration-test".into());
    NewRequest::new(&ctx, text, "summary", json!({ "query": text, "limit": 10 }))
}

fn found(id: i64, name: &str) -> FoundFile {
    FoundFile {
        id,
        name: name.into(),
        title: None,
        file_type: Some("book".into()),
        source: Some("coolbeans".into()),
        date: None,
        content_sample: Some("sample".into()),
        has_content: true,
        content_length: 6,
    }
}

#[test]
fn test_start_then_complete_persists_everything() {
    let dir = tempdir().unwrap();
    let log = SqliteRequestLog::open(&dir.path().join("audit.sqlite")).unwrap();

    let id = log.start(&new_request("s-1", "books about prayer")).unwrap();
    let open = log.get(id).unwrap().unwrap();
    assert_eq!(open.status, RequestStatus::Processing);
    assert_eq!(open.files_count, 0);
    assert_eq!(open.search_parameters["limit"], 10);
    assert_eq!(open.user_ip.as_deref(), Some("10.0.0.7"));
    assert_eq!(open.user_agent.as_deref(), Some("integration-test"));

    log.complete(
        id,
        &Completion {
            response_text: "Found 2 files".into(),
            found_files: Some(vec![found(1, "a.txt"), found(2, "b.txt")]),
            files_count: 2,
            processing_time: 0.123456,
        },
    )
    .unwrap();

    let done = log.get(id).unwrap().unwrap();
    assert_eq!(done.status, RequestStatus::Completed);
    assert_eq!(done.response_text.as_deref(), Some("Found 2 files"));
    assert_eq!(done.files_count, 2);
    assert_eq!(done.processing_time, Some(0.123));
    let files = done.found_files.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1], found(2, "b.txt"));
    assert!(done.error_message.is_none());
}

#[test]
fn test_fail_records_error_and_elapsed() {
    let log = SqliteRequestLog::open_in_memory().unwrap();
    let id = log.start(&new_request("s-2", "evil")).unwrap();
    log.fail(id, "database error: disk I/O error", 0.0456).unwrap();

    let rec = log.get(id).unwrap().unwrap();
    assert_eq!(rec.status, RequestStatus::Failed);
    assert_eq!(rec.error_message.as_deref(), Some("database error: disk I/O error"));
    assert_eq!(rec.processing_time, Some(0.046));
    assert!(rec.response_text.is_none());
}

#[test]
fn test_recent_is_newest_first_and_counts_only_completed() {
    let log = SqliteRequestLog::open_in_memory().unwrap();
    let mut ids = vec![];
    for i in 0..5 {
        ids.push(log.start(&new_request("s-3", &format!("q{i}"))).unwrap());
    }
    log.complete(ids[0], &Completion::default()).unwrap();
    log.complete(ids[1], &Completion::default()).unwrap();
    log.fail(ids[2], "boom", 0.0).unwrap();

    let recent = log.recent(3).unwrap();
    let recent_ids: Vec<i64> = recent.iter().map(|r| r.id).collect();
    assert_eq!(recent_ids, vec![ids[4], ids[3], ids[2]]);

    let counts = log.counts().unwrap();
    assert_eq!(counts.total_requests, 5);
    assert_eq!(counts.successful_requests, 2);

    assert!(log.get(9999).unwrap().is_none());
}

#[test]
fn test_empty_log_counts_zero() {
    let log = SqliteRequestLog::open_in_memory().unwrap();
    let counts = log.counts().unwrap();
    assert_eq!(counts.total_requests, 0);
    assert_eq!(counts.successful_requests, 0);
    assert!(log.recent(10).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_get_unique_ids() {
    let dir = tempdir().unwrap();
    let log = Arc::new(SqliteRequestLog::open(&dir.path().join("audit.sqlite")).unwrap());

    let mut handles = vec![];
    for i in 0..20u32 {
        let log = log.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let id = log.start(&new_request("s-4", &format!("q{i}"))).unwrap();
            log.complete(id, &Completion::default()).unwrap();
            id
        }));
    }
    let mut ids = vec![];
    for h in handles {
        ids.push(h.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(log.counts().unwrap().successful_requests, 20);
}

#[test]
fn test_reopen_keeps_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("audit.sqlite");
    let id = {
        let log = SqliteRequestLog::open(&path).unwrap();
        log.start(&new_request("s-5", "persisted")).unwrap()
    };
    let log = SqliteRequestLog::open(&path).unwrap();
    let rec = log.get(id).unwrap().unwrap();
    assert_eq!(rec.request_text, "persisted");
    assert_eq!(rec.session_id, "s-5");
}

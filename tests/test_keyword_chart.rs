use std::sync::Arc;

use chrono::Utc;
use library_search_mcp::model::{FileRecord, RequestContext, RequestStatus, FULLY_INDEXED};
use library_search_mcp::search::{SearchEngine, NO_KEYWORDS_MESSAGE};
use library_search_mcp::session_store::SqliteRequestLog;
use library_search_mcp::store::SqliteFileStore;
use library_search_mcp::tools::{dispatch, ToolCall};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

fn file(name: &str, content: &str) -> FileRecord {
    FileRecord {
        name: name.into(),
        content: Some(content.into()),
        source: Some("coolbeans".into()),
        file_type: Some("book".into()),
        index_status: FULLY_INDEXED,
        created_at: Utc::now(),
        ..Default::default()
    }
}

fn engine_with(files: &[FileRecord]) -> (TempDir, SearchEngine) {
    let dir = tempdir().unwrap();
    let db = dir.path().join("library.sqlite");
    let store = SqliteFileStore::open(&db).unwrap();
    for f in files {
        store.insert(f).unwrap();
    }
    let log = SqliteRequestLog::open(&db).unwrap();
    (dir, SearchEngine::new(Arc::new(store), Arc::new(log)))
}

fn chart(engine: &SearchEngine, arguments: Value) -> Value {
    let call = ToolCall::from_parts("keyword_chart_data", Some(arguments)).unwrap();
    let out = dispatch(engine, &RequestContext::new("chart-test"), call);
    assert!(!out.is_error, "unexpected tool error: {:?}", out.content);
    let structured = out.structured.clone().expect("chart output carries structured data");
    let text: Value = serde_json::from_str(&out.content[0]).unwrap();
    assert_eq!(text, structured);
    structured
}

#[test]
fn test_filter_clause_then_presence_counts() {
    let (_dir, engine) = engine_with(&[
        file("one.txt", "coolbeans lecture: evil and how to pray"),
        file("two.txt", "coolbeans notes on evil"),
        file("three.txt", "coolbeans. Evil deeds are discussed"),
        file("four.txt", "coolbeans archive with nothing relevant"),
        file("five.txt", "evil evil pray pray, but not in the filtered set"),
    ]);

    let out = chart(
        &engine,
        json!({ "prompt": "coolbeans and plot chart of books mentioning evil, pray" }),
    );
    assert_eq!(out["chart_config"]["type"], "bar");
    assert_eq!(out["chart_config"]["data"]["labels"], json!(["evil", "pray"]));
    assert_eq!(out["raw_data"]["counts"], json!([3, 1]));
    assert_eq!(out["metadata"]["total_files_searched"], 4);
    assert_eq!(out["metadata"]["search_filter"], "coolbeans");
    assert_eq!(out["metadata"]["keywords_analyzed"], 2);
    assert_eq!(out["metadata"]["max_count"], 3);
    assert_eq!(out["metadata"]["min_count"], 1);
    assert_eq!(out["metadata"]["average_count"], 2.0);
    assert_eq!(
        out["chart_config"]["data"]["datasets"][0]["backgroundColor"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_quoted_keywords_with_books_filter() {
    let (_dir, engine) = engine_with(&[
        file("a.txt", "books on faith and hope"),
        file("b.txt", "books about faith"),
        file("c.txt", "faith hope, no filter word here"),
    ]);

    let out = chart(
        &engine,
        json!({ "prompt": "find books mentioning \"faith\", \"hope\" and plot a chart" }),
    );
    assert_eq!(out["raw_data"]["keywords"], json!(["faith", "hope"]));
    assert_eq!(out["raw_data"]["counts"], json!([2, 1]));
    assert_eq!(out["metadata"]["search_filter"], "books");
    assert_eq!(out["metadata"]["total_files_searched"], 2);
}

#[test]
fn test_frequency_counts_every_occurrence() {
    let (_dir, engine) = engine_with(&[
        file("a.txt", "the cat sat with another cat"),
        file("b.txt", "a cat"),
    ]);

    let presence = chart(&engine, json!({ "prompt": "files mentioning cat" }));
    assert_eq!(presence["raw_data"]["counts"], json!([2]));

    let frequency = chart(
        &engine,
        json!({ "prompt": "files mentioning cat", "count_method": "frequency", "chart_type": "pie" }),
    );
    assert_eq!(frequency["raw_data"]["counts"], json!([3]));
    assert_eq!(frequency["metadata"]["count_method"], "frequency");
    assert_eq!(frequency["chart_config"]["type"], "pie");
    assert_eq!(frequency["chart_config"]["options"]["plugins"]["legend"]["display"], true);
}

#[test]
fn test_titles_only_scope_and_source_filter() {
    let mut titled = file("x.txt", "prayer everywhere in the content");
    titled.title = Some("On Prayer".into());
    let mut archived = file("y.txt", "nothing");
    archived.title = Some("Prayer in the archive".into());
    archived.source = Some("archive".into());
    let (_dir, engine) = engine_with(&[titled, archived, file("z.txt", "prayer")]);

    let out = chart(
        &engine,
        json!({
            "prompt": "files mentioning prayer",
            "search_scope": "titles_only",
            "source_filter": "coolbeans"
        }),
    );
    assert_eq!(out["metadata"]["total_files_searched"], 2);
    assert_eq!(out["raw_data"]["counts"], json!([1]));
}

#[test]
fn test_no_keywords_returns_guidance_and_audits_completed() {
    let (_dir, engine) = engine_with(&[file("a.txt", "anything")]);
    let call = ToolCall::from_parts(
        "keyword_chart_data",
        Some(json!({ "prompt": "show me a chart of everything" })),
    )
    .unwrap();
    let out = dispatch(&engine, &RequestContext::new("chart-test"), call);
    assert!(!out.is_error);
    assert!(out.structured.is_none());
    assert_eq!(out.content, vec![NO_KEYWORDS_MESSAGE.to_string()]);

    let recent = engine.recent_requests(1).unwrap();
    assert_eq!(recent[0].status, RequestStatus::Completed);
    assert_eq!(recent[0].files_count, 0);
    assert_eq!(recent[0].request_type, "keyword_chart_data");
}

#[test]
fn test_invalid_arguments_are_tool_errors() {
    let (_dir, engine) = engine_with(&[]);
    let call = ToolCall::from_parts(
        "keyword_chart_data",
        Some(json!({ "prompt": "mentioning a", "match_type": "fuzzy" })),
    )
    .unwrap();
    let out = dispatch(&engine, &RequestContext::new("chart-test"), call);
    assert!(out.is_error);
    assert_eq!(
        out.content[0],
        "Match type must be one of: whole_word, partial, exact_phrase."
    );
    assert!(engine.recent_requests(10).unwrap().is_empty());
}

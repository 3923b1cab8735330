//! End-to-end pipeline tests against the in-memory destination

mod common;

use common::{init_test_tracing, log_line, write_log, MemoryConnector, MEMORY_TABLE};
use logduct_ingest::error::{LoadError, ParseFailure};
use logduct_ingest::pipeline::{parse_source, run};
use logduct_ingest::{BatchJob, IngestError};

fn job_for(file: &tempfile::NamedTempFile) -> BatchJob {
    BatchJob::new(file.path()).with_table(MEMORY_TABLE)
}

fn three_lines() -> Vec<String> {
    vec![
        log_line("200", "512", "-"),
        log_line("404", "0", "-"),
        log_line("500", "100", "0.125"),
    ]
}

#[tokio::test]
async fn test_default_format_three_lines() {
    init_test_tracing();
    let file = write_log(&three_lines());
    let connector = MemoryConnector::new();

    let report = run(&job_for(&file), &connector).await.unwrap();

    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_inserted, 3);
    assert!(!report.truncated);

    let table = connector.table.lock().unwrap();
    let statuses: Vec<_> = table.rows.iter().map(|r| r.status).collect();
    let bytes: Vec<_> = table.rows.iter().map(|r| r.body_bytes_sent).collect();
    let upstream: Vec<_> = table.rows.iter().map(|r| r.upstream_response_time).collect();
    let lines: Vec<_> = table.rows.iter().map(|r| r.line_no).collect();

    assert_eq!(statuses, vec![200, 404, 500]);
    assert_eq!(bytes, vec![512, 0, 100]);
    assert_eq!(upstream, vec![0.0, 0.0, 0.125]);
    assert_eq!(lines, vec![1, 2, 3]);
    assert_eq!(table.rows[0].host, "shop.example.com");
    assert_eq!(table.rows[0].remote_user, "-");
    assert_eq!(table.rows[0].request_time, 0.010);
}

#[tokio::test]
async fn test_max_lines_stops_reading() {
    let mut lines = three_lines();
    lines.truncate(2);
    // Lines 3-5 would fail to parse if they were read
    lines.extend(["not a log line".to_string(), String::new(), "\u{0}".to_string()]);
    let file = write_log(&lines);
    let connector = MemoryConnector::new();

    let report = run(&job_for(&file).with_max_lines(2), &connector).await.unwrap();

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_inserted, 2);
    assert_eq!(connector.row_count(), 2);
}

#[tokio::test]
async fn test_truncate_replaces_existing_rows() {
    let file = write_log(&three_lines());
    let connector = MemoryConnector::with_existing_rows(10);

    let report = run(&job_for(&file).with_truncate(true), &connector).await.unwrap();

    assert_eq!(report.rows_inserted, 3);
    assert!(report.truncated);
    assert_eq!(connector.row_count(), 3);
    assert_eq!(connector.calls(), vec!["ensure_table", "truncate", "bulk_insert"]);

    let table = connector.table.lock().unwrap();
    assert!(table.rows.iter().all(|r| r.host != "previous-run.example"));
}

#[tokio::test]
async fn test_without_truncate_rows_are_appended() {
    let file = write_log(&three_lines());
    let connector = MemoryConnector::with_existing_rows(10);

    let report = run(&job_for(&file), &connector).await.unwrap();

    assert_eq!(report.rows_inserted, 3);
    assert_eq!(connector.row_count(), 13);
    assert_eq!(connector.calls(), vec!["ensure_table", "bulk_insert"]);
}

#[tokio::test]
async fn test_invalid_status_aborts_before_connecting() {
    let file = write_log(&[
        log_line("200", "512", "-"),
        log_line("abc", "0", "-"),
        log_line("500", "100", "0.125"),
    ]);
    let connector = MemoryConnector::with_existing_rows(10);

    let err = run(&job_for(&file).with_truncate(true), &connector)
        .await
        .unwrap_err();

    match err {
        IngestError::Validation(e) => {
            assert_eq!(e.line(), 2);
            assert_eq!(e.field(), "status");
        },
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(connector.connect_count(), 0);
    assert_eq!(connector.row_count(), 10);
}

#[tokio::test]
async fn test_trailing_text_after_last_field_loads() {
    let file = write_log(&[
        format!("{} \"extra\"", log_line("200", "512", "-")),
        format!("{} 0.2 trailing", log_line("502", "0", "0.125")),
    ]);
    let connector = MemoryConnector::new();

    let report = run(&job_for(&file), &connector).await.unwrap();

    assert_eq!(report.rows_inserted, 2);
    let table = connector.table.lock().unwrap();
    assert_eq!(table.rows[0].upstream_response_time, 0.0);
    assert_eq!(table.rows[1].upstream_response_time, 0.125);
    assert_eq!(table.rows[1].status, 502);
}

#[tokio::test]
async fn test_request_time_placeholder_aborts() {
    let line = log_line("200", "1", "-").replace(" 0.010 ", " - ");
    let file = write_log(&[line]);
    let connector = MemoryConnector::new();

    let err = run(&job_for(&file), &connector).await.unwrap_err();

    assert!(matches!(err, IngestError::Validation(ref e) if e.field() == "request_time"));
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn test_unparseable_line_aborts_with_line_number() {
    let file = write_log(&[
        log_line("200", "512", "-"),
        log_line("200", "512", "-"),
        "GET /favicon.ico".to_string(),
    ]);
    let connector = MemoryConnector::new();

    let err = run(&job_for(&file), &connector).await.unwrap_err();

    match err {
        IngestError::Parse(e) => {
            assert_eq!(e.line, 3);
            assert_eq!(e.reason, ParseFailure::NoMatch);
        },
        other => panic!("expected parse error, got {:?}", other),
    }
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn test_bad_template_fails_before_opening_source() {
    let job = BatchJob::new("/nonexistent/access.log").with_format("$status $");
    let connector = MemoryConnector::new();

    let err = run(&job, &connector).await.unwrap_err();

    assert!(matches!(err, IngestError::Template(_)));
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn test_missing_source_file() {
    let job = BatchJob::new("/nonexistent/access.log");
    let connector = MemoryConnector::new();

    let err = run(&job, &connector).await.unwrap_err();

    assert!(matches!(err, IngestError::Source { .. }));
    assert!(err.to_string().contains("/nonexistent/access.log"));
}

#[tokio::test]
async fn test_truncate_failure_skips_insert() {
    let file = write_log(&three_lines());
    let connector = MemoryConnector::with_existing_rows(4).failing_truncate();

    let err = run(&job_for(&file).with_truncate(true), &connector)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Load(LoadError::Truncate { .. })));
    assert_eq!(connector.calls(), vec!["ensure_table", "truncate"]);
    assert_eq!(connector.row_count(), 4);
}

#[tokio::test]
async fn test_count_mismatch_is_a_failure() {
    let file = write_log(&three_lines());
    let connector = MemoryConnector::new().under_reporting();

    let err = run(&job_for(&file), &connector).await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::Load(LoadError::CountMismatch {
            expected: 3,
            inserted: 2,
            ..
        })
    ));
}

#[tokio::test]
async fn test_empty_file_loads_nothing() {
    let file = write_log::<&str>(&[]);
    let connector = MemoryConnector::new();

    let report = run(&job_for(&file), &connector).await.unwrap();

    assert_eq!(report.rows_inserted, 0);
    assert_eq!(connector.calls(), vec!["ensure_table", "bulk_insert"]);
}

#[test]
fn test_custom_format() {
    let file = write_log(&["GET / HTTP/1.1|200|0|-|0.002|-|example.org|-|now|-|curl|::1"]);
    let format = "$request|$status|$body_bytes_sent|$upstream_response_time|$request_time|\
                  $http_x_forwarded_for|$host|$remote_user|$time_local|$http_referer|\
                  $http_user_agent|$remote_addr";
    let job = BatchJob::new(file.path()).with_format(format);

    let batch = parse_source(&job).unwrap();

    assert_eq!(batch.len(), 1);
    let row = &batch.rows()[0];
    assert_eq!(row.remote_addr, "::1");
    assert_eq!(row.request_time, 0.002);
    assert_eq!(row.upstream_response_time, 0.0);
}

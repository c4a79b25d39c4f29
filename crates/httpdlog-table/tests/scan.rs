//! End-to-end tests: SQL over log files through the registered table
//! functions.

use std::io::Write;
use std::path::PathBuf;

use arrow::array::{Array, BooleanArray, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use httpdlog_table::{register_httpdlog_functions, ScanConfig};

const S1_LINE: &str =
    r#"127.0.0.1 - alice [10/Oct/2000:13:55:36 -0700] "GET /idx HTTP/1.1" 200 2326"#;
const COMBINED_LINE: &str = r#"10.2.3.4 - - [29/Jan/2026:10:59:12 +0000] "POST /api/v1/data HTTP/1.1" 500 77 "https://example.com/start" "curl/7.68.0""#;

#[fixture]
fn ctx() -> SessionContext {
    let ctx = SessionContext::new();
    register_httpdlog_functions(&ctx, ScanConfig::default());
    ctx
}

fn write_log(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

async fn collect(ctx: &SessionContext, sql: &str) -> Vec<RecordBatch> {
    ctx.sql(sql).await.unwrap().collect().await.unwrap()
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
}

#[rstest]
#[tokio::test]
async fn common_format_end_to_end(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &[S1_LINE]);

    let sql = format!(
        "SELECT * FROM read_httpd_log('{}', 'common')",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 1);

    assert_eq!(string_column(batch, "client_host").value(0), "127.0.0.1");
    assert!(string_column(batch, "ident").is_null(0));
    assert_eq!(string_column(batch, "auth_user").value(0), "alice");
    assert_eq!(string_column(batch, "method").value(0), "GET");
    assert_eq!(string_column(batch, "path").value(0), "/idx");
    assert!(string_column(batch, "query_string").is_null(0));
    assert_eq!(string_column(batch, "protocol").value(0), "HTTP/1.1");
    assert_eq!(
        string_column(batch, "log_file").value(0),
        log.to_string_lossy()
    );

    let status = batch
        .column_by_name("status")
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert_eq!(status.value(0), 200);

    let bytes = batch
        .column_by_name("bytes")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(bytes.value(0), 2326);

    // Default schema carries no diagnostics.
    assert!(batch.column_by_name("parse_error").is_none());
    assert!(batch.column_by_name("raw_line").is_none());
}

#[rstest]
#[tokio::test]
async fn timestamp_is_utc(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &[S1_LINE]);

    let sql = format!(
        "SELECT arrow_cast(timestamp, 'Utf8') AS ts FROM read_httpd_log('{}', 'common')",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    let ts = string_column(&batches[0], "ts").value(0).to_owned();
    assert!(ts.starts_with("2000-10-10T20:55:36"), "got {ts}");
}

#[rstest]
#[tokio::test]
async fn projection_and_aggregation(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &[S1_LINE, S1_LINE, "garbage"]);

    let sql = format!(
        "SELECT count(*) AS n FROM read_httpd_log('{}', 'common')",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    let n = batches[0]
        .column_by_name("n")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(n.value(0), 2);

    let sql = format!(
        "SELECT path FROM read_httpd_log('{}', 'common')",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    assert_eq!(batches[0].num_columns(), 1);
    assert_eq!(string_column(&batches[0], "path").value(0), "/idx");
}

#[rstest]
#[tokio::test]
async fn raw_mode_keeps_parse_errors(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &["garbage"]);

    let sql = format!(
        "SELECT * FROM read_httpd_log('{}', 'common', NULL, true)",
        log.display()
    );
    // NULL format_str is rejected; pass the format positionally instead.
    let err = ctx.sql(&sql).await;
    assert!(err.is_err());

    let sql = format!(
        "SELECT * FROM read_httpd_log('{}', 'common', '%h %l %u %t \"%r\" %>s %b', true)",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 1);

    let errors = batch
        .column_by_name("parse_error")
        .unwrap()
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(errors.value(0));
    assert_eq!(string_column(batch, "raw_line").value(0), "garbage");
    let line_numbers = batch
        .column_by_name("line_number")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(line_numbers.value(0), 1);
    assert!(batch.column_by_name("timestamp").unwrap().is_null(0));
    assert_eq!(string_column(batch, "client_host").value(0), "");
}

#[rstest]
#[tokio::test]
async fn default_mode_drops_parse_errors(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &["garbage"]);

    let sql = format!(
        "SELECT * FROM read_httpd_log('{}', 'common')",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    assert_eq!(rows, 0);
}

#[rstest]
#[tokio::test]
async fn glob_scans_multiple_files(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    write_log(&dir, "a.log", &[S1_LINE]);
    write_log(&dir, "b.log", &[S1_LINE, S1_LINE]);

    let pattern = dir.path().join("*.log");
    let sql = format!(
        "SELECT log_file, count(*) AS n FROM read_httpd_log('{}', 'common') \
         GROUP BY log_file ORDER BY log_file",
        pattern.display()
    );
    let batches = collect(&ctx, &sql).await;
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 2);
    let counts = batch
        .column_by_name("n")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(counts.value(0), 1);
    assert_eq!(counts.value(1), 2);
}

#[rstest]
#[tokio::test]
async fn rows_keep_file_order(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..50)
        .map(|i| S1_LINE.replace("2326", &i.to_string()))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let log = write_log(&dir, "ordered.log", &refs);

    let sql = format!(
        "SELECT bytes FROM read_httpd_log('{}', 'common')",
        log.display()
    );
    let batches = collect(&ctx, &sql).await;
    let mut seen = Vec::new();
    for batch in &batches {
        let bytes = batch
            .column_by_name("bytes")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        seen.extend(bytes.iter().flatten());
    }
    let expected: Vec<i64> = (0..50).collect();
    assert_eq!(seen, expected);
}

#[rstest]
#[tokio::test]
async fn auto_detection_selects_combined(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &[COMBINED_LINE, COMBINED_LINE]);

    let sql = format!("SELECT * FROM read_httpd_log('{}')", log.display());
    let batches = collect(&ctx, &sql).await;
    let batch = &batches[0];
    assert_eq!(string_column(batch, "user_agent").value(0), "curl/7.68.0");
    assert_eq!(
        string_column(batch, "referer").value(0),
        "https://example.com/start"
    );
}

#[rstest]
#[tokio::test]
async fn missing_path_is_a_bind_error(ctx: SessionContext) {
    let result = ctx
        .sql("SELECT * FROM read_httpd_log('/no/such/path/*.log')")
        .await;
    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("no files found"), "got: {message}");
}

#[rstest]
#[tokio::test]
async fn invalid_format_type_names_the_option(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "access.log", &[S1_LINE]);
    let sql = format!(
        "SELECT * FROM read_httpd_log('{}', 'bogus')",
        log.display()
    );
    let message = ctx.sql(&sql).await.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("format_type"), "got: {message}");
}

#[rstest]
#[tokio::test]
async fn conf_function_lists_formats(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("httpd.conf");
    std::fs::write(
        &conf,
        "LogFormat \"%h %l %u %t \\\"%r\\\" %>s %b\" common\n\
         CustomLog \"/var/log/access.log\" \"%h %u\"\n",
    )
    .unwrap();

    let sql = format!(
        "SELECT log_type, format_type, nickname, format_string, line_number \
         FROM read_httpd_conf('{}') ORDER BY line_number",
        conf.display()
    );
    let batches = collect(&ctx, &sql).await;
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(string_column(batch, "format_type").value(0), "named");
    assert_eq!(string_column(batch, "nickname").value(0), "common");
    assert_eq!(string_column(batch, "format_type").value(1), "inline");
    assert!(string_column(batch, "nickname").is_null(1));
}

#[rstest]
#[tokio::test]
async fn conf_nickname_drives_the_log_schema(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "vhost.log", &[&format!("example.org {S1_LINE}")]);
    let conf = dir.path().join("httpd.conf");
    std::fs::write(
        &conf,
        "LogFormat \"%v %h %l %u %t \\\"%r\\\" %>s %b\" vhost_combined\n",
    )
    .unwrap();

    let sql = format!(
        "SELECT server_name, client_host FROM read_httpd_log('{}', 'vhost_combined', NULL, NULL, '{}')",
        log.display(),
        conf.display()
    );
    // NULL placeholders are rejected; use the Rust builder path for named
    // options instead.
    assert!(ctx.sql(&sql).await.is_err());

    let provider = httpdlog_table::HttpdLogTableProvider::try_new(
        &log.to_string_lossy(),
        httpdlog_table::HttpdLogOptions {
            format_type: Some("vhost_combined".to_owned()),
            conf: Some(conf.to_string_lossy().into_owned()),
            ..Default::default()
        },
        ScanConfig::default(),
    )
    .unwrap();
    assert_eq!(provider.format_type(), "vhost_combined");

    ctx.register_table("vhost_logs", std::sync::Arc::new(provider))
        .unwrap();
    let batches = collect(
        &ctx,
        "SELECT server_name, client_host FROM vhost_logs",
    )
    .await;
    let batch = &batches[0];
    assert_eq!(string_column(batch, "server_name").value(0), "example.org");
    assert_eq!(string_column(batch, "client_host").value(0), "127.0.0.1");
}

#[rstest]
#[tokio::test]
async fn raw_only_degradation_with_unknown_format(ctx: SessionContext) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "odd.log", &["completely unstructured text"]);

    let provider = httpdlog_table::HttpdLogTableProvider::try_new(
        &log.to_string_lossy(),
        httpdlog_table::HttpdLogOptions {
            raw: true,
            ..Default::default()
        },
        ScanConfig::default(),
    )
    .unwrap();
    assert_eq!(provider.format_type(), "unknown");

    ctx.register_table("odd_logs", std::sync::Arc::new(provider))
        .unwrap();
    let batches = collect(&ctx, "SELECT * FROM odd_logs").await;
    let batch = &batches[0];
    let schema = batch.schema();
    let names: Vec<&str> = schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(names, vec!["log_file", "line_number", "parse_error", "raw_line"]);
    assert_eq!(
        string_column(batch, "raw_line").value(0),
        "completely unstructured text"
    );
}

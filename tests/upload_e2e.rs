// End-to-end tests for the upload command
//
// Config file + record file on disk, mock sync server over HTTP.

use std::io::Write;
use std::path::PathBuf;

use batchsync::{run_upload, Target, UploadRequest};
use batchsync_config::RuntimeConfig;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

fn write_records(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn config_for(server: &MockServer) -> RuntimeConfig {
    RuntimeConfig::from_toml_str(&format!(
        r#"
        [endpoint]
        base_url = "{}"

        [batch]
        size = 2

        [retry]
        base_wait_secs = 0
        pacing_ms = 0

        [destinations.vendas]
        path = "/api/sync/vendas"
        field_defaults = {{ total = 0 }}
        "#,
        server.base_url()
    ))
    .unwrap()
}

fn request(target: Target, input: PathBuf) -> UploadRequest {
    UploadRequest {
        target,
        input,
        format: None,
        base_url: None,
        batch_size: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn test_destination_upload_end_to_end() {
    let server = MockServer::start_async().await;

    let first = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/sync/vendas")
                .query_param("reset", "true")
                .json_body(json!([
                    {"loja": "centro", "total": 120.5},
                    {"loja": "norte", "total": 0}
                ]));
            then.status(200);
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/sync/vendas")
                .query_param("reset", "false")
                .json_body(json!([{"loja": "sul", "total": 0}]));
            then.status(200);
        })
        .await;

    // NaN is not valid JSON but shows up in exported rows; it is read as null
    let input = write_records(
        ".json",
        r#"[
            {"loja": "centro", "total": 120.5},
            {"loja": "norte", "total": null},
            {"loja": "sul", "total": NaN}
        ]"#,
    );

    let config = config_for(&server);
    let report = run_upload(
        &config,
        &request(Target::Destination("vendas".into()), input.path().into()),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.total_batches, 2);
    first.assert_hits_async(1).await;
    second.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_jsonl_path_upload_reports_failure() {
    let server = MockServer::start_async().await;

    let rejected = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/sync/estoque");
            then.status(422).body("{\"error\":\"missing column sku\"}");
        })
        .await;

    let input = write_records(".jsonl", "{\"sku\": 1}\n{\"sku\": 2}\n{\"sku\": 3}\n");

    let config = config_for(&server);
    let report = run_upload(
        &config,
        &request(Target::Path("/api/sync/estoque".into()), input.path().into()),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.batches.len(), 1);
    assert!(report
        .failure()
        .and_then(|b| b.outcome.reason())
        .unwrap()
        .contains("missing column sku"));
    rejected.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_dry_run_sends_nothing() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;

    let input = write_records(".json", r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#);

    let config = config_for(&server);
    let mut dry = request(Target::Destination("vendas".into()), input.path().into());
    dry.dry_run = true;

    assert!(run_upload(&config, &dry).await.unwrap().is_none());
    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unknown_destination_is_an_error() {
    let server = MockServer::start_async().await;
    let input = write_records(".json", "[]");

    let config = config_for(&server);
    let err = run_upload(
        &config,
        &request(Target::Destination("nope".into()), input.path().into()),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_config_file_drives_destination_tuning() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/sync/vendas_anuais");
            then.status(200);
        })
        .await;

    let mut config_file = NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"
        [endpoint]
        base_url = "{}"

        [retry]
        pacing_ms = 0

        [destinations.vendas_anuais]
        path = "/api/sync/vendas_anuais"
        batch_size = 500
        "#,
        server.base_url()
    )
    .unwrap();

    let config = RuntimeConfig::load_from_path(config_file.path()).unwrap();
    let rows: Vec<_> = (0..1200).map(|i| json!({"id": i})).collect();
    let input = write_records(".json", &serde_json::to_string(&rows).unwrap());

    let report = run_upload(
        &config,
        &request(
            Target::Destination("vendas_anuais".into()),
            input.path().into(),
        ),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.total_batches, 3);
    mock.assert_hits_async(3).await;
}

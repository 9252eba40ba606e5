//! End-to-end tests for the relay: multipart ingress, upstream forwarding,
//! response envelope, and temp-file cleanup, with the upstream mocked by
//! wiremock.

pub mod utils;

use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use utils::{create_test_config, spawn_test_server, spool_entries};

fn contract_form(filename: &str, body: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "contract",
        Part::bytes(body.to_vec()).file_name(filename).mime_type("application/pdf"),
    )
}

/// P1: a request with no file is rejected with 400 and never reaches the upstream.
#[test_log::test(tokio::test)]
async fn test_missing_file_is_rejected_without_upstream_call() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(MultipartForm::new().add_text("notes", "please analyze"))
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<serde_json::Value>(), json!({"error": "No file uploaded"}));
}

/// P2: healthy upstream result is relayed inside the success envelope.
#[test_log::test(tokio::test)]
async fn test_relays_analysis_result_with_envelope() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"riskScore": 42})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(contract_form("contract.pdf", b"some contract text"))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({
            "message": "Contract analyzed successfully",
            "filename": "contract.pdf",
            "riskScore": 42
        })
    );
}

/// Envelope fields always win a collision with upstream field names.
#[test_log::test(tokio::test)]
async fn test_envelope_fields_win_upstream_collisions() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "upstream message",
            "filename": "upstream.docx",
            "riskScore": 7
        })))
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(contract_form("contract.pdf", b"some contract text"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["message"], "Contract analyzed successfully");
    assert_eq!(body["filename"], "contract.pdf");
    assert_eq!(body["riskScore"], 7);
}

/// P3: an upstream rejection collapses to the generic 500 envelope.
#[test_log::test(tokio::test)]
async fn test_upstream_rejection_maps_to_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(contract_form("contract.pdf", b"some contract text"))
        .await;

    assert_eq!(response.status_code(), 500);
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({"error": "Internal server error"})
    );
}

/// P3: a hung upstream is cut off by the timeout and collapses to the same 500.
#[test_log::test(tokio::test)]
async fn test_upstream_timeout_maps_to_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"riskScore": 1}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), &upload_dir);
    config.upstream.timeout = Duration::from_millis(200);
    let server = spawn_test_server(config).await;

    let response = server
        .post("/analyze")
        .multipart(contract_form("contract.pdf", b"some contract text"))
        .await;

    assert_eq!(response.status_code(), 500);
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({"error": "Internal server error"})
    );
}

/// P4: the spooled temp file is gone after a successful request.
#[test_log::test(tokio::test)]
async fn test_temp_file_removed_after_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"riskScore": 42})))
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(contract_form("contract.pdf", b"some contract text"))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(spool_entries(&upload_dir), 0);
}

/// P4: the spooled temp file is gone after an upstream failure too.
#[test_log::test(tokio::test)]
async fn test_temp_file_removed_after_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(contract_form("contract.pdf", b"some contract text"))
        .await;

    assert_eq!(response.status_code(), 500);
    assert_eq!(spool_entries(&upload_dir), 0);
}

/// P5: concurrent requests get independent temp files and upstream round
/// trips; one request's upstream failure does not affect the other's success.
#[test_log::test(tokio::test)]
async fn test_concurrent_requests_are_independent() {
    let mock_server = MockServer::start().await;
    // Route on the uploaded content: the slow-but-healthy contract and the
    // one the upstream rejects.
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_string_contains("alpha contract"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"riskScore": 11}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_string_contains("beta contract"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let (alpha, beta) = tokio::join!(
        server.post("/analyze").multipart(contract_form("alpha.txt", b"alpha contract")),
        server.post("/analyze").multipart(contract_form("beta.txt", b"beta contract")),
    );

    assert_eq!(alpha.status_code(), 200);
    let alpha_body = alpha.json::<serde_json::Value>();
    assert_eq!(alpha_body["filename"], "alpha.txt");
    assert_eq!(alpha_body["riskScore"], 11);

    assert_eq!(beta.status_code(), 500);
    assert_eq!(beta.json::<serde_json::Value>(), json!({"error": "Internal server error"}));

    assert_eq!(spool_entries(&upload_dir), 0);
}

/// P6: repeating the same upload produces a fresh upstream call each time.
#[test_log::test(tokio::test)]
async fn test_repeat_uploads_are_not_deduplicated() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"riskScore": 42})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    for _ in 0..2 {
        let response = server
            .post("/analyze")
            .multipart(contract_form("contract.pdf", b"same contract"))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    assert_eq!(spool_entries(&upload_dir), 0);
}

/// A part with no client filename still works; the envelope carries a generated name.
#[test_log::test(tokio::test)]
async fn test_upload_without_filename_gets_generated_name() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let upload_dir = tempfile::tempdir().unwrap();
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server
        .post("/analyze")
        .multipart(MultipartForm::new().add_part("contract", Part::bytes(b"raw bytes".to_vec())))
        .await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<serde_json::Value>();
    assert!(
        body["filename"].as_str().unwrap().starts_with("upload_"),
        "unexpected filename: {}",
        body["filename"]
    );
}

#[test_log::test(tokio::test)]
async fn test_healthz() {
    let upload_dir = tempfile::tempdir().unwrap();
    let mock_server = MockServer::start().await;
    let server = spawn_test_server(create_test_config(&mock_server.uri(), &upload_dir)).await;

    let response = server.get("/healthz").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "OK");
}

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use httpmock::{Method::POST, MockServer};
use intakemcp::{
    api::create_router,
    app::Services,
    config::{Config, LlmProvider},
    ingest::METADATA_FILE,
    mcp::{IntakeMcpServer, PROTOCOL_VERSION},
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct Harness {
    app: Router,
    session_id: String,
    _jobs_dir: tempfile::TempDir,
    jobs_root: PathBuf,
    _collaborators: MockServer,
}

impl Harness {
    async fn start() -> Self {
        let collaborators = MockServer::start_async().await;
        collaborators
            .mock_async(|when, then| {
                when.method(POST).path("/analyze");
                then.status(200).json_body(json!({
                    "blocks": [
                        {"blockType": "PAGE", "text": "", "confidence": 0.0},
                        {"blockType": "LINE", "text": "Purpose: INVOICE_PRODUCTION", "confidence": 99.0},
                        {"blockType": "LINE", "text": "Invoice INV-1", "confidence": 96.0}
                    ],
                    "tables": [],
                    "keyValues": {"Invoice": "INV-1"}
                }));
            })
            .await;
        collaborators
            .mock_async(|when, then| {
                when.method(POST).path("/entities");
                then.status(200).json_body(json!({
                    "entities": [
                        {"type": "QUANTITY", "text": "1"},
                        {"type": "QUANTITY", "text": "2"},
                        {"type": "QUANTITY", "text": "3"}
                    ]
                }));
            })
            .await;
        collaborators
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("Respond with ONLY the classification type.");
                then.status(200)
                    .json_body(json!({"response": " invoice_production\n", "done": true}));
            })
            .await;
        collaborators
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("Extract fields from this document");
                then.status(200).json_body(json!({
                    "response": "```json\n{\"invoice_number\": \"INV-1\"}\n```",
                    "done": true
                }));
            })
            .await;

        let jobs_dir = tempfile::tempdir().expect("tempdir");
        let jobs_root = jobs_dir.path().join("jobs");
        let base_url = collaborators.base_url();
        let config = Config {
            jobs_root: jobs_root.clone(),
            job_workers: 2,
            ocr_service_url: Some(base_url.clone()),
            entity_service_url: Some(base_url.clone()),
            llm_provider: LlmProvider::Ollama,
            ollama_url: base_url,
            llm_model: "test-model".into(),
            ..Config::default()
        };
        let services = Services::from_config(&config);
        let app = create_router(Arc::new(IntakeMcpServer::new(services)));

        let response = app
            .clone()
            .oneshot(rpc_request(
                None,
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "initialize",
                    "params": {
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "clientInfo": {"name": "integration", "version": "0"}
                    }
                }),
            ))
            .await
            .expect("initialize response");
        assert_eq!(response.status(), StatusCode::OK);
        let session_id = response
            .headers()
            .get("mcp-session-id")
            .and_then(|value| value.to_str().ok())
            .expect("session header")
            .to_string();

        Self {
            app,
            session_id,
            _jobs_dir: jobs_dir,
            jobs_root,
            _collaborators: collaborators,
        }
    }

    async fn post(&self, body: Value) -> (StatusCode, Vec<u8>) {
        let response = self
            .app
            .clone()
            .oneshot(rpc_request(Some(&self.session_id), body))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, bytes.to_vec())
    }

    async fn call_tool(&self, id: u64, name: &str, arguments: Value) -> String {
        let (status, body) = self
            .post(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            }))
            .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(body["id"], json!(id));
        body["result"]["content"][0]["text"]
            .as_str()
            .expect("text content")
            .to_string()
    }

    async fn wait_for_job(&self, job_id: &str) -> String {
        for attempt in 0..400 {
            let text = self
                .call_tool(1000 + attempt, "check_job", json!({"job_id": job_id}))
                .await;
            if text != "Job status: processing" {
                return text;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {job_id} did not finish");
    }
}

fn rpc_request(session_id: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream")
        .header("origin", "http://localhost:6274")
        .header("mcp-protocol-version", PROTOCOL_VERSION);
    if let Some(session_id) = session_id {
        builder = builder.header("mcp-session-id", session_id);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn metadata_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                pending.push(path);
            } else if path.file_name().is_some_and(|name| name == METADATA_FILE) {
                found.push(path);
            }
        }
    }
    found
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).expect("read file")).expect("json file")
}

#[tokio::test]
async fn async_upload_classifies_and_extracts_fields() {
    let harness = Harness::start().await;

    let (status, body) = harness
        .post(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());

    let (status, body) = harness
        .post(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let tools: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(
        tools["result"]["tools"].as_array().expect("tools").len(),
        9
    );

    let started = harness
        .call_tool(
            3,
            "upload_files",
            json!({
                "async": true,
                "files": [{
                    "filename": "invoice.pdf",
                    "content": STANDARD.encode(b"%PDF-1.7 invoice body"),
                    "type": "pdf"
                }]
            }),
        )
        .await;
    let job_id = started
        .strip_prefix("Job started: ")
        .and_then(|rest| rest.strip_suffix("\nUse check_job tool to get status."))
        .expect("job started text")
        .to_string();

    let summary = harness.wait_for_job(&job_id).await;
    assert!(summary.starts_with("Files: 1 (separate jobs)"), "{summary}");
    assert!(summary.contains("✓ invoice.pdf (pdf)"), "{summary}");

    let metadata_paths = metadata_files(&harness.jobs_root);
    assert_eq!(metadata_paths.len(), 1);
    let metadata = read_json(&metadata_paths[0]);
    assert_eq!(metadata["type"], "single");
    assert_eq!(metadata["fileCount"], 1);

    let record = &metadata["files"][0];
    assert_eq!(record["detectedType"], "pdf");
    assert_eq!(record["ocrConfidence"], 97.5);
    assert_eq!(
        record["extractedText"],
        "Purpose: INVOICE_PRODUCTION\nInvoice INV-1\n"
    );
    assert_eq!(record["classification"]["pattern"]["type"], "INVOICE_PRODUCTION");
    assert_eq!(record["classification"]["entity"]["type"], "SCHEDULE_PRODUCTION");
    assert_eq!(record["classification"]["llm"]["type"], "INVOICE_PRODUCTION");
    assert_eq!(record["finalClassification"]["type"], "INVOICE_PRODUCTION");
    assert_eq!(record["finalClassification"]["method"], "consensus");
    assert_eq!(record["finalClassification"]["confidence"], 1.0);
    assert_eq!(record["extractedFields"]["invoice_number"], "INV-1");
    assert!(record.get("error").is_none());

    let stored = metadata_paths[0].with_file_name("invoice.pdf");
    assert_eq!(
        std::fs::read(stored).expect("stored upload"),
        b"%PDF-1.7 invoice body"
    );

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("health response");
    let health: Value = serde_json::from_slice(
        &to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes"),
    )
    .expect("health json");
    assert_eq!(health["metrics"]["filesProcessed"], 1);
    assert_eq!(health["metrics"]["jobsPersisted"], 1);
}

#[tokio::test]
async fn archive_batch_shares_one_job_and_unpacks_entries() {
    let harness = Harness::start().await;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("docs/readme.txt", zip::write::SimpleFileOptions::default())
        .expect("start entry");
    zip.write_all(b"inside the archive").expect("write entry");
    let archive = zip.finish().expect("finish zip").into_inner();

    let summary = harness
        .call_tool(
            10,
            "upload_files",
            json!({
                "files": [
                    {"filename": "bundle.zip", "content": STANDARD.encode(&archive), "type": "archive"},
                    {"filename": "scan.pdf", "content": STANDARD.encode(b"%PDF-1.4"), "type": "pdf"}
                ]
            }),
        )
        .await;

    assert!(summary.starts_with("Job ID: "), "{summary}");
    assert!(summary.contains("(archive extraction)\nFiles: 2\n"), "{summary}");
    assert!(
        summary.contains(&format!(
            "✓ bundle.zip (archive) - {} bytes - extracted 1 files",
            archive.len()
        )),
        "{summary}"
    );
    assert!(summary.contains("✓ scan.pdf (pdf) - 8 bytes"), "{summary}");

    let metadata_paths = metadata_files(&harness.jobs_root);
    assert_eq!(metadata_paths.len(), 1);
    let metadata = read_json(&metadata_paths[0]);
    assert_eq!(metadata["type"], "archive");
    assert_eq!(metadata["fileCount"], 2);
    assert_eq!(metadata["files"][0]["extractedEntries"], 1);
    assert!(metadata["files"][1].get("classification").is_none());

    let unpacked = metadata_paths[0].with_file_name("docs").join("readme.txt");
    assert_eq!(
        std::fs::read(unpacked).expect("unpacked entry"),
        b"inside the archive"
    );
}

#[tokio::test]
async fn custom_schema_and_session_checks() {
    let harness = Harness::start().await;

    let added = harness
        .call_tool(
            20,
            "add_schema",
            json!({"doc_type": "CUSTOM_INVOICE", "schema": "{\"total\": \"number\"}"}),
        )
        .await;
    assert_eq!(added, "Schema added for: CUSTOM_INVOICE");
    assert_eq!(
        harness.call_tool(21, "list_schemas", json!({})).await,
        "Custom schemas:\n- CUSTOM_INVOICE\n"
    );

    let undecodable = harness
        .call_tool(
            22,
            "upload_files",
            json!({"files": [{"filename": "x.pdf", "content": "!!", "type": "pdf"}]}),
        )
        .await;
    assert!(
        undecodable.starts_with("Error uploading files: invalid content for x.pdf"),
        "{undecodable}"
    );
    assert!(metadata_files(&harness.jobs_root).is_empty());

    let response = harness
        .app
        .clone()
        .oneshot(rpc_request(
            Some("00000000-0000-0000-0000-000000000000"),
            json!({"jsonrpc": "2.0", "id": 23, "method": "tools/list"}),
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

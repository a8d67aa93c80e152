use super::*;
use std::{
    env,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{DocumentId, PageRef};
use tokio::{net::TcpListener, sync::Mutex};

use crate::ErrorCategory;

#[derive(Debug, Clone)]
struct ReceivedPart {
    field: String,
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct MockState {
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
    analyze_bodies: Arc<Mutex<Vec<Value>>>,
    chat_bodies: Arc<Mutex<Vec<Value>>>,
}

async fn handle_upload(State(state): State<MockState>, mut multipart: Multipart) -> Json<Value> {
    let mut names = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let part = ReceivedPart {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().unwrap_or_default().to_string(),
            content_type: field.content_type().unwrap_or_default().to_string(),
            bytes: field.bytes().await.expect("field bytes").to_vec(),
        };
        names.push(part.file_name.clone());
        state.parts.lock().await.push(part);
    }
    let paths: Vec<String> = names.iter().map(|n| format!("/tmp/{n}")).collect();
    Json(json!({
        "success": true,
        "files": names.iter().map(|n| json!({"name": n, "size": 9})).collect::<Vec<_>>(),
        "paths": paths,
        "filenames": names,
    }))
}

async fn handle_analyze(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.analyze_bodies.lock().await.push(body);
    Json(json!({"success": true, "chunks": 12, "message": "12 chunks indexed"}))
}

async fn handle_chat(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.chat_bodies.lock().await.push(body);
    Json(json!({
        "success": true,
        "answer": "The penalty is set out in article 12.",
        "sources": [{"id": 1, "page": 3, "file": "a.pdf", "preview": "Article 12..."}]
    }))
}

async fn handle_system_info() -> Json<Value> {
    Json(json!({
        "success": true,
        "model": "jarvis",
        "chunk_size": 1000,
        "top_k": 4,
        "embedding_model": "paraphrase-multilingual-MiniLM-L12-v2"
    }))
}

async fn spawn_backend() -> anyhow::Result<(String, MockState)> {
    let state = MockState::default();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/chat", post(handle_chat))
        .route("/api/system-info", get(handle_system_info))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn spawn_failing_backend() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route(
            "/api/analyze",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "vector store unavailable"})),
                )
            }),
        )
        .route(
            "/api/chat",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
        )
        .route(
            "/api/system-info",
            get(|| async { Json(json!({"success": true, "model": "jarvis"})) }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn write_temp_pdf(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("docchat_transport_test_{suffix}"));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.4\n").expect("write pdf");
    path
}

#[test]
fn server_url_requires_http_scheme() {
    assert_eq!(
        normalize_server_url(" http://localhost:5000/ ").expect("valid"),
        "http://localhost:5000"
    );
    assert!(normalize_server_url("ftp://localhost").is_err());
    assert!(normalize_server_url("localhost:5000").is_err());
}

#[test]
fn server_url_with_query_or_fragment_is_rejected() {
    for raw in ["http://h:5000/?k=v", "http://h:5000/#top", "https://h/api?x"] {
        let err = normalize_server_url(raw).expect_err("must be rejected");
        assert_eq!(err.category(), ErrorCategory::Validation, "{raw}");
    }
    let client = HttpBackendClient::new("http://h:5000/proxy/").expect("path prefix is fine");
    assert_eq!(client.endpoint(UPLOAD_PATH), "http://h:5000/proxy/api/upload");
}

#[tokio::test]
async fn upload_sends_pdf_parts_named_files() {
    let (server_url, state) = spawn_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&server_url).expect("client");
    let a_path = write_temp_pdf("a.pdf");
    let b_path = write_temp_pdf("b.pdf");
    let a = PendingFile::from_path(&a_path);
    let b = PendingFile::from_path(&b_path);

    let response = client.upload(&[a, b]).await.expect("upload");
    assert_eq!(response.paths, vec!["/tmp/a.pdf", "/tmp/b.pdf"]);
    assert_eq!(response.filenames, vec!["a.pdf", "b.pdf"]);
    assert_eq!(response.files.len(), 2);

    let parts = state.parts.lock().await;
    assert_eq!(parts.len(), 2);
    for part in parts.iter() {
        assert_eq!(part.field, "files");
        assert_eq!(part.content_type, "application/pdf");
        assert_eq!(part.bytes, b"%PDF-1.4\n");
    }
    assert_eq!(parts[0].file_name, "a.pdf");
    drop(parts);

    for file in [&a_path, &b_path] {
        std::fs::remove_dir_all(file.parent().expect("parent")).expect("cleanup");
    }
}

#[tokio::test]
async fn upload_of_unreadable_file_fails_before_network() {
    let (server_url, state) = spawn_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&server_url).expect("client");
    let missing = PendingFile::from_path("/definitely/not/here.pdf");

    let err = client.upload(&[missing]).await.expect_err("missing file");
    assert!(matches!(err, ClientError::Io { .. }));
    assert!(state.parts.lock().await.is_empty());
}

#[tokio::test]
async fn analyze_and_chat_post_json_bodies() {
    let (server_url, state) = spawn_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&format!("{server_url}/")).expect("client");

    let analyzed = client
        .analyze(&AnalyzeRequest {
            files: vec!["/tmp/a.pdf".into()],
            filenames: vec!["a.pdf".into()],
        })
        .await
        .expect("analyze");
    assert_eq!(analyzed.chunks, 12);
    assert_eq!(analyzed.message.as_deref(), Some("12 chunks indexed"));

    let answer = client
        .chat(&ChatRequest {
            question: "What is the penalty clause?".into(),
        })
        .await
        .expect("chat");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].id, DocumentId(1));
    assert_eq!(answer.sources[0].page, PageRef::Number(3));

    assert_eq!(
        state.analyze_bodies.lock().await[0],
        json!({"files": ["/tmp/a.pdf"], "filenames": ["a.pdf"]})
    );
    assert_eq!(
        state.chat_bodies.lock().await[0],
        json!({"question": "What is the penalty clause?"})
    );
}

#[tokio::test]
async fn system_info_reads_display_parameters() {
    let (server_url, _state) = spawn_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&server_url).expect("client");
    let info = client.system_info().await.expect("system info");
    assert_eq!(info.model, "jarvis");
    assert_eq!(info.chunk_size, 1000);
    assert_eq!(info.top_k, 4);
    assert!(info.embedding_model.is_some());
}

#[tokio::test]
async fn error_envelope_on_non_success_status_is_surfaced_verbatim() {
    let server_url = spawn_failing_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&server_url).expect("client");
    let err = client
        .analyze(&AnalyzeRequest {
            files: Vec::new(),
            filenames: Vec::new(),
        })
        .await
        .expect_err("analyze should fail");
    assert!(matches!(err, ClientError::Backend(_)));
    assert_eq!(err.to_string(), "vector store unavailable");
}

#[tokio::test]
async fn non_json_error_body_names_the_status() {
    let server_url = spawn_failing_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&server_url).expect("client");
    let err = client
        .chat(&ChatRequest {
            question: "hello".into(),
        })
        .await
        .expect_err("chat should fail");
    match err {
        ClientError::Backend(rejected) => {
            assert_eq!(rejected.status, Some(502));
            assert!(rejected.message.contains("502"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn incomplete_success_payload_is_a_decode_error() {
    let server_url = spawn_failing_backend().await.expect("spawn backend");
    let client = HttpBackendClient::new(&server_url).expect("client");
    let err = client.system_info().await.expect_err("missing fields");
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = HttpBackendClient::new(&format!("http://{addr}")).expect("client");
    let err = client.system_info().await.expect_err("nothing listening");
    assert!(err.is_transport());
}

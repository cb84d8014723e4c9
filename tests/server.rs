//! Integration tests for the conversion API.
//!
//! The router is driven in-process through `axum-test`. A fake engine stands
//! in for LibreOffice, so these run without any office suite installed.

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use docx2pdf::server::error::ErrorBody;
use docx2pdf::storage::{INBOUND_DIR, OUTBOUND_DIR};
use docx2pdf::{Application, ConversionEngine, ConversionError, ServerConfig};
use std::future::IntoFuture;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fake engines ─────────────────────────────────────────────────────────────

/// Writes `%PDF-1.4` followed by the input bytes, so each output can be
/// traced back to its upload.
#[derive(Default)]
struct EchoEngine {
    inputs: Mutex<Vec<PathBuf>>,
    delay: Option<Duration>,
}

#[async_trait]
impl ConversionEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError> {
        self.inputs.lock().unwrap().push(input.to_path_buf());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let body = tokio::fs::read(input).await.map_err(|e| ConversionError::Io {
            path: input.to_path_buf(),
            source: e,
        })?;
        let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        let out = out_dir.join(format!("{stem}.pdf"));
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend_from_slice(&body);
        tokio::fs::write(&out, pdf).await.map_err(|e| ConversionError::Io {
            path: out.clone(),
            source: e,
        })?;
        Ok(out)
    }
}

struct FailingEngine;

#[async_trait]
impl ConversionEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    async fn convert(&self, _input: &Path, _out_dir: &Path) -> Result<PathBuf, ConversionError> {
        Err(ConversionError::EngineFailed {
            code: Some(1),
            stderr: "Error: source file could not be loaded".into(),
        })
    }
}

struct HangingEngine;

#[async_trait]
impl ConversionEngine for HangingEngine {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn convert(&self, _input: &Path, _out_dir: &Path) -> Result<PathBuf, ConversionError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("the timeout fires first")
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Harness {
    server: TestServer,
    root: PathBuf,
    _tmp: tempfile::TempDir,
}

async fn harness_with(
    engine: Arc<dyn ConversionEngine>,
    tweak: impl FnOnce(docx2pdf::ServerConfigBuilder) -> docx2pdf::ServerConfigBuilder,
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("scratch");
    let config = tweak(ServerConfig::builder().storage_root(&root))
        .build()
        .unwrap();
    let app = Application::new(config, engine).await.unwrap();
    let server = TestServer::new(app.router()).expect("Failed to create test server");
    Harness {
        server,
        root,
        _tmp: tmp,
    }
}

async fn harness(engine: Arc<dyn ConversionEngine>) -> Harness {
    harness_with(engine, |b| b).await
}

fn docx_part(name: &str, body: &[u8]) -> Part {
    Part::bytes(body.to_vec())
        .file_name(name)
        .mime_type("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
}

/// Wait until `dir` has no entries. The scratch guard is released with the
/// response body, which can trail the response by a moment.
async fn assert_eventually_empty(dir: &Path) {
    for _ in 0..50 {
        let count = std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0);
        if count == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let left: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    panic!("{} still contains {left:?}", dir.display());
}

async fn assert_scratch_clean(root: &Path) {
    assert_eventually_empty(&root.join(INBOUND_DIR)).await;
    assert_eventually_empty(&root.join(OUTBOUND_DIR)).await;
}

// ── Routes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_serves_welcome_text() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    let response = h.server.get("/").await;
    response.assert_status_ok();
    response.assert_text("Welcome to the File Conversion API");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    h.server.get("/nope").await.assert_status_not_found();
}

// ── Successful conversion ────────────────────────────────────────────────────

#[tokio::test]
async fn converts_and_cleans_up() {
    let h = harness(Arc::new(EchoEngine::default())).await;

    let response = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("report.docx", b"hello")))
        .await;

    response.assert_status_ok();
    assert!(response.as_bytes().starts_with(b"%PDF"));
    assert_eq!(
        response.header(header::CONTENT_TYPE).to_str().unwrap(),
        "application/pdf"
    );
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert!(
        disposition.to_str().unwrap().contains("filename=\"report.pdf\""),
        "got: {disposition:?}"
    );

    assert_scratch_clean(&h.root).await;
}

#[tokio::test]
async fn extra_text_fields_are_ignored() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    let response = h
        .server
        .post("/convertFile")
        .multipart(
            MultipartForm::new()
                .add_text("note", "ignored")
                .add_part("file", docx_part("memo.docx", b"memo")),
        )
        .await;
    response.assert_status_ok();
    assert!(response.as_bytes().ends_with(b"memo"));
}

// ── Bad requests ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_is_400() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    let response = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_text("other", "value"))
        .await;

    response.assert_status_bad_request();
    response.assert_json(&ErrorBody::new("No file uploaded"));
    assert_scratch_clean(&h.root).await;
}

#[tokio::test]
async fn text_value_under_file_field_is_400() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    let response = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_text("file", "not a file"))
        .await;
    response.assert_status_bad_request();
    response.assert_json(&ErrorBody::new("No file uploaded"));
}

#[tokio::test]
async fn non_multipart_body_is_400() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    let response = h.server.post("/convertFile").text("hello").await;
    response.assert_status_bad_request();
    response.assert_json(&ErrorBody::new("No file uploaded"));
}

#[tokio::test]
async fn oversize_upload_is_413() {
    let h = harness_with(Arc::new(EchoEngine::default()), |b| {
        b.max_upload_bytes(Some(1024))
    })
    .await;

    let response = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("big.docx", &[0u8; 4096])))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = response.json();
    assert!(body.message.starts_with("File size exceeds the"), "{}", body.message);
    assert_scratch_clean(&h.root).await;
}

// ── Engine failures ──────────────────────────────────────────────────────────

#[tokio::test]
async fn engine_failure_is_500_and_cleans_up() {
    let h = harness(Arc::new(FailingEngine)).await;
    let response = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("bad.docx", b"x")))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json();
    assert_eq!(body.message, "Error converting docx to pdf");
    assert!(!body.message.contains("could not be loaded"));
    assert_scratch_clean(&h.root).await;
}

#[tokio::test]
async fn engine_timeout_is_500_and_cleans_up() {
    let h = harness_with(Arc::new(HangingEngine), |b| b.conversion_timeout_secs(1)).await;
    let response = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("slow.docx", b"x")))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&ErrorBody::new("Error converting docx to pdf"));
    assert_scratch_clean(&h.root).await;
}

// ── Isolation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_requests_get_their_own_output() {
    let engine = Arc::new(EchoEngine {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    let h = harness(engine.clone()).await;

    let a = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("a.docx", b"first")))
        .into_future();
    let b = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("b.docx", b"second")))
        .into_future();
    let (a, b) = tokio::join!(a, b);

    a.assert_status_ok();
    b.assert_status_ok();
    assert!(a.as_bytes().ends_with(b"first"));
    assert!(b.as_bytes().ends_with(b"second"));
    assert_scratch_clean(&h.root).await;
}

#[tokio::test]
async fn concurrent_requests_with_the_same_name_do_not_collide() {
    let engine = Arc::new(EchoEngine {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    let h = harness(engine.clone()).await;

    let a = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("same.docx", b"one")))
        .into_future();
    let b = h
        .server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", docx_part("same.docx", b"two")))
        .into_future();
    let (a, b) = tokio::join!(a, b);

    a.assert_status_ok();
    b.assert_status_ok();
    assert!(a.as_bytes().ends_with(b"one"));
    assert!(b.as_bytes().ends_with(b"two"));

    let inputs = engine.inputs.lock().unwrap().clone();
    assert_eq!(inputs.len(), 2);
    assert_ne!(inputs[0].parent(), inputs[1].parent());
}

#[tokio::test]
async fn traversal_file_names_stay_inside_scratch() {
    let engine = Arc::new(EchoEngine::default());
    let h = harness(engine.clone()).await;

    let response = h
        .server
        .post("/convertFile")
        .multipart(
            MultipartForm::new().add_part("file", docx_part("../../escape.docx", b"sneaky")),
        )
        .await;

    response.assert_status_ok();
    assert!(response
        .header(header::CONTENT_DISPOSITION)
        .to_str()
        .unwrap()
        .contains("filename=\"escape.pdf\""));

    let inputs = engine.inputs.lock().unwrap().clone();
    assert!(inputs[0].starts_with(h.root.join(INBOUND_DIR)), "{inputs:?}");
    assert_eq!(inputs[0].file_name().unwrap(), "escape.docx");
    assert!(!h.root.parent().unwrap().join("escape.docx").exists());
}

// ── CORS ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wildcard_cors_by_default() {
    let h = harness(Arc::new(EchoEngine::default())).await;
    let response = h
        .server
        .get("/")
        .add_header(header::ORIGIN, "http://localhost:5173")
        .await;
    response.assert_status_ok();
    assert_eq!(
        response
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .to_str()
            .unwrap(),
        "*"
    );
}

//! End-to-end tests against a real LibreOffice install.
//!
//! A minimal Word document is built in memory and posted to the router
//! backed by [`LibreOfficeEngine`]. These tests are gated behind the
//! `E2E_ENABLED` environment variable and also skip when no `soffice`
//! binary can be located.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Point `SOFFICE_PATH` at the binary if it is not on `PATH`.

use axum::http::header;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use docx2pdf::{Application, LibreOfficeEngine, ServerConfig};
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set *and* soffice can be found.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if !soffice_auto::is_soffice_available() {
            println!("SKIP — soffice not found (set SOFFICE_PATH or install LibreOffice)");
            return;
        }
    }};
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

/// A one-paragraph `.docx` containing `text`.
fn minimal_docx(text: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body>
</w:document>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("word/document.xml", document.as_str()),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

async fn libreoffice_server(root: &std::path::Path) -> TestServer {
    let config = ServerConfig::builder().storage_root(root).build().unwrap();
    let app = Application::new(config, Arc::new(LibreOfficeEngine::new()))
        .await
        .unwrap();
    TestServer::new(app.router()).expect("Failed to create test server")
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_real_docx() {
    e2e_skip_unless_ready!();

    let tmp = tempfile::tempdir().unwrap();
    let server = libreoffice_server(&tmp.path().join("scratch")).await;
    let part = Part::bytes(minimal_docx("Hello from docx2pdf"))
        .file_name("hello.docx")
        .mime_type("application/vnd.openxmlformats-officedocument.wordprocessingml.document");

    let response = server
        .post("/convertFile")
        .multipart(MultipartForm::new().add_part("file", part))
        .await;

    response.assert_status_ok();
    let body = response.as_bytes();
    println!("pdf: {} bytes", body.len());
    assert!(body.starts_with(b"%PDF"), "body is not a PDF");
    assert!(response
        .header(header::CONTENT_DISPOSITION)
        .to_str()
        .unwrap()
        .contains("hello.pdf"));
}


//! End-to-end tests for POST /api/exams/generate

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tempfile::TempDir;
use tower::ServiceExt;
use zip::ZipArchive;

use exam_shuffler::config::Config;
use exam_shuffler::docx::{read_paragraphs, DocumentWriter, Para, Paragraph, Span};
use exam_shuffler::pipeline::NO_QUESTIONS_MESSAGE;
use exam_shuffler::state::AppState;

const BOUNDARY: &str = "exam-shuffler-test-boundary";

struct TestApp {
    router: Router,
    dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads");
        config.storage.output_dir = dir.path().join("output");
        config.exam.max_variants = 10;
        configure(&mut config);

        let router = exam_shuffler::app(AppState::new(config).unwrap());
        Self { router, dir }
    }

    async fn generate(&self, file: Option<&[u8]>, fields: &[(&str, &str)]) -> axum::response::Response {
        let request = Request::builder()
            .method("POST")
            .uri("/api/exams/generate")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(file, fields)))
            .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// No run files may outlive a finished request
    fn assert_scratch_is_empty(&self) {
        for sub in ["uploads", "output"] {
            let path = self.dir.path().join(sub);
            assert!(is_empty_or_missing(&path), "{} still has files", path.display());
        }
    }

    /// Wait for background work still holding a run to let it go
    async fn wait_for_empty_scratch(&self) {
        for _ in 0..200 {
            let empty = ["uploads", "output"]
                .iter()
                .all(|sub| is_empty_or_missing(&self.dir.path().join(sub)));
            if empty {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.assert_scratch_is_empty();
    }
}

fn is_empty_or_missing(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(data) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"quiz.docx\"\r\nContent-Type: application/vnd.openxmlformats-officedocument.wordprocessingml.document\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Two questions; only the first has a bold (correct) answer
fn quiz_document() -> Vec<u8> {
    let mut doc = DocumentWriter::new();
    doc.paragraph(Para::new(vec![Span::plain("Đề kiểm tra thử")]));
    doc.paragraph(Para::new(vec![Span::plain("Câu 1. 2+2=?")]));
    doc.paragraph(Para::new(vec![
        Span::plain("A. 3 B. "),
        Span::bold("4"),
        Span::plain(" C. 5"),
    ]));
    doc.paragraph(Para::new(vec![Span::plain("Câu 2: nước sôi ở")]));
    doc.paragraph(Para::new(vec![Span::plain("bao nhiêu độ?")]));
    doc.paragraph(Para::new(vec![Span::plain("A. 100 oC")]));
    doc.paragraph(Para::new(vec![Span::plain("B. 50 oC")]));
    doc.to_bytes().unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut data = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
    data
}

fn part_text(package: &[u8], part: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(package.to_vec())).unwrap();
    let mut xml = String::new();
    archive.by_name(part).unwrap().read_to_string(&mut xml).unwrap();
    xml
}

fn texts(paragraphs: &[Paragraph]) -> Vec<String> {
    paragraphs.iter().map(|p| p.text()).collect()
}

#[tokio::test]
async fn test_generates_archive() {
    let app = TestApp::new();
    let response = app
        .generate(Some(quiz_document().as_slice()), &[("numFiles", "2")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"DeThi_"));
    let length: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let bytes = body_bytes(response).await;
    assert_eq!(bytes.len(), length);

    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(names, vec!["Dap_an_tong_hop.xlsx", "De_so_1.docx", "De_so_2.docx"]);

    // the body has been fully streamed, so the run is gone
    app.assert_scratch_is_empty();
}

#[tokio::test]
async fn test_without_shuffling_variants_match() {
    let app = TestApp::new();
    let response = app
        .generate(
            Some(quiz_document().as_slice()),
            &[
                ("numFiles", "3"),
                ("shuffleQuestions", "false"),
                ("shuffleAnswers", "false"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut archive = ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    let bodies: Vec<Vec<String>> = (1..=3)
        .map(|i| {
            let doc = read_entry(&mut archive, &format!("De_so_{}.docx", i));
            texts(&read_paragraphs(&doc).unwrap())
        })
        .collect();

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);
    assert_eq!(
        bodies[0],
        vec![
            "Câu 1. 2+2=?",
            "A. 3",
            "B. 4",
            "C. 5",
            "",
            "Câu 2. Nước sôi ở bao nhiêu độ?",
            "A. 100°C",
            "B. 50°C",
            "",
        ]
    );

    // only the variant code differs between documents
    let first = part_text(&read_entry(&mut archive, "De_so_1.docx"), "word/document.xml");
    let third = part_text(&read_entry(&mut archive, "De_so_3.docx"), "word/document.xml");
    assert!(first.contains("Mã đề: 01"));
    assert!(third.contains("Mã đề: 03"));
    assert_eq!(first.replace("Mã đề: 01", ""), third.replace("Mã đề: 03", ""));
}

#[tokio::test]
async fn test_answer_key_shape() {
    let app = TestApp::new();
    let response = app
        .generate(Some(quiz_document().as_slice()), &[("numFiles", "4")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut archive = ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    let workbook = read_entry(&mut archive, "Dap_an_tong_hop.xlsx");

    let sheet = part_text(&workbook, "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row ").count(), 5);
    // header plus two question columns
    assert_eq!(sheet.matches("<c r=\"").count(), 5 * 3);
    assert!(sheet.contains(">Mã đề<"));
    assert!(sheet.contains(">Câu 2<"));
    assert!(sheet.contains(">De_so_4<"));
    // the unmarked question never gets a letter
    assert_eq!(sheet.matches(">N/A<").count(), 4);
    assert_eq!(sheet.matches(">B<").count() + sheet.matches(">A<").count() + sheet.matches(">C<").count(), 4);

    let workbook_xml = part_text(&workbook, "xl/workbook.xml");
    assert!(workbook_xml.contains("name=\"Đáp án\""));
}

#[tokio::test]
async fn test_rendered_documents_drop_source_emphasis() {
    let app = TestApp::new();
    let response = app
        .generate(Some(quiz_document().as_slice()), &[("numFiles", "2")])
        .await;
    let mut archive = ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();

    for i in 1..=2 {
        let doc = read_entry(&mut archive, &format!("De_so_{}.docx", i));
        for paragraph in read_paragraphs(&doc).unwrap() {
            for (k, run) in paragraph.runs.iter().enumerate() {
                assert_eq!(run.format.bold, k == 0, "unexpected emphasis in {:?}", paragraph.text());
            }
        }
    }
}

#[tokio::test]
async fn test_document_without_questions() {
    let app = TestApp::new();
    let mut doc = DocumentWriter::new();
    doc.paragraph(Para::new(vec![Span::plain("Chỉ có một đoạn văn.")]));
    doc.paragraph(Para::new(vec![Span::plain("A. không thuộc câu nào")]));

    let response = app.generate(Some(doc.to_bytes().unwrap().as_slice()), &[]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], NO_QUESTIONS_MESSAGE);
    app.assert_scratch_is_empty();
}

#[tokio::test]
async fn test_missing_file() {
    let app = TestApp::new();
    let response = app.generate(None, &[("numFiles", "2")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "No file uploaded");
    app.assert_scratch_is_empty();
}

#[tokio::test]
async fn test_invalid_variant_count() {
    let app = TestApp::new();
    for value in ["0", "11", "many"] {
        let response = app
            .generate(Some(quiz_document().as_slice()), &[("numFiles", value)])
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "numFiles={}", value);
    }
    app.assert_scratch_is_empty();
}

#[tokio::test]
async fn test_unreadable_upload_is_server_error() {
    let app = TestApp::new();
    let response = app.generate(Some(&b"plain text, not a docx"[..]), &[]).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Server error");
    app.assert_scratch_is_empty();
}

/// Quiz large enough that generating ten variants outlasts a zero timeout
fn large_quiz_document(questions: usize) -> Vec<u8> {
    let mut doc = DocumentWriter::new();
    for i in 1..=questions {
        doc.paragraph(Para::new(vec![Span::plain(format!(
            "Câu {}. Nhiệt độ của mẫu số {} là bao nhiêu?",
            i, i
        ))]));
        doc.paragraph(Para::new(vec![
            Span::plain(format!("A. {} oC B. ", i)),
            Span::bold(format!("{} oC", i + 1)),
            Span::plain(format!(" C. {}K D. {}", i + 2, i + 3)),
        ]));
    }
    doc.to_bytes().unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_is_server_error() {
    let app = TestApp::with_config(|config| config.server.request_timeout_secs = 0);
    let response = app
        .generate(Some(large_quiz_document(500).as_slice()), &[("numFiles", "10")])
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Server error");

    // the abandoned generation still removes its run when it finishes
    app.wait_for_empty_scratch().await;
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

//! Exam generation routes
//!
//! Endpoints:
//! - POST /api/exams/generate - Upload a quiz document, receive a zip of
//!   shuffled variants plus the answer key
//!
//! Form fields: `file` (required), `numFiles`, `shuffleQuestions`,
//! `shuffleAnswers`.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use futures::stream;
use tokio::io::AsyncReadExt;

use crate::error::{AppError, Result};
use crate::exam::ShuffleOptions;
use crate::pipeline::{self, GenerateOptions};
use crate::state::AppState;
use crate::workspace::RunWorkspace;

/// Read size for streaming the archive back
const CHUNK_SIZE: usize = 64 * 1024;

/// Create the exams router
pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate_exams))
}

/// Raw multipart fields before validation
#[derive(Debug, Default)]
struct GenerateForm {
    file: Option<Bytes>,
    num_files: Option<String>,
    shuffle_questions: Option<String>,
    shuffle_answers: Option<String>,
}

impl GenerateForm {
    async fn read(multipart: &mut Multipart) -> Result<Self> {
        let mut form = GenerateForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::error!("Failed to read multipart field: {}", e);
            AppError::Validation(format!("Failed to read upload: {}", e.body_text()))
        })? {
            let name = field.name().unwrap_or("").to_string();
            tracing::debug!(
                "Received field: name='{}', filename={:?}",
                name,
                field.file_name()
            );

            let read_error = |e: axum::extract::multipart::MultipartError| {
                tracing::error!("Failed to read field '{}': {}", name, e);
                AppError::Validation(format!("Failed to read upload: {}", e.body_text()))
            };

            match name.as_str() {
                "file" => {
                    let data = field.bytes().await.map_err(read_error)?;
                    tracing::debug!("Read {} bytes of file data", data.len());
                    if !data.is_empty() {
                        form.file = Some(data);
                    }
                }
                "numFiles" => form.num_files = Some(field.text().await.map_err(read_error)?),
                "shuffleQuestions" => {
                    form.shuffle_questions = Some(field.text().await.map_err(read_error)?)
                }
                "shuffleAnswers" => {
                    form.shuffle_answers = Some(field.text().await.map_err(read_error)?)
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn options(&self, max_variants: usize) -> Result<GenerateOptions> {
        Ok(GenerateOptions {
            variants: parse_variant_count(self.num_files.as_deref(), max_variants)?,
            shuffle: ShuffleOptions {
                questions: parse_flag(self.shuffle_questions.as_deref(), true),
                answers: parse_flag(self.shuffle_answers.as_deref(), true),
            },
        })
    }
}

/// `numFiles`: absent or blank means one variant
fn parse_variant_count(value: Option<&str>, max: usize) -> Result<usize> {
    let value = match value.map(str::trim) {
        None | Some("") => return Ok(1),
        Some(v) => v,
    };

    match value.parse::<usize>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(AppError::Validation(format!(
            "numFiles must be a whole number between 1 and {}",
            max
        ))),
    }
}

/// Boolean-like form value; anything unrecognised keeps the default
fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}

/// Generate shuffled exam variants from an uploaded quiz
async fn generate_exams(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let form = GenerateForm::read(&mut multipart).await?;

    let Some(file) = form.file.as_ref() else {
        return Err(AppError::Validation("No file uploaded".to_string()));
    };

    let config = state.config();
    let options = form.options(config.exam.max_variants)?;

    let workspace = RunWorkspace::create(&config.storage, &config.exam.archive_prefix).await?;
    if let Err(e) = tokio::fs::write(workspace.upload_path(), file).await {
        workspace.cleanup().await;
        return Err(e.into());
    }

    tracing::info!(
        run_id = workspace.run_id(),
        bytes = file.len(),
        variants = options.variants,
        shuffle_questions = options.shuffle.questions,
        shuffle_answers = options.shuffle.answers,
        "Generating exams"
    );

    let timeout_secs = config.server.request_timeout_secs;
    let task_state = state.clone();
    let task = tokio::task::spawn_blocking(move || {
        let result = pipeline::generate(
            &workspace,
            task_state.rules(),
            &task_state.config().header,
            options,
        );
        (workspace, result)
    });

    // On timeout the task keeps the workspace and removes it when it ends
    let (workspace, archive) = match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
        Ok(Ok((workspace, Ok(archive)))) => (workspace, archive),
        Ok(Ok((workspace, Err(e)))) => {
            workspace.cleanup().await;
            return Err(e);
        }
        Ok(Err(e)) => return Err(AppError::Internal(format!("Generation task failed: {}", e))),
        Err(_) => return Err(AppError::Timeout(timeout_secs)),
    };

    let file = match tokio::fs::File::open(&archive.path).await {
        Ok(file) => file,
        Err(e) => {
            workspace.cleanup().await;
            return Err(e.into());
        }
    };
    let body = Body::from_stream(archive_stream(file, workspace));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, archive.size)
        .header(header::CONTENT_DISPOSITION, content_disposition(&archive.name))
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Stream the archive, cleaning up the workspace once it is fully read; a
/// dropped body releases it through `Drop`
fn archive_stream(
    file: tokio::fs::File,
    workspace: RunWorkspace,
) -> impl futures::Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    stream::unfold(Some((file, workspace)), |state| async move {
        let (mut file, workspace) = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => {
                drop(file);
                tracing::debug!(run_id = workspace.run_id(), "Archive delivered");
                workspace.cleanup().await;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((file, workspace))))
            }
            Err(e) => {
                tracing::error!(run_id = workspace.run_id(), "Failed to read archive: {}", e);
                workspace.cleanup().await;
                Some((Err(e), None))
            }
        }
    })
}

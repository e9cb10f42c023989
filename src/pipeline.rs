//! Upload to archive
//!
//! Blocking: parsing, rendering and compression all run on the calling
//! thread. The route handler drives this from `spawn_blocking`.

use std::path::PathBuf;
use std::time::Instant;

use crate::archive::{write_archive, ArchiveEntry};
use crate::config::HeaderConfig;
use crate::docx::read_paragraphs_from_path;
use crate::error::{AppError, Result};
use crate::exam::{
    answer_key_sheet, build_answer_key, generate_variants, parse_exam, render_variant,
    SegmenterRules, ShuffleOptions, ANSWER_KEY_FILE,
};
use crate::workspace::RunWorkspace;

/// Shown when the document holds nothing that looks like a question
pub const NO_QUESTIONS_MESSAGE: &str =
    "Không tìm thấy câu hỏi nào trong file. Vui lòng kiểm tra định dạng.";

/// Options taken from the request form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub variants: usize,
    pub shuffle: ShuffleOptions,
}

/// A finished archive in the run's output directory
#[derive(Debug, Clone)]
pub struct GeneratedArchive {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub question_count: usize,
    pub variant_count: usize,
}

/// Parse the uploaded document and package its shuffled variants
pub fn generate(
    workspace: &RunWorkspace,
    rules: &SegmenterRules,
    header: &HeaderConfig,
    options: GenerateOptions,
) -> Result<GeneratedArchive> {
    let started = Instant::now();

    let paragraphs = read_paragraphs_from_path(workspace.upload_path())?;
    let exam = parse_exam(rules, &paragraphs);

    tracing::debug!(
        run_id = workspace.run_id(),
        paragraphs = paragraphs.len(),
        questions = exam.len(),
        "Parsed source document"
    );

    if exam.is_empty() {
        return Err(AppError::Validation(NO_QUESTIONS_MESSAGE.to_string()));
    }

    let variants = generate_variants(&exam, options.variants, options.shuffle);

    let mut entries = Vec::with_capacity(variants.len() + 1);
    for variant in &variants {
        let document = render_variant(variant, header).to_bytes()?;
        entries.push(ArchiveEntry::new(variant.file_name(), document));
    }

    let key = build_answer_key(&variants);
    entries.push(ArchiveEntry::new(ANSWER_KEY_FILE, answer_key_sheet(&key).to_bytes()?));

    let path = workspace.archive_path();
    let size = write_archive(&path, &entries)?;

    tracing::info!(
        run_id = workspace.run_id(),
        questions = exam.len(),
        variants = variants.len(),
        bytes = size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Generated exam archive"
    );

    Ok(GeneratedArchive {
        path,
        name: workspace.archive_name().to_string(),
        size,
        question_count: exam.len(),
        variant_count: variants.len(),
    })
}

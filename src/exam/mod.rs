//! Exam model and processing
//!
//! `extract` reduces paragraphs to text plus an emphasis map, `segment`
//! groups them into questions, `shuffle` produces variants and `assemble`
//! renders variants and the answer key.

pub mod assemble;
pub mod extract;
pub mod segment;
pub mod shuffle;
pub mod types;

pub use assemble::{
    answer_key_sheet, build_answer_key, fix_capitalization, render_variant, ANSWER_KEY_FILE,
};
pub use extract::{normalize_notation, StyledParagraph};
pub use segment::{
    segment, AnswerCandidate, CorrectAnswerStrategy, EmphasisStrategy, LineKind, SegmenterError,
    SegmenterRules,
};
pub use shuffle::{generate_variants, generate_variants_with, ShuffleOptions};
pub use types::{AnswerKey, AnswerKeyRow, ExamVariant, ParsedExam, Question};

use crate::docx::Paragraph;

/// Parse body paragraphs into questions, marking emphasized answers correct
pub fn parse_exam(rules: &SegmenterRules, paragraphs: &[Paragraph]) -> ParsedExam {
    parse_exam_with(rules, paragraphs, EmphasisStrategy)
}

pub fn parse_exam_with<S: CorrectAnswerStrategy>(
    rules: &SegmenterRules,
    paragraphs: &[Paragraph],
    strategy: S,
) -> ParsedExam {
    let styled = paragraphs.iter().map(StyledParagraph::from_paragraph);
    ParsedExam::new(segment(rules, styled, strategy).collect())
}

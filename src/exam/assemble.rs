//! Variant documents and the answer key
//!
//! Rendering never copies source formatting: prompts and answers are written
//! as plain runs, with only the `Câu k.` and letter labels in bold.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::{answer_letter, AnswerKey, AnswerKeyRow, ExamVariant};
use crate::config::HeaderConfig;
use crate::docx::{Alignment, Block, DocumentWriter, Para, Span, Table, TableCell, TableRow};
use crate::xlsx::Worksheet;

/// Sheet holding the answer key
pub const ANSWER_KEY_SHEET: &str = "Đáp án";

/// File name of the answer key inside the archive
pub const ANSWER_KEY_FILE: &str = "Dap_an_tong_hop.xlsx";

const VARIANT_COLUMN: &str = "Mã đề";

/// Header text size in half-points (11pt)
const HEADER_SIZE: u32 = 22;

/// Left indent of answer paragraphs in twips
const ANSWER_INDENT: u32 = 720;

const LEFT_WIDTH: u32 = 35;
const RIGHT_WIDTH: u32 = 65;

const QUESTIONS_PER_PAGE: usize = 5;

const STUDENT_NAME_LINE: &str = "Họ và tên:..........................................................";
const STUDENT_CLASS_LINE: &str = "Lớp:...................................................................";
const COPY_TIME_NOTE: &str = "(không kể thời gian chép đề)";

static SENTENCE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.?!]\s*)([a-z])").expect("invalid built-in pattern"));

/// Upper-case the first character and any ASCII letter opening a sentence
pub fn fix_capitalization(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let capitalized: String = first.to_uppercase().chain(chars).collect();

    SENTENCE_START_RE
        .replace_all(&capitalized, |caps: &Captures<'_>| {
            format!("{}{}", &caps[1], caps[2].to_ascii_uppercase())
        })
        .into_owned()
}

/// Estimated page count printed in the header
pub fn estimate_pages(question_count: usize) -> usize {
    question_count.div_ceil(QUESTIONS_PER_PAGE) + 1
}

fn header_para(text: &str, bold: bool, italic: bool) -> Para {
    let mut span = Span::plain(text).italic(italic).size(HEADER_SIZE);
    span.bold = bold;
    Para::new(vec![span]).align(Alignment::Center).spacing_after(0)
}

fn header_row(left: Para, right: Para) -> TableRow {
    TableRow {
        cells: vec![
            TableCell::new(left, LEFT_WIDTH),
            TableCell::new(right, RIGHT_WIDTH),
        ],
    }
}

/// Borderless header table naming the school, exam and variant code
pub fn header_block(header: &HeaderConfig, variant_number: usize, pages: usize) -> Block {
    let blank = || header_para("", false, false);

    let rows = vec![
        header_row(
            header_para(&header.authority, false, false),
            header_para(&header.title, true, false),
        ),
        header_row(
            header_para(&header.school, true, false),
            header_para(&header.subject, true, false),
        ),
        header_row(blank(), blank()),
        header_row(
            header_para(&format!("(Đề thi có {} trang)", pages), false, false),
            header_para(&header.duration, false, false),
        ),
        header_row(blank(), header_para(COPY_TIME_NOTE, false, true)),
        header_row(header_para(STUDENT_NAME_LINE, false, false), blank()),
        header_row(
            header_para(STUDENT_CLASS_LINE, false, false),
            header_para(&format!("Mã đề: {:02}", variant_number), false, false),
        ),
        TableRow {
            cells: vec![
                TableCell::new(blank(), LEFT_WIDTH).with_bottom_border(),
                TableCell::new(blank(), RIGHT_WIDTH).with_bottom_border(),
            ],
        },
        header_row(blank(), blank()),
    ];

    Block::Table(Table { rows })
}

/// Lay out one variant as a document
pub fn render_variant(variant: &ExamVariant, header: &HeaderConfig) -> DocumentWriter {
    let mut doc = DocumentWriter::new();
    doc.push(header_block(
        header,
        variant.number,
        estimate_pages(variant.questions.len()),
    ));

    for (k, question) in variant.questions.iter().enumerate() {
        doc.paragraph(Para::new(vec![
            Span::bold(format!("Câu {}. ", k + 1)),
            Span::plain(fix_capitalization(&question.prompt)),
        ]));

        for (i, answer) in question.answers.iter().enumerate() {
            let label = answer_letter(i).map_or_else(|| format!("{}. ", i + 1), |c| format!("{}. ", c));
            doc.paragraph(
                Para::new(vec![Span::bold(label), Span::plain(fix_capitalization(answer))])
                    .indent(ANSWER_INDENT),
            );
        }

        doc.paragraph(Para::empty());
    }

    doc
}

/// One row per variant with the correct letter of each question
pub fn build_answer_key(variants: &[ExamVariant]) -> AnswerKey {
    let rows = variants
        .iter()
        .map(|variant| AnswerKeyRow {
            variant_label: variant.label(),
            letters: variant.questions.iter().map(|q| q.correct_letter()).collect(),
        })
        .collect();

    AnswerKey {
        question_count: variants.first().map_or(0, |v| v.questions.len()),
        rows,
    }
}

/// Answer key as a worksheet: `Mã đề | Câu 1 .. Câu n`
pub fn answer_key_sheet(key: &AnswerKey) -> Worksheet {
    let mut sheet = Worksheet::new(ANSWER_KEY_SHEET);

    let header = std::iter::once(VARIANT_COLUMN.to_string())
        .chain((1..=key.question_count).map(|k| format!("Câu {}", k)));
    sheet.push_row(header);

    for row in &key.rows {
        sheet.push_row(std::iter::once(row.variant_label.clone()).chain(row.cells()));
    }

    sheet
}

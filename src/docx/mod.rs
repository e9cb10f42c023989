//! Word document (.docx) access
//!
//! `reader` turns `word/document.xml` into paragraphs of formatted runs;
//! `writer` builds a fresh document from paragraphs and tables.

pub mod reader;
pub mod writer;

use thiserror::Error;

pub use reader::{parse_document_xml, read_paragraphs, read_paragraphs_from_path};
pub use writer::{Alignment, Block, DocumentWriter, Para, Span, Table, TableCell, TableRow};

/// Path of the main document part inside the container
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Errors raised while reading a source document
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("Failed to read document archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Missing document part: {0}")]
    MissingPart(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DocxResult<T> = std::result::Result<T, DocxError>;

/// Formatting flags of a run that count as emphasis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub bold: bool,
    pub underline: bool,
    pub highlight: bool,
    pub red: bool,
}

impl RunFormat {
    pub const BOLD: RunFormat = RunFormat {
        bold: true,
        underline: false,
        highlight: false,
        red: false,
    };

    /// Whether the run is visually marked in any way
    pub fn is_emphasized(&self) -> bool {
        self.bold || self.underline || self.highlight || self.red
    }
}

/// A span of text sharing one formatting state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::default(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::BOLD,
        }
    }
}

/// One body paragraph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

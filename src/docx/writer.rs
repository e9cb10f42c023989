//! Document writer
//!
//! Builds a minimal WordprocessingML package: document, styles, content types
//! and relationships. Only the features the exam layout needs are modelled:
//! paragraphs of plain/bold/italic spans, left indent, alignment, spacing,
//! and borderless tables with an optional bottom rule per cell.

use std::io::Cursor;

use crate::ooxml::{
    self, content_types_part, empty_element, end_element, relationships_part, start_element,
    text_element, PackageResult, PackageWriter, PartWriter, Relationship,
    OFFICE_DOCUMENT_RELATIONSHIP,
};

const WORDPROCESSING_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";

const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";

const STYLES_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// A4 text width in twips with the margins used below
const TEXT_WIDTH_TWIPS: u32 = 9638;

/// Default font for every run
pub const DEFAULT_FONT: &str = "Times New Roman";

/// Default run size in half-points (12pt)
pub const DEFAULT_SIZE: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Center,
}

/// A run of text with its own formatting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Size in half-points; document default when unset
    pub size: Option<u32>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn size(mut self, half_points: u32) -> Self {
        self.size = Some(half_points);
        self
    }
}

/// Paragraph with optional layout properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Para {
    pub spans: Vec<Span>,
    pub alignment: Option<Alignment>,
    /// Left indent in twips
    pub indent_left: Option<u32>,
    /// Space after in twips
    pub spacing_after: Option<u32>,
}

impl Para {
    pub fn new(spans: Vec<Span>) -> Self {
        Self {
            spans,
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn indent(mut self, twips: u32) -> Self {
        self.indent_left = Some(twips);
        self
    }

    pub fn spacing_after(mut self, twips: u32) -> Self {
        self.spacing_after = Some(twips);
        self
    }

    /// Concatenated text of all spans
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub paragraphs: Vec<Para>,
    /// Width in percent of the table
    pub width_pct: u32,
    pub bottom_border: bool,
}

impl TableCell {
    pub fn new(paragraph: Para, width_pct: u32) -> Self {
        Self {
            paragraphs: vec![paragraph],
            width_pct,
            bottom_border: false,
        }
    }

    pub fn with_bottom_border(mut self) -> Self {
        self.bottom_border = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// Full-width, centered table without visible borders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Para),
    Table(Table),
}

/// Accumulates body blocks and serializes them as a .docx
#[derive(Debug, Clone, Default)]
pub struct DocumentWriter {
    blocks: Vec<Block>,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn paragraph(&mut self, para: Para) {
        self.blocks.push(Block::Paragraph(para));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Serialize the package into memory
    pub fn to_bytes(&self) -> PackageResult<Vec<u8>> {
        let mut package = PackageWriter::new(Cursor::new(Vec::new()));

        package.add_part(
            "[Content_Types].xml",
            &content_types_part(&[
                ("/word/document.xml", DOCUMENT_CONTENT_TYPE),
                ("/word/styles.xml", STYLES_CONTENT_TYPE),
            ])?,
        )?;
        package.add_part(
            "_rels/.rels",
            &relationships_part(&[Relationship {
                id: "rId1",
                rel_type: OFFICE_DOCUMENT_RELATIONSHIP,
                target: "word/document.xml",
            }])?,
        )?;
        package.add_part(
            "word/_rels/document.xml.rels",
            &relationships_part(&[Relationship {
                id: "rId1",
                rel_type: STYLES_RELATIONSHIP,
                target: "styles.xml",
            }])?,
        )?;
        package.add_part("word/styles.xml", &styles_part()?)?;
        package.add_part("word/document.xml", &self.document_part()?)?;

        Ok(package.finish()?.into_inner())
    }

    fn document_part(&self) -> PackageResult<Vec<u8>> {
        let mut w = ooxml::new_part()?;
        start_element(&mut w, "w:document", &[("xmlns:w", WORDPROCESSING_NS)])?;
        start_element(&mut w, "w:body", &[])?;

        for block in &self.blocks {
            match block {
                Block::Paragraph(para) => write_paragraph(&mut w, para)?,
                Block::Table(table) => write_table(&mut w, table)?,
            }
        }

        start_element(&mut w, "w:sectPr", &[])?;
        empty_element(&mut w, "w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
        empty_element(
            &mut w,
            "w:pgMar",
            &[
                ("w:top", "1134"),
                ("w:right", "1134"),
                ("w:bottom", "1134"),
                ("w:left", "1134"),
                ("w:header", "708"),
                ("w:footer", "708"),
                ("w:gutter", "0"),
            ],
        )?;
        end_element(&mut w, "w:sectPr")?;

        end_element(&mut w, "w:body")?;
        end_element(&mut w, "w:document")?;
        Ok(ooxml::finish_part(w))
    }
}

fn styles_part() -> PackageResult<Vec<u8>> {
    let size = DEFAULT_SIZE.to_string();
    let mut w = ooxml::new_part()?;
    start_element(&mut w, "w:styles", &[("xmlns:w", WORDPROCESSING_NS)])?;
    start_element(&mut w, "w:docDefaults", &[])?;
    start_element(&mut w, "w:rPrDefault", &[])?;
    start_element(&mut w, "w:rPr", &[])?;
    empty_element(
        &mut w,
        "w:rFonts",
        &[
            ("w:ascii", DEFAULT_FONT),
            ("w:hAnsi", DEFAULT_FONT),
            ("w:eastAsia", DEFAULT_FONT),
            ("w:cs", DEFAULT_FONT),
        ],
    )?;
    empty_element(&mut w, "w:sz", &[("w:val", size.as_str())])?;
    empty_element(&mut w, "w:szCs", &[("w:val", size.as_str())])?;
    end_element(&mut w, "w:rPr")?;
    end_element(&mut w, "w:rPrDefault")?;
    end_element(&mut w, "w:docDefaults")?;
    end_element(&mut w, "w:styles")?;
    Ok(ooxml::finish_part(w))
}

fn write_paragraph(w: &mut PartWriter, para: &Para) -> PackageResult<()> {
    start_element(w, "w:p", &[])?;

    if para.alignment.is_some() || para.indent_left.is_some() || para.spacing_after.is_some() {
        start_element(w, "w:pPr", &[])?;
        // schema order: spacing, ind, jc
        if let Some(after) = para.spacing_after {
            empty_element(w, "w:spacing", &[("w:after", after.to_string().as_str())])?;
        }
        if let Some(left) = para.indent_left {
            empty_element(w, "w:ind", &[("w:left", left.to_string().as_str())])?;
        }
        if let Some(alignment) = para.alignment {
            let val = match alignment {
                Alignment::Center => "center",
            };
            empty_element(w, "w:jc", &[("w:val", val)])?;
        }
        end_element(w, "w:pPr")?;
    }

    for span in &para.spans {
        write_span(w, span)?;
    }

    end_element(w, "w:p")
}

fn write_span(w: &mut PartWriter, span: &Span) -> PackageResult<()> {
    start_element(w, "w:r", &[])?;

    if span.bold || span.italic || span.size.is_some() {
        start_element(w, "w:rPr", &[])?;
        if span.bold {
            empty_element(w, "w:b", &[])?;
        }
        if span.italic {
            empty_element(w, "w:i", &[])?;
        }
        if let Some(size) = span.size {
            let size = size.to_string();
            empty_element(w, "w:sz", &[("w:val", size.as_str())])?;
            empty_element(w, "w:szCs", &[("w:val", size.as_str())])?;
        }
        end_element(w, "w:rPr")?;
    }

    text_element(w, "w:t", &[("xml:space", "preserve")], &span.text)?;
    end_element(w, "w:r")
}

fn write_table(w: &mut PartWriter, table: &Table) -> PackageResult<()> {
    start_element(w, "w:tbl", &[])?;

    start_element(w, "w:tblPr", &[])?;
    empty_element(w, "w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
    empty_element(w, "w:jc", &[("w:val", "center")])?;
    write_borders(w, "w:tblBorders", &["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"], None)?;
    end_element(w, "w:tblPr")?;

    // Grid follows the first row's widths
    start_element(w, "w:tblGrid", &[])?;
    if let Some(first) = table.rows.first() {
        for cell in &first.cells {
            let twips = TEXT_WIDTH_TWIPS * cell.width_pct / 100;
            empty_element(w, "w:gridCol", &[("w:w", twips.to_string().as_str())])?;
        }
    }
    end_element(w, "w:tblGrid")?;

    for row in &table.rows {
        start_element(w, "w:tr", &[])?;
        for cell in &row.cells {
            write_cell(w, cell)?;
        }
        end_element(w, "w:tr")?;
    }

    end_element(w, "w:tbl")
}

fn write_cell(w: &mut PartWriter, cell: &TableCell) -> PackageResult<()> {
    start_element(w, "w:tc", &[])?;

    start_element(w, "w:tcPr", &[])?;
    // pct widths are in fiftieths of a percent
    let width = (cell.width_pct * 50).to_string();
    empty_element(w, "w:tcW", &[("w:w", width.as_str()), ("w:type", "pct")])?;
    let bottom = cell.bottom_border.then_some("w:bottom");
    write_borders(w, "w:tcBorders", &["w:top", "w:left", "w:bottom", "w:right"], bottom)?;
    end_element(w, "w:tcPr")?;

    if cell.paragraphs.is_empty() {
        // a cell must end with a paragraph
        write_paragraph(w, &Para::empty())?;
    }
    for para in &cell.paragraphs {
        write_paragraph(w, para)?;
    }

    end_element(w, "w:tc")
}

/// Hidden borders, except `visible` which gets a thin single line
fn write_borders(
    w: &mut PartWriter,
    container: &str,
    sides: &[&str],
    visible: Option<&str>,
) -> PackageResult<()> {
    start_element(w, container, &[])?;
    for side in sides {
        if Some(*side) == visible {
            empty_element(
                w,
                side,
                &[("w:val", "single"), ("w:sz", "6"), ("w:space", "0"), ("w:color", "000000")],
            )?;
        } else {
            empty_element(w, side, &[("w:val", "nil")])?;
        }
    }
    end_element(w, container)
}

//! Answer-key spreadsheet writer
//!
//! Produces a single-sheet SpreadsheetML workbook. Cells are inline strings,
//! so no shared-string table or styles part is needed.

use std::io::Cursor;

use crate::ooxml::{
    self, content_types_part, empty_element, end_element, relationships_part, start_element,
    text_element, PackageResult, PackageWriter, PartWriter, Relationship,
    OFFICE_DOCUMENT_RELATIONSHIP,
};

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

const DOCUMENT_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

const WORKSHEET_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

/// Excel rejects longer sheet names
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Column letters for a zero-based index: 0 -> A, 25 -> Z, 26 -> AA
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// A one-sheet table of strings; the first row is the header
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Worksheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.chars().take(MAX_SHEET_NAME_CHARS).collect(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Serialize the workbook into memory
    pub fn to_bytes(&self) -> PackageResult<Vec<u8>> {
        let mut package = PackageWriter::new(Cursor::new(Vec::new()));

        package.add_part(
            "[Content_Types].xml",
            &content_types_part(&[
                ("/xl/workbook.xml", WORKBOOK_CONTENT_TYPE),
                ("/xl/worksheets/sheet1.xml", WORKSHEET_CONTENT_TYPE),
            ])?,
        )?;
        package.add_part(
            "_rels/.rels",
            &relationships_part(&[Relationship {
                id: "rId1",
                rel_type: OFFICE_DOCUMENT_RELATIONSHIP,
                target: "xl/workbook.xml",
            }])?,
        )?;
        package.add_part(
            "xl/_rels/workbook.xml.rels",
            &relationships_part(&[Relationship {
                id: "rId1",
                rel_type: WORKSHEET_RELATIONSHIP,
                target: "worksheets/sheet1.xml",
            }])?,
        )?;
        package.add_part("xl/workbook.xml", &self.workbook_part()?)?;
        package.add_part("xl/worksheets/sheet1.xml", &self.sheet_part()?)?;

        Ok(package.finish()?.into_inner())
    }

    fn workbook_part(&self) -> PackageResult<Vec<u8>> {
        let mut w = ooxml::new_part()?;
        start_element(
            &mut w,
            "workbook",
            &[("xmlns", SPREADSHEET_NS), ("xmlns:r", DOCUMENT_RELATIONSHIPS_NS)],
        )?;
        start_element(&mut w, "sheets", &[])?;
        empty_element(
            &mut w,
            "sheet",
            &[("name", self.name.as_str()), ("sheetId", "1"), ("r:id", "rId1")],
        )?;
        end_element(&mut w, "sheets")?;
        end_element(&mut w, "workbook")?;
        Ok(ooxml::finish_part(w))
    }

    fn sheet_part(&self) -> PackageResult<Vec<u8>> {
        let mut w = ooxml::new_part()?;
        start_element(&mut w, "worksheet", &[("xmlns", SPREADSHEET_NS)])?;
        start_element(&mut w, "sheetData", &[])?;

        for (r, row) in self.rows.iter().enumerate() {
            let row_number = (r + 1).to_string();
            start_element(&mut w, "row", &[("r", row_number.as_str())])?;
            for (c, value) in row.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), row_number);
                write_cell(&mut w, &reference, value)?;
            }
            end_element(&mut w, "row")?;
        }

        end_element(&mut w, "sheetData")?;
        end_element(&mut w, "worksheet")?;
        Ok(ooxml::finish_part(w))
    }
}

fn write_cell(w: &mut PartWriter, reference: &str, value: &str) -> PackageResult<()> {
    start_element(w, "c", &[("r", reference), ("t", "inlineStr")])?;
    start_element(w, "is", &[])?;
    text_element(w, "t", &[("xml:space", "preserve")], value)?;
    end_element(w, "is")?;
    end_element(w, "c")
}

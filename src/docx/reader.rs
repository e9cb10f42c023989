//! Source document reader
//!
//! Pulls the top-level body paragraphs out of `word/document.xml` with a
//! streaming quick-xml reader. Only the pieces the question parser needs are
//! kept: run text and the emphasis flags of each run.
//!
//! Paragraphs nested in tables, text boxes or other containers are skipped;
//! quiz sources put their questions in the body flow.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::{DocxError, DocxResult, Paragraph, Run, RunFormat, DOCUMENT_PART};

/// Read the body paragraphs of a .docx held in memory
pub fn read_paragraphs(data: &[u8]) -> DocxResult<Vec<Paragraph>> {
    let xml = read_document_xml(Cursor::new(data))?;
    parse_document_xml(&xml)
}

/// Read the body paragraphs of a .docx on disk
pub fn read_paragraphs_from_path<P: AsRef<Path>>(path: P) -> DocxResult<Vec<Paragraph>> {
    let file = File::open(path)?;
    let xml = read_document_xml(file)?;
    parse_document_xml(&xml)
}

fn read_document_xml<R: Read + Seek>(reader: R) -> DocxResult<String> {
    let mut archive = ZipArchive::new(reader)?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => DocxError::MissingPart(DOCUMENT_PART.to_string()),
        other => DocxError::Zip(other),
    })?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Parse the markup of `word/document.xml`
pub fn parse_document_xml(xml: &str) -> DocxResult<Vec<Paragraph>> {
    let mut reader = Reader::from_str(xml);
    let mut scanner = BodyScanner::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                scanner.open(&e, depth)?;
            }
            Event::Empty(e) => {
                scanner.open(&e, depth + 1)?;
                scanner.close(e.name().as_ref(), depth + 1);
            }
            Event::End(e) => {
                scanner.close(e.name().as_ref(), depth);
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if scanner.in_text() {
                    let text = t.unescape()?;
                    scanner.push_text(&text);
                }
            }
            Event::CData(c) => {
                if scanner.in_text() {
                    let raw = c.into_inner();
                    scanner.push_text(&String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(scanner.paragraphs)
}

/// Tracks where in the element tree the reader is
///
/// Depths are the 1-based nesting level of the element that opened the state.
#[derive(Default)]
struct BodyScanner {
    body: Option<usize>,
    paragraph: Option<(usize, Paragraph)>,
    run: Option<(usize, Run)>,
    run_props: Option<usize>,
    text: Option<usize>,
    paragraphs: Vec<Paragraph>,
}

impl BodyScanner {
    fn in_text(&self) -> bool {
        self.text.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, run)) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    /// Whether the element at `depth` is a direct child of the open run
    fn is_run_child(&self, depth: usize) -> bool {
        matches!(self.run, Some((d, _)) if d + 1 == depth)
    }

    fn open(&mut self, e: &BytesStart<'_>, depth: usize) -> DocxResult<()> {
        match e.name().as_ref() {
            b"w:body" if self.body.is_none() => self.body = Some(depth),
            b"w:p" if self.paragraph.is_none() && self.body.map(|d| d + 1) == Some(depth) => {
                self.paragraph = Some((depth, Paragraph::default()));
            }
            b"w:r" if self.paragraph.is_some() && self.run.is_none() => {
                self.run = Some((depth, Run::default()));
            }
            b"w:rPr" if self.is_run_child(depth) => self.run_props = Some(depth),
            b"w:t" if self.is_run_child(depth) => self.text = Some(depth),
            b"w:sym" if self.is_run_child(depth) => {
                if is_degree_symbol(e)? {
                    self.push_text("°");
                }
            }
            b"w:tab" | b"w:br" | b"w:cr" if self.is_run_child(depth) => self.push_text(" "),
            _ if self.run_props.map(|d| d + 1) == Some(depth) => {
                if let Some((_, run)) = self.run.as_mut() {
                    apply_format(&mut run.format, e)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], depth: usize) {
        match name {
            b"w:t" if self.text == Some(depth) => self.text = None,
            b"w:rPr" if self.run_props == Some(depth) => self.run_props = None,
            b"w:r" if matches!(self.run, Some((d, _)) if d == depth) => {
                if let (Some((_, run)), Some((_, paragraph))) = (self.run.take(), self.paragraph.as_mut()) {
                    paragraph.runs.push(run);
                }
            }
            b"w:p" if matches!(self.paragraph, Some((d, _)) if d == depth) => {
                if let Some((_, paragraph)) = self.paragraph.take() {
                    self.paragraphs.push(paragraph);
                }
            }
            b"w:body" if self.body == Some(depth) => self.body = None,
            _ => {}
        }
    }
}

fn val_attr(e: &BytesStart<'_>) -> DocxResult<Option<String>> {
    Ok(match e.try_get_attribute("w:val")? {
        Some(attr) => Some(attr.unescape_value()?.into_owned()),
        None => None,
    })
}

/// `<w:b/>` means on; `w:val` may switch a toggle property off
fn toggle_is_on(val: Option<&str>) -> bool {
    !matches!(val, Some("0") | Some("false") | Some("off"))
}

fn apply_format(format: &mut RunFormat, e: &BytesStart<'_>) -> DocxResult<()> {
    match e.name().as_ref() {
        b"w:b" => format.bold = toggle_is_on(val_attr(e)?.as_deref()),
        b"w:u" => {
            let val = val_attr(e)?;
            format.underline = !matches!(val.as_deref(), Some("none") | Some("0") | Some("false"));
        }
        b"w:highlight" => format.highlight = val_attr(e)?.as_deref() != Some("none"),
        b"w:color" => {
            format.red = val_attr(e)?
                .map(|v| v.eq_ignore_ascii_case("FF0000"))
                .unwrap_or(false);
        }
        _ => {}
    }
    Ok(())
}

/// Symbol-font degree signs are stored as `w:sym` instead of text
fn is_degree_symbol(e: &BytesStart<'_>) -> DocxResult<bool> {
    Ok(match e.try_get_attribute("w:char")? {
        Some(attr) => {
            let code = attr.unescape_value()?;
            code.eq_ignore_ascii_case("00B0") || code.eq_ignore_ascii_case("F0B0")
        }
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            body
        )
    }

    #[test]
    fn test_reads_runs_and_bold() {
        let xml = document(
            r#"<w:p><w:r><w:t xml:space="preserve">A. 3 B. </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>4</w:t></w:r><w:r><w:t xml:space="preserve"> C. 5</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();

        assert_eq!(paragraphs.len(), 1);
        let runs = &paragraphs[0].runs;
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], Run::plain("A. 3 B. "));
        assert_eq!(runs[1], Run::bold("4"));
        assert_eq!(paragraphs[0].text(), "A. 3 B. 4 C. 5");
    }

    #[test]
    fn test_toggle_off_is_not_emphasis() {
        let xml = document(
            r#"<w:p><w:r><w:rPr><w:b w:val="0"/><w:u w:val="none"/><w:highlight w:val="none"/></w:rPr><w:t>x</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();
        assert!(!paragraphs[0].runs[0].format.is_emphasized());
    }

    #[test]
    fn test_other_emphasis_kinds() {
        let xml = document(
            r#"<w:p><w:r><w:rPr><w:u w:val="single"/></w:rPr><w:t>u</w:t></w:r><w:r><w:rPr><w:highlight w:val="yellow"/></w:rPr><w:t>h</w:t></w:r><w:r><w:rPr><w:color w:val="ff0000"/></w:rPr><w:t>r</w:t></w:r><w:r><w:rPr><w:color w:val="0000FF"/></w:rPr><w:t>b</w:t></w:r></w:p>"#,
        );
        let runs = &parse_document_xml(&xml).unwrap()[0].runs;
        assert!(runs[0].format.underline);
        assert!(runs[1].format.highlight);
        assert!(runs[2].format.red);
        assert!(!runs[3].format.is_emphasized());
    }

    #[test]
    fn test_degree_symbol_and_entities() {
        let xml = document(
            r#"<w:p><w:r><w:t>100</w:t><w:sym w:font="Symbol" w:char="00B0"/></w:r><w:r><w:t>C &amp; 5 &lt; 6</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs[0].text(), "100°C & 5 < 6");
    }

    #[test]
    fn test_skips_table_paragraphs_and_keeps_empty_ones() {
        let xml = document(
            r#"<w:p><w:r><w:t>first</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p/><w:p><w:pPr><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:t>last</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();

        let texts: Vec<String> = paragraphs.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["first", "", "last"]);
        // paragraph-mark formatting is not run formatting
        assert!(!paragraphs[2].runs[0].format.bold);
    }

    #[test]
    fn test_hyperlink_runs_are_kept() {
        let xml = document(
            r#"<w:p><w:r><w:t xml:space="preserve">see </w:t></w:r><w:hyperlink><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap()[0].text(), "see link");
    }

    #[test]
    fn test_missing_document_part() {
        use std::io::Write;
        use zip::{write::SimpleFileOptions, ZipWriter};

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            zip.start_file("word/other.xml", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }

        let result = read_paragraphs(&buffer);
        assert!(matches!(result, Err(DocxError::MissingPart(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let result = read_paragraphs(b"definitely not a docx");
        assert!(matches!(result, Err(DocxError::Zip(_))));
    }
}

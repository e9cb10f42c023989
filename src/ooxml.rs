//! OOXML package plumbing
//!
//! Word and Excel files are zip containers of XML parts tied together by
//! `[Content_Types].xml` and `.rels` relationship parts. The document and
//! spreadsheet writers build their parts with the helpers here.

use std::io::{Cursor, Seek, Write};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use thiserror::Error;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub const RELATIONSHIPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

pub const OFFICE_DOCUMENT_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

const PACKAGE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Errors raised while producing a package
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackageResult<T> = std::result::Result<T, PackageError>;

/// In-memory XML part writer
pub type PartWriter = Writer<Cursor<Vec<u8>>>;

/// Start a new XML part with the standalone declaration Office expects
pub fn new_part() -> PackageResult<PartWriter> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

pub fn finish_part(writer: PartWriter) -> Vec<u8> {
    writer.into_inner().into_inner()
}

pub fn start_element(writer: &mut PartWriter, name: &str, attrs: &[(&str, &str)]) -> PackageResult<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Start(elem))?;
    Ok(())
}

pub fn end_element(writer: &mut PartWriter, name: &str) -> PackageResult<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub fn empty_element(writer: &mut PartWriter, name: &str, attrs: &[(&str, &str)]) -> PackageResult<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// Write `<name attrs>text</name>`; the text is escaped
pub fn text_element(
    writer: &mut PartWriter,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> PackageResult<()> {
    start_element(writer, name, attrs)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    end_element(writer, name)
}

/// One entry of a `.rels` part
pub struct Relationship<'a> {
    pub id: &'a str,
    pub rel_type: &'a str,
    pub target: &'a str,
}

pub fn relationships_part(relationships: &[Relationship<'_>]) -> PackageResult<Vec<u8>> {
    let mut writer = new_part()?;
    start_element(&mut writer, "Relationships", &[("xmlns", PACKAGE_RELATIONSHIPS_NS)])?;
    for rel in relationships {
        empty_element(
            &mut writer,
            "Relationship",
            &[("Id", rel.id), ("Type", rel.rel_type), ("Target", rel.target)],
        )?;
    }
    end_element(&mut writer, "Relationships")?;
    Ok(finish_part(writer))
}

/// `[Content_Types].xml` with the rels/xml defaults plus per-part overrides
pub fn content_types_part(overrides: &[(&str, &str)]) -> PackageResult<Vec<u8>> {
    let mut writer = new_part()?;
    start_element(&mut writer, "Types", &[("xmlns", CONTENT_TYPES_NS)])?;
    empty_element(
        &mut writer,
        "Default",
        &[("Extension", "rels"), ("ContentType", RELATIONSHIPS_CONTENT_TYPE)],
    )?;
    empty_element(
        &mut writer,
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    for &(part_name, content_type) in overrides {
        empty_element(
            &mut writer,
            "Override",
            &[("PartName", part_name), ("ContentType", content_type)],
        )?;
    }
    end_element(&mut writer, "Types")?;
    Ok(finish_part(writer))
}

/// Zip container being filled with parts
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> PackageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub fn add_part(&mut self, name: &str, data: &[u8]) -> PackageResult<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn finish(self) -> PackageResult<W> {
        Ok(self.zip.finish()?)
    }
}

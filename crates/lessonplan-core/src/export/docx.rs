//! Minimal WordprocessingML (`.docx`) writer.
//!
//! Emits just the package parts Word and LibreOffice need: content types,
//! package and document relationships, core properties, the document body
//! and one default footer. Each part is written as a stream of XML events
//! and deflated into a zip archive in memory.

use std::borrow::Cow;
use std::io::{Cursor, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{COLUMN_HEADINGS, DOCUMENT_TITLE, DocumentBuilder, ExportError, FOOTER_TEXT};
use crate::plan::{LessonPlanRecord, PresentationItem, normalize};

const FONT: &str = "Times New Roman";

/// Body text size in half-points (13 pt).
const BODY_SIZE: u32 = 26;
const CHAPTER_SIZE: u32 = 28;
const TITLE_SIZE: u32 = 32;
const FOOTER_SIZE: u32 = 22;

const HEADER_FILL: &str = "F1F5F9";
const CHAPTER_FILL: &str = "1D4ED8";
const NOTE_COLOR: &str = "1D4ED8";
const FOOTER_COLOR: &str = "888888";

/// Column widths in percent; sums to 100.
const COLUMN_PERCENT: [u32; 5] = [5, 10, 30, 30, 25];

/// A4 portrait with 2 cm margins, in twentieths of a point.
const PAGE_WIDTH: u32 = 11906;
const PAGE_HEIGHT: u32 = 16838;
const PAGE_MARGIN: u32 = 1134;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CORE_PROPS_REL: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// Builds `.docx` files.
#[derive(Debug, Clone, Default)]
pub struct DocxBuilder {
    created: Option<DateTime<Utc>>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the creation timestamp written to the core properties.
    pub fn created_at(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }
}

impl DocumentBuilder for DocxBuilder {
    fn extension(&self) -> &str {
        "docx"
    }

    fn build(&self, records: &[LessonPlanRecord]) -> Result<Vec<u8>, ExportError> {
        let items = normalize(records);
        let created = self.created.unwrap_or_else(Utc::now);

        let parts = [
            ("[Content_Types].xml", content_types_xml()?),
            ("_rels/.rels", package_rels_xml()?),
            ("docProps/core.xml", core_properties_xml(created)?),
            ("word/_rels/document.xml.rels", document_rels_xml()?),
            ("word/document.xml", document_xml(&items)?),
            ("word/footer1.xml", footer_xml()?),
        ];

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, body) in &parts {
            zip.start_file(*name, opts)?;
            zip.write_all(body)?;
        }
        let bytes = zip.finish()?.into_inner();

        debug!(
            records = records.len(),
            rows = items.len(),
            bytes = bytes.len(),
            "built docx document"
        );
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Event writer
// ---------------------------------------------------------------------------

/// One package part under construction. Text and attribute values are
/// escaped by the writer.
struct XmlPart {
    writer: Writer<Vec<u8>>,
}

impl XmlPart {
    fn new() -> Result<Self, ExportError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), ExportError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let tag = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(tag))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), ExportError> {
        self.writer
            .write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
        Ok(())
    }

    /// `<name attrs>text</name>`.
    fn element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), ExportError> {
        self.open(name, attrs)?;
        self.text(text)?;
        self.close(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Drop characters XML 1.0 forbids and turn tabs into spaces.
///
/// Model output decoded through JSON escapes can carry control characters
/// (`\b` of `\beta`, `\f` of `\frac`); those are removed.
fn xml_safe(text: &str) -> Cow<'_, str> {
    let illegal = |c: char| ((c as u32) < 0x20 && c != '\n') || c == '\u{FFFE}' || c == '\u{FFFF}';
    if !text.chars().any(illegal) {
        return Cow::Borrowed(text);
    }
    text.chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            c if illegal(c) => None,
            c => Some(c),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Package parts
// ---------------------------------------------------------------------------

fn content_types_xml() -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("Types", &[("xmlns", CONTENT_TYPES_NS)])?;
    for (extension, content_type) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
    ] {
        xml.empty(
            "Default",
            &[("Extension", extension), ("ContentType", content_type)],
        )?;
    }
    for (part, content_type) in [
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        ),
        (
            "/word/footer1.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
    ] {
        xml.empty(
            "Override",
            &[("PartName", part), ("ContentType", content_type)],
        )?;
    }
    xml.close("Types")?;
    Ok(xml.finish())
}

fn relationships_xml(rels: &[(&str, &str, &str)]) -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("Relationships", &[("xmlns", PACKAGE_RELS_NS)])?;
    for &(id, kind, target) in rels {
        xml.empty(
            "Relationship",
            &[("Id", id), ("Type", kind), ("Target", target)],
        )?;
    }
    xml.close("Relationships")?;
    Ok(xml.finish())
}

fn package_rels_xml() -> Result<Vec<u8>, ExportError> {
    let document = format!("{R_NS}/officeDocument");
    relationships_xml(&[
        ("rId1", document.as_str(), "word/document.xml"),
        ("rId2", CORE_PROPS_REL, "docProps/core.xml"),
    ])
}

fn document_rels_xml() -> Result<Vec<u8>, ExportError> {
    let footer = format!("{R_NS}/footer");
    relationships_xml(&[("rId1", footer.as_str(), "footer1.xml")])
}

fn core_properties_xml(created: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let stamp = created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let w3c = [("xsi:type", "dcterms:W3CDTF")];

    let mut xml = XmlPart::new()?;
    xml.open(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    xml.element("dc:title", &[], DOCUMENT_TITLE)?;
    xml.element("dc:creator", &[], "Hoà Hiệp AI")?;
    xml.element("dcterms:created", &w3c, &stamp)?;
    xml.element("dcterms:modified", &w3c, &stamp)?;
    xml.close("cp:coreProperties")?;
    Ok(xml.finish())
}

fn document_xml(items: &[PresentationItem]) -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
    xml.open("w:body", &[])?;

    // Title.
    xml.open("w:p", &[])?;
    xml.open("w:pPr", &[])?;
    xml.empty("w:spacing", &[("w:after", "300")])?;
    xml.empty("w:jc", &[("w:val", "center")])?;
    xml.close("w:pPr")?;
    push_run(
        &mut xml,
        DOCUMENT_TITLE,
        RunStyle {
            bold: true,
            size: TITLE_SIZE,
            ..RunStyle::body()
        },
    )?;
    xml.close("w:p")?;

    // Table.
    xml.open("w:tbl", &[])?;
    xml.open("w:tblPr", &[])?;
    xml.empty("w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
    xml.open("w:tblBorders", &[])?;
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        xml.empty(
            &format!("w:{side}"),
            &[
                ("w:val", "single"),
                ("w:sz", "4"),
                ("w:space", "0"),
                ("w:color", "000000"),
            ],
        )?;
    }
    xml.close("w:tblBorders")?;
    xml.close("w:tblPr")?;

    xml.open("w:tblGrid", &[])?;
    let content_width = PAGE_WIDTH - 2 * PAGE_MARGIN;
    for percent in COLUMN_PERCENT {
        let width = (content_width * percent / 100).to_string();
        xml.empty("w:gridCol", &[("w:w", width.as_str())])?;
    }
    xml.close("w:tblGrid")?;

    push_heading_row(&mut xml)?;
    for item in items {
        match item {
            PresentationItem::ChapterHeader { title } => push_chapter_row(&mut xml, title)?,
            PresentationItem::Record(record) => push_lesson_row(&mut xml, record)?,
        }
    }
    xml.close("w:tbl")?;

    // Word requires a paragraph between a trailing table and the section.
    xml.empty("w:p", &[])?;

    let (width, height, margin) = (
        PAGE_WIDTH.to_string(),
        PAGE_HEIGHT.to_string(),
        PAGE_MARGIN.to_string(),
    );
    xml.open("w:sectPr", &[])?;
    xml.empty("w:footerReference", &[("w:type", "default"), ("r:id", "rId1")])?;
    xml.empty("w:pgSz", &[("w:w", width.as_str()), ("w:h", height.as_str())])?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", margin.as_str()),
            ("w:right", margin.as_str()),
            ("w:bottom", margin.as_str()),
            ("w:left", margin.as_str()),
            ("w:header", "708"),
            ("w:footer", "708"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.close("w:sectPr")?;

    xml.close("w:body")?;
    xml.close("w:document")?;
    Ok(xml.finish())
}

fn footer_xml() -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("w:ftr", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
    xml.open("w:p", &[])?;
    xml.open("w:pPr", &[])?;
    xml.empty("w:jc", &[("w:val", "right")])?;
    xml.close("w:pPr")?;
    push_run(
        &mut xml,
        FOOTER_TEXT,
        RunStyle {
            italic: true,
            color: Some(FOOTER_COLOR),
            size: FOOTER_SIZE,
            ..RunStyle::body()
        },
    )?;
    xml.close("w:p")?;
    xml.close("w:ftr")?;
    Ok(xml.finish())
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct RunStyle {
    bold: bool,
    italic: bool,
    color: Option<&'static str>,
    size: u32,
}

impl RunStyle {
    fn body() -> Self {
        Self {
            bold: false,
            italic: false,
            color: None,
            size: BODY_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

fn push_heading_row(xml: &mut XmlPart) -> Result<(), ExportError> {
    xml.open("w:tr", &[])?;
    xml.open("w:trPr", &[])?;
    xml.empty("w:tblHeader", &[])?;
    xml.close("w:trPr")?;
    for (heading, percent) in COLUMN_HEADINGS.iter().zip(COLUMN_PERCENT) {
        push_cell(
            xml,
            heading,
            CellLayout {
                percent,
                span: 1,
                fill: Some(HEADER_FILL),
                align: Align::Center,
            },
            RunStyle {
                bold: true,
                ..RunStyle::body()
            },
        )?;
    }
    xml.close("w:tr")
}

fn push_chapter_row(xml: &mut XmlPart, title: &str) -> Result<(), ExportError> {
    xml.open("w:tr", &[])?;
    push_cell(
        xml,
        &title.to_uppercase(),
        CellLayout {
            percent: 100,
            span: COLUMN_PERCENT.len(),
            fill: Some(CHAPTER_FILL),
            align: Align::Center,
        },
        RunStyle {
            bold: true,
            color: Some("FFFFFF"),
            size: CHAPTER_SIZE,
            ..RunStyle::body()
        },
    )?;
    xml.close("w:tr")
}

fn push_lesson_row(xml: &mut XmlPart, record: &LessonPlanRecord) -> Result<(), ExportError> {
    let body = RunStyle::body();
    let cells = [
        (&record.sequence_label, Align::Center, body),
        (&record.week_label, Align::Center, body),
        (
            &record.title_label,
            Align::Left,
            RunStyle { bold: true, ..body },
        ),
        (&record.content_summary, Align::Left, body),
        (
            &record.digital_competency_note,
            Align::Left,
            RunStyle {
                italic: true,
                color: Some(NOTE_COLOR),
                ..body
            },
        ),
    ];

    xml.open("w:tr", &[])?;
    for ((text, align, style), percent) in cells.into_iter().zip(COLUMN_PERCENT) {
        push_cell(
            xml,
            text,
            CellLayout {
                percent,
                span: 1,
                fill: None,
                align,
            },
            style,
        )?;
    }
    xml.close("w:tr")
}

#[derive(Debug, Clone, Copy)]
struct CellLayout {
    percent: u32,
    span: usize,
    fill: Option<&'static str>,
    align: Align,
}

fn push_cell(
    xml: &mut XmlPart,
    text: &str,
    layout: CellLayout,
    style: RunStyle,
) -> Result<(), ExportError> {
    xml.open("w:tc", &[])?;
    xml.open("w:tcPr", &[])?;
    // Table widths are in fiftieths of a percent.
    let width = (layout.percent * 50).to_string();
    xml.empty("w:tcW", &[("w:w", width.as_str()), ("w:type", "pct")])?;
    if layout.span > 1 {
        let span = layout.span.to_string();
        xml.empty("w:gridSpan", &[("w:val", span.as_str())])?;
    }
    if let Some(fill) = layout.fill {
        xml.empty(
            "w:shd",
            &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", fill)],
        )?;
    }
    xml.close("w:tcPr")?;

    xml.open("w:p", &[])?;
    if layout.align == Align::Center {
        xml.open("w:pPr", &[])?;
        xml.empty("w:jc", &[("w:val", "center")])?;
        xml.close("w:pPr")?;
    }
    push_run(xml, text, style)?;
    xml.close("w:p")?;
    xml.close("w:tc")
}

/// Append one run. Line breaks in `text` become `<w:br/>`.
fn push_run(xml: &mut XmlPart, text: &str, style: RunStyle) -> Result<(), ExportError> {
    let size = style.size.to_string();
    xml.open("w:r", &[])?;
    xml.open("w:rPr", &[])?;
    xml.empty(
        "w:rFonts",
        &[("w:ascii", FONT), ("w:hAnsi", FONT), ("w:cs", FONT)],
    )?;
    if style.bold {
        xml.empty("w:b", &[])?;
    }
    if style.italic {
        xml.empty("w:i", &[])?;
    }
    xml.empty("w:color", &[("w:val", style.color.unwrap_or("000000"))])?;
    xml.empty("w:sz", &[("w:val", size.as_str())])?;
    xml.empty("w:szCs", &[("w:val", size.as_str())])?;
    xml.close("w:rPr")?;

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.empty("w:br", &[])?;
        }
        xml.element("w:t", &[("xml:space", "preserve")], line)?;
    }
    xml.close("w:r")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use chrono::TimeZone;
    use zip::ZipArchive;

    fn rec(week: &str, seq: &str, chapter: &str, title: &str) -> LessonPlanRecord {
        LessonPlanRecord {
            sequence_label: seq.to_string(),
            week_label: week.to_string(),
            chapter_label: chapter.to_string(),
            title_label: title.to_string(),
            content_summary: format!("nội dung {title}"),
            digital_competency_note: format!("nls {title}"),
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not found"))
    }

    #[test]
    fn archive_contains_all_parts() {
        let bytes = DocxBuilder::new().build(&[rec("Tuần 1", "1", "A", "x")]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/footer1.xml",
            ]
        );
    }

    #[test]
    fn rows_follow_normalized_order() {
        let records = vec![
            rec("Tuần 2", "1", "Chương A", "Bài 3"),
            rec("Tuần 1", "2", "Chương A", "Bài 2"),
            rec("Tuần 1", "1", "Chương B", "Bài 1"),
        ];
        let bytes = DocxBuilder::new().build(&records).unwrap();
        let doc = read_part(&bytes, "word/document.xml");

        let header_b = position(&doc, "CHƯƠNG B");
        let lesson_1 = position(&doc, ">Bài 1<");
        let header_a = position(&doc, "CHƯƠNG A");
        let lesson_2 = position(&doc, ">Bài 2<");
        let lesson_3 = position(&doc, ">Bài 3<");
        assert!(header_b < lesson_1);
        assert!(lesson_1 < header_a);
        assert!(header_a < lesson_2);
        assert!(lesson_2 < lesson_3);

        assert_eq!(doc.matches(r#"<w:gridSpan w:val="5"/>"#).count(), 2);
        assert!(doc.contains(DOCUMENT_TITLE));
        for heading in COLUMN_HEADINGS {
            assert!(doc.contains(heading), "missing column heading {heading}");
        }
    }

    #[test]
    fn footer_carries_attribution() {
        let bytes = DocxBuilder::new().build(&[]).unwrap();
        let footer = read_part(&bytes, "word/footer1.xml");
        assert!(footer.contains(FOOTER_TEXT));
        assert!(footer.contains(r#"<w:jc w:val="right"/>"#));
        let doc = read_part(&bytes, "word/document.xml");
        assert!(doc.contains(r#"<w:footerReference w:type="default" r:id="rId1"/>"#));
    }

    #[test]
    fn core_properties_use_fixed_timestamp() {
        let created = Utc.with_ymd_and_hms(2026, 9, 5, 7, 30, 0).unwrap();
        let bytes = DocxBuilder::new().created_at(created).build(&[]).unwrap();
        let core = read_part(&bytes, "docProps/core.xml");
        assert!(core.contains("2026-09-05T07:30:00Z"));
    }

    #[test]
    fn text_is_escaped() {
        let mut record = rec("Tuần 1", "1", "", "a < b & c");
        record.content_summary = "dòng 1\ndòng 2\u{8}eta".to_string();
        let bytes = DocxBuilder::new().build(&[record]).unwrap();
        let doc = read_part(&bytes, "word/document.xml");
        assert!(doc.contains("a &lt; b &amp; c"));
        assert!(doc.contains(r#"dòng 1</w:t><w:br/><w:t xml:space="preserve">dòng 2eta"#));
        assert!(!doc.contains('\u{8}'));
    }

    #[test]
    fn markup_in_chapter_titles_is_escaped() {
        let record = rec("Tuần 1", "1", "Chương <I> & \"II\"", "x");
        let bytes = DocxBuilder::new().build(&[record]).unwrap();
        let doc = read_part(&bytes, "word/document.xml");
        assert!(doc.contains("CHƯƠNG &lt;I&gt; &amp;"));
        assert!(!doc.contains("<I>"));
    }

    #[test]
    fn xml_safe_drops_controls_and_keeps_clean_text_borrowed() {
        assert_eq!(xml_safe("a\tb\u{c}c\u{FFFE}"), "a bc");
        assert!(matches!(xml_safe("Mệnh đề"), Cow::Borrowed(_)));
    }
}

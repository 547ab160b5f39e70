//! Export of lesson plans to word-processor documents.
//!
//! The builder receives the raw, unsorted records and recomputes grouping
//! with [`crate::plan::normalize`], so the document and the on-screen table
//! always agree on order and chapter placement.

pub mod docx;

use thiserror::Error;

use crate::plan::LessonPlanRecord;

pub use docx::DocxBuilder;

/// Default output file name.
pub const DEFAULT_FILE_NAME: &str = "KHBD_NLS_HoaHiepAI.docx";

/// Document heading.
pub const DOCUMENT_TITLE: &str = "KẾ HOẠCH BÀI DẠY LỒNG GHÉP NĂNG LỰC SỐ";

/// Attribution line in the page footer.
pub const FOOTER_TEXT: &str = "Create by Hoà Hiệp AI – 0983.676.470";

/// Column headings of the plan table, left to right.
pub const COLUMN_HEADINGS: [&str; 5] = [
    "STT",
    "Tuần",
    "Tên Bài",
    "Nội Dung Đảm Bảo",
    "Năng Lực Số (NLS)",
];

/// Errors from building a document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write document archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error while building document: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write document XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Builds a document byte stream from lesson plan records.
pub trait DocumentBuilder {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &str;

    fn build(&self, records: &[LessonPlanRecord]) -> Result<Vec<u8>, ExportError>;
}

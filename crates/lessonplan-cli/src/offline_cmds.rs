//! `lessonplan render` and `lessonplan export`: work on a raw model response
//! saved with `generate --save-raw`, without calling the API.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use lessonplan_core::export::{DEFAULT_FILE_NAME, DocumentBuilder, DocxBuilder};
use lessonplan_core::plan::{LessonPlanRecord, decode_records, normalize};

use crate::render;

/// Read and decode a saved response. Undecodable content is an error here,
/// since there is no model to ask again.
pub fn load_raw(path: &Path) -> Result<Vec<LessonPlanRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read response file {}", path.display()))?;
    let decoded = decode_records(&raw)
        .with_context(|| format!("{} is not a lesson plan response", path.display()))?;
    if decoded.repaired {
        info!(path = %path.display(), "response needed backslash repair");
    }
    Ok(decoded.records)
}

pub fn run_render(path: &Path, json: bool, raw_math: bool) -> Result<()> {
    let records = load_raw(path)?;
    if records.is_empty() && !json {
        println!("No lesson plan rows in {}.", path.display());
        return Ok(());
    }
    render::print_plan(&normalize(&records), json, raw_math)
}

pub fn run_export(path: &Path, output: Option<&Path>) -> Result<()> {
    let records = load_raw(path)?;
    if records.is_empty() {
        bail!("nothing to export: {} contains no lesson plan rows", path.display());
    }
    let written = write_document(&records, output)?;
    println!("Exported {} rows to {}", records.len(), written.display());
    Ok(())
}

/// Build the document and write it to `output`, or to the default file name
/// in the current directory. A path without extension gets `.docx`.
pub fn write_document(records: &[LessonPlanRecord], output: Option<&Path>) -> Result<PathBuf> {
    let builder = DocxBuilder::new();
    let mut path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));
    if path.extension().is_none() {
        path.set_extension(builder.extension());
    }

    let bytes = builder.build(records).context("failed to build document")?;
    std::fs::write(&path, &bytes)
        .with_context(|| format!("cannot write document to {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "document written");
    Ok(path)
}

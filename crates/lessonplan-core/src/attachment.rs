//! Reading curriculum files into base64 attachments.
//!
//! All files are read concurrently and joined before the generation request
//! is built. A file that cannot be read becomes an attachment with an empty
//! payload, so one bad path never blocks the rest of the batch.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::gateway::Attachment;

/// MIME type used when the extension is not recognised.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Guess a MIME type from the file extension.
///
/// Covers the document and image types the upload form accepts.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Read one file. Never fails: read errors yield an empty payload.
pub async fn read_attachment(path: &Path) -> Attachment {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_for_path(path);

    let data = match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!(path = %path.display(), bytes = bytes.len(), mime_type, "read attachment");
            STANDARD.encode(bytes)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read attachment, sending empty payload");
            String::new()
        }
    };

    Attachment::new(name, mime_type, data)
}

/// Read every path concurrently, preserving input order.
pub async fn read_attachments<P: AsRef<Path>>(paths: &[P]) -> Vec<Attachment> {
    join_all(paths.iter().map(|p| read_attachment(p.as_ref()))).await
}

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hearback_core::{AttachmentKind, AttachmentRecord};
use std::io;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// Images larger than this are attached without an inline preview.
pub const MAX_PREVIEW_BYTES: u64 = 5 * 1024 * 1024;

/// Describe the file at `path` as an attachment record.
///
/// The path is made absolute; images up to [`MAX_PREVIEW_BYTES`] get a
/// `data:` URI preview. A preview that cannot be produced is simply left
/// out.
pub fn build_record(path: &Path) -> io::Result<AttachmentRecord> {
    let source_path = std::fs::canonicalize(path)?;
    let metadata = std::fs::metadata(&source_path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a regular file", source_path.display()),
        ));
    }

    let name = source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    let mime = mime_guess::from_path(&source_path).first();
    let image_mime = mime
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .map(|m| m.essence_str().to_string());

    let (kind, inline_data) = match image_mime {
        Some(mime) => {
            let preview = if metadata.len() <= MAX_PREVIEW_BYTES {
                data_uri(&source_path, &mime)
            } else {
                None
            };
            (AttachmentKind::Image, preview)
        }
        None => (AttachmentKind::File, None),
    };

    Ok(AttachmentRecord {
        id: Uuid::new_v4().to_string(),
        name,
        source_path,
        kind,
        size_bytes: metadata.len(),
        inline_data,
    })
}

fn data_uri(path: &Path, mime: &str) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(format!("data:{mime};base64,{}", BASE64.encode(bytes))),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not encode image preview");
            None
        }
    }
}

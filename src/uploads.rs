//! ID-image storage.
//!
//! Uploaded files are written under the uploads directory with a
//! server-generated `<uuid>.<ext>` name. The client-supplied filename only
//! contributes a sanitized extension, never a path segment.

use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Persist image bytes and return the public `/uploads/<file>` path stored
/// on the patient row.
pub async fn store_id_image(
    uploads_dir: &Path,
    original_filename: Option<&str>,
    bytes: &[u8],
) -> Result<String, UploadError> {
    tokio::fs::create_dir_all(uploads_dir).await?;

    let ext = sanitized_extension(original_filename);
    let filename = format!("{}.{}", Uuid::new_v4(), ext);
    tokio::fs::write(uploads_dir.join(&filename), bytes).await?;

    Ok(format!("/uploads/{filename}"))
}

/// Lowercased alphanumeric extension from the client filename; anything
/// missing or suspicious falls back to "jpg" (phone cameras' default here).
fn sanitized_extension(original_filename: Option<&str>) -> String {
    let ext: String = original_filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();

    if ext.is_empty() {
        "jpg".into()
    } else {
        ext
    }
}

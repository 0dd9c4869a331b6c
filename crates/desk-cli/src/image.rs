//! Image attachments encoded as data URIs

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::Path;

/// MIME type for a supported image extension
pub fn mime_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => bail!(
            "Unsupported image type '{}' (expected png, jpg, jpeg, gif or webp)",
            path.display()
        ),
    }
}

/// `data:<mime>;base64,<payload>` for raw image bytes
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Read an image file and encode it for the model
pub fn load_data_uri(path: &Path) -> Result<String> {
    let mime = mime_type(path)?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    if bytes.is_empty() {
        bail!("Image {} is empty", path.display());
    }
    Ok(data_uri(mime, &bytes))
}

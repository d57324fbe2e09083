//! Media type allow-list for advertisement uploads

use std::path::Path;

/// Allowed file extensions (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "mp4", "mov", "avi", "webm"];

/// Allowed declared MIME types
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "image/png",
    "image/gif",
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/avi",
    "video/msvideo",
    "video/webm",
];

/// MIME type browsers send when they cannot tell; carries no information
const GENERIC_MIME_TYPE: &str = "application/octet-stream";

/// Extension of the declared filename including the leading dot, as given
///
/// `"Summer Sale.PNG"` yields `Some(".PNG")`.
pub fn original_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
}

pub fn is_extension_allowed(extension: &str) -> bool {
    let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&normalized.as_str())
}

/// Absent and generic MIME types defer to the extension check
pub fn is_mime_type_allowed(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    // Drop parameters such as "; charset=binary"
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    essence.is_empty() || essence == GENERIC_MIME_TYPE || ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

//! Workspace logo loading. Logos are embedded as data URIs so the rendered
//! HTML is self-contained when it reaches the PDF service.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

/// Reads a logo file and returns it as a `data:` URI. Missing or unreadable
/// files degrade to `None`; documents render without a logo.
pub fn load_logo_data_uri(path: &str) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path, error = %err, "logo unreadable, rendering without it");
            return None;
        }
    };
    let mime = match Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_degrade_to_none() {
        assert!(load_logo_data_uri("/nonexistent/logo.png").is_none());
    }

    #[test]
    fn png_files_become_png_data_uris() {
        let dir = std::env::temp_dir();
        let path = dir.join("logo_test_asset.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let uri = load_logo_data_uri(path.to_str().unwrap()).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        std::fs::remove_file(&path).ok();
    }
}

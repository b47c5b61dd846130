//! Data URL encoding for image sources.

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const PNG_MIME: &str = "image/png";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Wraps an already base64-encoded PNG as returned by the backend.
pub fn png_data_url(base64_png: &str) -> String {
    format!("data:{PNG_MIME};base64,{base64_png}")
}

pub fn encode(mime_type: Option<&str>, bytes: &[u8]) -> String {
    let mime_type = mime_type.unwrap_or(FALLBACK_MIME);
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Splits a base64 data URL into its mime type and decoded payload.
pub fn decode(data_url: &str) -> Option<(String, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime_type.to_string(), bytes))
}

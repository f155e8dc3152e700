//! Media helpers: MIME types, attachment file names, and base64 data URIs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;

/// Largest reference image accepted for image-to-video jobs (5 MiB).
///
/// The provider rejects data URIs above this size.
pub const MAX_REFERENCE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// The kind of artifact a job produces, which decides how it is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// File name used when the artifact has to be uploaded as bytes.
    pub fn default_filename(self) -> &'static str {
        match self {
            MediaKind::Video => "result.mp4",
            MediaKind::Image => "result.png",
        }
    }
}

/// Map a MIME type to the file extension used for attachments.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Guess a MIME type from a file name's extension.
pub fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Encode bytes as a `data:<mime>;base64,<payload>` URI.
pub fn encode_data_uri(bytes: &[u8], content_type: &str) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 data URI into its MIME type and raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), CoreError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CoreError::InvalidDataUri("missing `data:` prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CoreError::InvalidDataUri("missing `,` separator".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| CoreError::InvalidDataUri("only base64 payloads are supported".into()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| CoreError::InvalidDataUri(e.to_string()))?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Ok((mime.to_string(), bytes))
}

/// Check whether a string looks like a data URI.
pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_encodes_mime_and_payload() {
        let uri = encode_data_uri(b"abc", "image/jpeg");
        assert_eq!(uri, "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn data_uri_decodes_back() {
        let (mime, bytes) = decode_data_uri("data:video/mp4;base64,AAEC").unwrap();
        assert_eq!(mime, "video/mp4");
        assert_eq!(bytes, vec![0, 1, 2]);
    }

    #[test]
    fn data_uri_rejects_plain_urls() {
        assert!(decode_data_uri("https://x/1.mp4").is_err());
    }

    #[test]
    fn data_uri_rejects_non_base64_payloads() {
        assert!(decode_data_uri("data:text/plain,hello").is_err());
    }

    #[test]
    fn mime_and_extension_agree() {
        assert_eq!(extension_for_mime(mime_for_filename("result.mp4")), "mp4");
        assert_eq!(extension_for_mime(mime_for_filename("RESULT.PNG")), "png");
        assert_eq!(mime_for_filename("no_extension"), "application/octet-stream");
    }

    #[test]
    fn default_filenames_follow_kind() {
        assert_eq!(MediaKind::Video.default_filename(), "result.mp4");
        assert_eq!(MediaKind::Image.default_filename(), "result.png");
    }
}

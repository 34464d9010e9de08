use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Fallback when an upload carries no usable content type.
pub const DEFAULT_MIME: &str = "image/jpeg";

/// Top-level media types that can never hold a photo. Anything else that
/// is not `image/*` is treated as an unlabeled image.
const NON_IMAGE_FAMILIES: &[&str] = &[
    "text",
    "audio",
    "video",
    "font",
    "model",
    "multipart",
    "message",
];

/// An image encoded as `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("image is not a data URI")]
    NotDataUri,
    #[error("image data URI is not base64 encoded")]
    NotBase64,
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not valid base64")]
    InvalidPayload,
}

impl DataUri {
    /// Encode raw upload bytes; a missing or unknown MIME type becomes
    /// [`DEFAULT_MIME`].
    pub fn from_bytes(bytes: &[u8], mime: Option<&str>) -> Result<Self, DataUriError> {
        if bytes.is_empty() {
            return Err(DataUriError::Empty);
        }
        Ok(Self {
            mime: normalize_mime(mime),
            payload: STANDARD.encode(bytes),
        })
    }

    /// Parse and validate a data URI string sent by a client.
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let rest = raw.trim().strip_prefix("data:").ok_or(DataUriError::NotDataUri)?;
        let (meta, payload) = rest.split_once(',').ok_or(DataUriError::NotDataUri)?;
        let mime = meta.strip_suffix(";base64").ok_or(DataUriError::NotBase64)?;

        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if payload.is_empty() {
            return Err(DataUriError::Empty);
        }
        STANDARD
            .decode(payload.as_bytes())
            .map_err(|_| DataUriError::InvalidPayload)?;

        Ok(Self {
            mime: normalize_mime(Some(mime)),
            payload,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.payload)
    }
}

fn normalize_mime(mime: Option<&str>) -> String {
    // Parameters like `; charset=` never matter for images.
    let base = mime
        .map(|m| m.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();
    let family = base.split('/').next().unwrap_or("");
    if base.starts_with("image/") || NON_IMAGE_FAMILIES.contains(&family) {
        base
    } else {
        DEFAULT_MIME.to_string()
    }
}

/// Whether a stored image reference can be displayed as an inline image.
pub fn is_data_image(reference: &str) -> bool {
    reference.starts_with("data:image")
}

/// Guess an image MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_bytes() {
        let uri = DataUri::from_bytes(b"hello", Some("image/png")).unwrap();
        assert_eq!(uri.to_string(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn missing_mime_defaults() {
        let uri = DataUri::from_bytes(b"x", None).unwrap();
        assert_eq!(uri.mime, DEFAULT_MIME);
        let uri = DataUri::from_bytes(b"x", Some("")).unwrap();
        assert_eq!(uri.mime, DEFAULT_MIME);
        let uri = DataUri::from_bytes(b"x", Some("application/octet-stream")).unwrap();
        assert_eq!(uri.mime, DEFAULT_MIME);
    }

    #[test]
    fn unknown_mime_defaults() {
        for mime in ["binary/octet-stream", "application/x-unknown", "whatever"] {
            let uri = DataUri::from_bytes(b"x", Some(mime)).unwrap();
            assert_eq!(uri.mime, DEFAULT_MIME, "{mime}");
            assert!(uri.is_image());
        }
        let uri = DataUri::parse("data:binary/octet-stream;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime, DEFAULT_MIME);
    }

    #[test]
    fn non_image_families_are_kept() {
        let uri = DataUri::from_bytes(b"x", Some("text/plain; charset=utf-8")).unwrap();
        assert_eq!(uri.mime, "text/plain");
        assert!(!uri.is_image());
        assert!(!DataUri::from_bytes(b"x", Some("video/mp4")).unwrap().is_image());
    }

    #[test]
    fn empty_upload_rejected() {
        assert_eq!(DataUri::from_bytes(b"", None), Err(DataUriError::Empty));
    }

    #[test]
    fn parse_valid() {
        let uri = DataUri::parse("data:image/webp;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime, "image/webp");
        assert_eq!(uri.payload, "aGVsbG8=");
        assert!(uri.is_image());
    }

    #[test]
    fn parse_empty_mime_defaults() {
        let uri = DataUri::parse("data:;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime, DEFAULT_MIME);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(DataUri::parse("https://x/y.png"), Err(DataUriError::NotDataUri));
        assert_eq!(DataUri::parse("data:image/png,raw"), Err(DataUriError::NotBase64));
        assert_eq!(DataUri::parse("data:image/png;base64,"), Err(DataUriError::Empty));
        assert_eq!(
            DataUri::parse("data:image/png;base64,!!!"),
            Err(DataUriError::InvalidPayload)
        );
    }

    #[test]
    fn data_image_detection() {
        assert!(is_data_image("data:image/png;base64,AAAA"));
        assert!(!is_data_image("placeholder"));
        assert!(!is_data_image(""));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/b.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("shot.png")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }
}

//! Input classification: map a declared media type to a document kind.
//!
//! Uploads arrive as raw bytes plus the media type the client declared. Only
//! PDF, PNG and JPEG are accepted; everything else is rejected up front with
//! [`ExtractError::UnsupportedFormat`] carrying the declared string unchanged.
//! The declared type is trusted for dispatch; if the bytes turn out not to
//! match, decoding fails later with [`ExtractError::Decode`].

use crate::error::ExtractError;
use std::path::Path;
use tracing::debug;

/// The document kinds the rasteriser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Classify a declared media type.
    ///
    /// Matching ignores ASCII case and any `; parameter` suffix. `image/jpg`
    /// is accepted as an alias of `image/jpeg`.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let kind = match essence.as_str() {
            "application/pdf" => DocumentKind::Pdf,
            "image/png" => DocumentKind::Png,
            "image/jpeg" | "image/jpg" => DocumentKind::Jpeg,
            _ => {
                return Err(ExtractError::UnsupportedFormat {
                    mime: mime.to_string(),
                })
            }
        };
        debug!("Declared media type {:?} → {:?}", mime, kind);
        Ok(kind)
    }
}

/// Guess a media type from a file extension, for callers that load files from
/// disk rather than receiving a declared type.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// True if `bytes` starts with the `%PDF` signature.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_types_classify() {
        assert_eq!(DocumentKind::from_mime("application/pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_mime("image/png").unwrap(), DocumentKind::Png);
        assert_eq!(DocumentKind::from_mime("image/jpeg").unwrap(), DocumentKind::Jpeg);
        assert_eq!(DocumentKind::from_mime("image/jpg").unwrap(), DocumentKind::Jpeg);
        assert_eq!(
            DocumentKind::from_mime("Application/PDF; charset=binary").unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn unsupported_type_keeps_declared_string() {
        match DocumentKind::from_mime("application/zip") {
            Err(ExtractError::UnsupportedFormat { mime }) => assert_eq!(mime, "application/zip"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        assert!(DocumentKind::from_mime("").is_err());
        assert!(DocumentKind::from_mime("image/gif").is_err());
    }

    #[test]
    fn mime_guessed_from_extension() {
        assert_eq!(mime_from_path(Path::new("paper.PDF")), Some("application/pdf"));
        assert_eq!(mime_from_path(Path::new("scan.jpg")), Some("image/jpeg"));
        assert_eq!(mime_from_path(Path::new("scan.png")), Some("image/png"));
        assert_eq!(mime_from_path(Path::new("archive.zip")), None);
        assert_eq!(mime_from_path(Path::new("noext")), None);
    }

    #[test]
    fn pdf_magic() {
        assert!(has_pdf_magic(b"%PDF-1.7\n"));
        assert!(!has_pdf_magic(b"\x89PNG"));
        assert!(!has_pdf_magic(b""));
    }
}

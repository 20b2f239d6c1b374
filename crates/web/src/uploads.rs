//! Store photo uploads.
//!
//! Raster photos are written as-is (no resizing) to the uploads directory
//! under a random name and served back from `/uploads`.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Errors that can occur while accepting a photo.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The part is not a JPEG, PNG, GIF or WebP image.
    #[error("That file type isn't allowed!")]
    UnsupportedType(String),

    /// Writing the file failed.
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Raster formats a store photo may use.
///
/// Only formats browsers render inertly are accepted; vector and markup
/// formats such as SVG would be served back same-origin as documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl PhotoFormat {
    /// The format named by a `Content-Type` value, ignoring parameters.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Whether `bytes` start with this format's file signature.
    #[must_use]
    pub fn matches(self, bytes: &[u8]) -> bool {
        match self {
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            Self::Gif => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
            Self::Webp => {
                bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice())
            }
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Pick a stored filename for an upload of `content_type` holding `bytes`.
///
/// # Errors
///
/// Returns `UploadError::UnsupportedType` unless the type is one of the
/// [`PhotoFormat`]s and the bytes carry that format's signature.
pub fn photo_filename(content_type: &str, bytes: &[u8]) -> Result<String, UploadError> {
    let format = PhotoFormat::from_content_type(content_type)
        .filter(|format| format.matches(bytes))
        .ok_or_else(|| UploadError::UnsupportedType(content_type.to_owned()))?;

    Ok(format!("{}.{}", Uuid::new_v4(), format.extension()))
}

/// Write an uploaded photo into `dir` and return its stored filename.
///
/// # Errors
///
/// Returns `UploadError::UnsupportedType` for anything but a raster image
/// and `UploadError::Io` if the file can't be written.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub async fn save_photo(
    dir: &Path,
    content_type: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    let filename = photo_filename(content_type, bytes)?;

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&filename), bytes).await?;

    debug!(%filename, "Saved photo");
    Ok(filename)
}

/// Remove a stored photo; a file that is already gone is not an error.
///
/// # Errors
///
/// Returns `UploadError::Io` if the file exists but can't be removed.
pub async fn remove_photo(dir: &Path, filename: &str) -> Result<(), UploadError> {
    match tokio::fs::remove_file(dir.join(filename)).await {
        Ok(()) => {
            debug!(%filename, "Removed photo");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    const WEBP: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";

    #[test]
    fn test_filename_uses_format_extension() {
        let name = photo_filename("image/jpeg", JPEG).unwrap();
        let (stem, ext) = name.split_once('.').unwrap();

        assert_eq!(ext, "jpeg");
        assert!(Uuid::parse_str(stem).is_ok());
        assert!(photo_filename("image/jpg", JPEG).unwrap().ends_with(".jpeg"));
        assert!(photo_filename("image/webp", WEBP).unwrap().ends_with(".webp"));
    }

    #[test]
    fn test_filename_ignores_parameters_and_case() {
        assert!(
            photo_filename("IMAGE/PNG; charset=binary", PNG)
                .unwrap()
                .ends_with(".png")
        );
    }

    #[test]
    fn test_svg_rejected() {
        let script = b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>";
        for content_type in ["image/svg+xml", "image/svg"] {
            let err = photo_filename(content_type, script).unwrap_err();
            assert_eq!(err.to_string(), "That file type isn't allowed!");
        }
    }

    #[test]
    fn test_signature_must_match_content_type() {
        assert!(photo_filename("image/png", b"not really a png").is_err());
        assert!(photo_filename("image/png", JPEG).is_err());
        assert!(photo_filename("image/gif", b"<html>").is_err());
        assert!(photo_filename("image/webp", b"RIFF\0\0\0\0WAVE").is_err());
        assert!(photo_filename("image/png", b"").is_err());
    }

    #[test]
    fn test_non_images_rejected() {
        for content_type in ["text/plain", "application/pdf", "", "image/", "text/html"] {
            let err = photo_filename(content_type, PNG).unwrap_err();
            assert_eq!(err.to_string(), "That file type isn't allowed!");
        }
    }

    #[tokio::test]
    async fn test_save_photo_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");

        let name = save_photo(&nested, "image/gif", b"GIF89a\x01\0").await.unwrap();

        assert_eq!(std::fs::read(nested.join(name)).unwrap(), b"GIF89a\x01\0");
    }

    #[tokio::test]
    async fn test_remove_photo() {
        let dir = tempfile::tempdir().unwrap();
        let name = save_photo(dir.path(), "image/png", PNG).await.unwrap();

        remove_photo(dir.path(), &name).await.unwrap();
        assert!(!dir.path().join(&name).exists());

        // Already gone.
        remove_photo(dir.path(), &name).await.unwrap();
    }
}

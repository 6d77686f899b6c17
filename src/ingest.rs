//! Image ingestion: media-type validation, base64 encoding, preview handles.
//!
//! Validation happens at the boundary, before any encoding work: a file whose
//! declared type is outside the supported set is rejected without touching
//! existing state.

use crate::error::{NanoEditError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Media types accepted at the upload boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// JPEG (lossy).
    Jpeg,
    /// PNG (lossless).
    Png,
    /// WebP (modern, efficient).
    WebP,
    /// HEIC (Apple camera default).
    Heic,
    /// HEIF (the container HEIC specializes).
    Heif,
}

impl MediaType {
    /// Returns the file extension for this media type.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Heic => "heic",
            Self::Heif => "heif",
        }
    }

    /// Returns the MIME type string sent over the wire.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
        }
    }

    /// Looks up a declared MIME type against the supported set.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/heic" => Some(Self::Heic),
            "image/heif" => Some(Self::Heif),
            _ => None,
        }
    }

    /// Attempts to detect the media type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "heic" => Some(Self::Heic),
            "heif" => Some(Self::Heif),
            _ => None,
        }
    }

    /// Detects the media type from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        // HEIC/HEIF: ISO-BMFF "ftyp" box at offset 4, brand at offset 8
        if &data[4..8] == b"ftyp" {
            let brand = &data[8..12];
            if brand == b"heic" || brand == b"heix" || brand == b"hevc" || brand == b"hevx" {
                return Some(Self::Heic);
            }
            if brand == b"mif1" || brand == b"msf1" || brand == b"heif" {
                return Some(Self::Heif);
            }
        }

        None
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// A revocable preview artifact for a selected image.
///
/// Holds the decoded bytes in a named temporary file so external viewers can
/// display the selection. The file is deleted when the handle is released or
/// dropped; superseding an image therefore never leaks preview files.
#[derive(Debug)]
pub struct PreviewHandle {
    file: Option<NamedTempFile>,
}

impl PreviewHandle {
    fn create(bytes: &[u8], media_type: MediaType) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("nanoedit-preview-")
            .suffix(&format!(".{}", media_type.extension()))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file: Some(file) })
    }

    /// Path of the preview file, if the handle has not been released.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Returns true once the preview file has been deleted.
    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    /// Deletes the preview file. Idempotent.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = file.close() {
                tracing::warn!(error = %err, "failed to remove preview file");
            }
        }
    }
}

/// A validated, base64-encoded image ready to send to the editing service.
///
/// The payload and media type are always both present; the struct can only be
/// constructed through validation. Replacing an `EncodedImage` drops its
/// preview handle, deleting the preview file.
#[derive(Debug)]
pub struct EncodedImage {
    source: Option<PathBuf>,
    preview: PreviewHandle,
    base64: String,
    media_type: MediaType,
}

impl EncodedImage {
    /// Encodes raw image bytes under the given declared media type.
    pub fn from_bytes(bytes: &[u8], media_type: MediaType) -> Result<Self> {
        if let Some(detected) = MediaType::from_magic_bytes(bytes) {
            if detected != media_type {
                tracing::warn!(
                    declared = media_type.mime_type(),
                    detected = detected.mime_type(),
                    "declared media type does not match file contents"
                );
            }
        }

        Ok(Self {
            source: None,
            preview: PreviewHandle::create(bytes, media_type)?,
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type,
        })
    }

    /// Parses a `data:` URL, validating its declared MIME type against the
    /// supported set and stripping the header so the stored payload is raw,
    /// canonically padded base64.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let declared = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split(&[';', ','][..]).next())
            .unwrap_or_default();

        let media_type = MediaType::from_mime(declared).ok_or_else(|| {
            NanoEditError::UnsupportedMediaType(if declared.is_empty() {
                "unknown".to_string()
            } else {
                declared.to_string()
            })
        })?;

        let bytes = decode_lenient(url).map_err(|e| NanoEditError::Decode(e.to_string()))?;
        Self::from_bytes(&bytes, media_type)
    }

    /// Where the image was read from, when it came from the filesystem.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The raw base64 payload, with no data-URI header fragment.
    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// The declared media type of the payload.
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// The preview handle derived from this image.
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Mutable access to the preview handle, e.g. to release it early.
    pub fn preview_mut(&mut self) -> &mut PreviewHandle {
        &mut self.preview
    }

    /// Renders the payload as a data URL for display surfaces.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime_type(), self.base64)
    }
}

/// Reads and encodes an image file.
///
/// The declared media type comes from the file extension and is validated
/// before any bytes are read. The read suspends the calling task rather than
/// blocking the runtime.
pub async fn ingest_file(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let path = path.as_ref();

    let media_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaType::from_extension)
        .ok_or_else(|| NanoEditError::UnsupportedMediaType(path.display().to_string()))?;

    let bytes = tokio::fs::read(path).await?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read input image");

    let mut encoded = EncodedImage::from_bytes(&bytes, media_type)?;
    encoded.source = Some(path.to_path_buf());
    Ok(encoded)
}

/// Decodes a base64 string that may be imperfectly formatted.
///
/// Payloads arriving from display surfaces frequently carry a data-URI prefix
/// (`data:image/png;base64,...`), embedded whitespace, or missing `=` padding.
/// All of these are normalized before decoding.
fn decode_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let b64 = match input.find(";base64,") {
        Some(pos) => &input[pos + 8..],
        None => input,
    };

    let cleaned: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const HEIC_MAGIC: [u8; 12] = *b"\x00\x00\x00\x18ftypheic";

    #[test]
    fn test_from_mime() {
        assert_eq!(MediaType::from_mime("image/jpeg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_mime("image/png"), Some(MediaType::Png));
        assert_eq!(MediaType::from_mime("image/webp"), Some(MediaType::WebP));
        assert_eq!(MediaType::from_mime("image/heic"), Some(MediaType::Heic));
        assert_eq!(MediaType::from_mime("image/heif"), Some(MediaType::Heif));
        assert_eq!(MediaType::from_mime("image/gif"), None);
        assert_eq!(MediaType::from_mime("text/plain"), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(MediaType::from_extension("jpg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("JPEG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("png"), Some(MediaType::Png));
        assert_eq!(MediaType::from_extension("heic"), Some(MediaType::Heic));
        assert_eq!(MediaType::from_extension("gif"), None);
        assert_eq!(MediaType::from_extension("txt"), None);
    }

    #[test]
    fn test_from_magic_bytes() {
        assert_eq!(
            MediaType::from_magic_bytes(&PNG_MAGIC),
            Some(MediaType::Png)
        );
        assert_eq!(
            MediaType::from_magic_bytes(&JPEG_MAGIC),
            Some(MediaType::Jpeg)
        );
        assert_eq!(
            MediaType::from_magic_bytes(&HEIC_MAGIC),
            Some(MediaType::Heic)
        );
        assert_eq!(
            MediaType::from_magic_bytes(b"\x00\x00\x00\x18ftypmif1"),
            Some(MediaType::Heif)
        );
        assert_eq!(MediaType::from_magic_bytes(b"not an image"), None);
    }

    #[test]
    fn test_encoded_payload_is_prefix_free() {
        let encoded = EncodedImage::from_bytes(&JPEG_MAGIC, MediaType::Jpeg).unwrap();
        assert_eq!(encoded.media_type(), MediaType::Jpeg);
        assert!(!encoded.base64().is_empty());
        assert!(!encoded.base64().contains(':'));
        assert!(!encoded.base64().contains(';'));
        assert!(!encoded.base64().contains(','));
    }

    #[test]
    fn test_from_data_url_strips_prefix() {
        let payload = base64::engine::general_purpose::STANDARD.encode(PNG_MAGIC);
        let url = format!("data:image/png;base64,{payload}");

        let encoded = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(encoded.media_type(), MediaType::Png);
        assert_eq!(encoded.base64(), payload);
        assert!(!encoded.base64().contains(','));
    }

    #[test]
    fn test_from_data_url_rejects_unsupported_type() {
        let err = EncodedImage::from_data_url("data:image/gif;base64,AAAA").unwrap_err();
        assert!(matches!(err, NanoEditError::UnsupportedMediaType(ref t) if t == "image/gif"));
    }

    #[test]
    fn test_decode_lenient_handles_whitespace_and_padding() {
        // "Man" encodes to "TWFu"; strip padding and insert a newline
        assert_eq!(decode_lenient("TW\nFu").unwrap(), b"Man");
        assert_eq!(decode_lenient("TWE").unwrap(), b"Ma");
        assert_eq!(
            decode_lenient("data:image/png;base64,TWFu").unwrap(),
            b"Man"
        );
        assert!(decode_lenient("not base64!").is_err());
    }

    #[test]
    fn test_preview_written_and_released() {
        let encoded = EncodedImage::from_bytes(&PNG_MAGIC, MediaType::Png).unwrap();
        let path = encoded.preview().path().unwrap().to_path_buf();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), PNG_MAGIC.to_vec());

        let mut encoded = encoded;
        encoded.preview_mut().release();
        assert!(encoded.preview().is_released());
        assert!(encoded.preview().path().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_preview_released_on_drop() {
        let path = {
            let encoded = EncodedImage::from_bytes(&PNG_MAGIC, MediaType::Png).unwrap();
            encoded.preview().path().unwrap().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_to_data_url_round_trip() {
        let encoded = EncodedImage::from_bytes(&PNG_MAGIC, MediaType::Png).unwrap();
        let url = encoded.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let reparsed = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(reparsed.base64(), encoded.base64());
    }

    #[tokio::test]
    async fn test_ingest_file_takes_declared_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, JPEG_MAGIC).unwrap();

        let encoded = ingest_file(&path).await.unwrap();
        assert_eq!(encoded.media_type(), MediaType::Jpeg);
        assert_eq!(encoded.source(), Some(path.as_path()));
        assert!(!encoded.base64().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_file_rejects_unsupported_extension_before_reading() {
        // The path does not exist; rejection must happen before the read.
        let err = ingest_file("notes.txt").await.unwrap_err();
        assert!(matches!(err, NanoEditError::UnsupportedMediaType(_)));
    }
}

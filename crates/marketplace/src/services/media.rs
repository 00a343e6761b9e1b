//! Uploaded product images on local disk.
//!
//! Files are stored flat under the media directory with random UUID names
//! and served by `ServeDir` at `/media`. The content type is decided from
//! the file's leading bytes, never from the client's claim.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::config::MediaConfig;

/// URL prefix the media directory is mounted at.
pub const MEDIA_URL_PREFIX: &str = "/media/";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file is empty")]
    Empty,

    #[error("file is larger than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("only JPEG, PNG, WebP, and GIF images are accepted")]
    UnsupportedType,

    #[error("not a media URL: {0}")]
    ForeignUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl ImageKind {
    /// Detect the format from magic bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
            _ => None,
        }
    }

    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }
}

/// Writes and deletes files in the media directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl MediaStore {
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_upload_bytes,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check an upload without writing it.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Empty`, `MediaError::TooLarge`, or
    /// `MediaError::UnsupportedType`.
    pub fn validate(&self, bytes: &[u8]) -> Result<ImageKind, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                limit: self.max_bytes,
            });
        }
        ImageKind::sniff(bytes).ok_or(MediaError::UnsupportedType)
    }

    /// Store an image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error or `MediaError::Io` if the write fails.
    pub async fn save_image(&self, bytes: &[u8]) -> Result<String, MediaError> {
        let kind = self.validate(bytes)?;
        let name = format!("{}.{}", Uuid::new_v4().simple(), kind.extension());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), bytes).await?;

        tracing::debug!(file = %name, size = bytes.len(), "Stored upload");
        Ok(format!("{MEDIA_URL_PREFIX}{name}"))
    }

    /// Delete a previously stored file by its URL. Missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::ForeignUrl` for URLs this store did not issue.
    pub async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let name = file_name(url).ok_or_else(|| MediaError::ForeignUrl(url.to_owned()))?;
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The bare file name behind a media URL, rejecting anything path-like.
fn file_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix(MEDIA_URL_PREFIX)?;
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.')
        && !name.starts_with('.');
    valid.then_some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn store(dir: PathBuf, max: usize) -> MediaStore {
        MediaStore::new(&MediaConfig {
            dir,
            max_upload_bytes: max,
        })
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("livestall-media-{}", Uuid::new_v4().simple()))
    }

    #[test]
    fn test_sniff_formats() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\x10\0\0\0WEBPVP8 "), Some(ImageKind::WebP));
        assert_eq!(ImageKind::sniff(b"<svg xmlns="), None);
        assert_eq!(ImageKind::sniff(b"RIFF\x10\0\0\0WAVE"), None);
    }

    #[test]
    fn test_validate_limits() {
        let store = store(temp_dir(), 8);
        assert!(matches!(store.validate(&[]), Err(MediaError::Empty)));
        assert!(matches!(
            store.validate(PNG),
            Err(MediaError::TooLarge { limit: 8 })
        ));
        assert!(matches!(
            store.validate(b"hello"),
            Err(MediaError::UnsupportedType)
        ));
    }

    #[test]
    fn test_file_name_rejects_traversal() {
        assert_eq!(file_name("/media/abc.png"), Some("abc.png"));
        assert_eq!(file_name("/media/../secret"), None);
        assert_eq!(file_name("/media/a/b.png"), None);
        assert_eq!(file_name("/static/a.png"), None);
        assert_eq!(file_name("/media/"), None);
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = temp_dir();
        let store = store(dir.clone(), 1024);

        let url = store.save_image(PNG).await.unwrap();
        assert!(url.starts_with(MEDIA_URL_PREFIX));
        assert!(url.ends_with(".png"));

        let path = dir.join(file_name(&url).unwrap());
        assert!(path.exists());

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
        // Deleting twice is fine.
        store.delete(&url).await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

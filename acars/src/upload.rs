//! Multipart parsing and media storage for the sell-car form.
//!
//! Parsing and storage are separate steps: [`read_listing_form`] streams the multipart body,
//! enforces the file rules and stages accepted files in memory, and [`UploadStore::persist`]
//! writes them out only after the submission has been validated. A rejected submission never
//! leaves files behind.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use rand::prelude::RngExt;
use tokio::io::AsyncWriteExt;

use crate::config::LimitsConfig;
use crate::errors::{Error, FileConstraintError, Result, ValidationError};
use crate::types::{StagedFile, UploadedFile};
use crate::validation::CarListingFields;

/// Multipart field carrying the listing media
pub const MEDIA_FIELD: &str = "mediaFiles";

const NAME_ATTEMPTS: usize = 5;

/// Everything read from a sell-car multipart body.
#[derive(Debug, Default)]
pub struct ListingForm {
    pub fields: CarListingFields,
    pub files: Vec<StagedFile>,
}

/// Only images and videos are accepted. The declared content type is trusted as-is.
pub fn is_media_type(mime_type: &str) -> bool {
    let mime_type = mime_type.to_ascii_lowercase();
    mime_type.starts_with("image/") || mime_type.starts_with("video/")
}

/// `{field}-{millis}-{random}{ext}`, where `ext` keeps its leading dot and is empty when the
/// original name has no extension.
pub fn generated_name(field_name: &str, original_name: &str, timestamp_millis: i64, random: u32) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("{field_name}-{timestamp_millis}-{random}{extension}")
}

fn multipart_error(e: MultipartError, limits: &LimitsConfig) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileConstraintError::FileTooLarge {
            limit: limits.max_file_size,
        }
        .into()
    } else {
        ValidationError::MalformedRequest { reason: e.body_text() }.into()
    }
}

/// Reads the sell-car multipart body.
///
/// Fails fast on the first part that breaks a rule: more than `max_files` files, a non-media
/// content type, a file larger than `max_file_size`, or a file under an unknown field name.
/// File parts with an empty file name (an untouched file input) are skipped; unknown text
/// fields are ignored.
#[tracing::instrument(skip_all)]
pub async fn read_listing_form(mut multipart: Multipart, limits: &LimitsConfig) -> Result<ListingForm> {
    let mut form = ListingForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_error(e, limits))? {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            let value = field.text().await.map_err(|e| multipart_error(e, limits))?;
            match field_name.as_str() {
                "carName" => form.fields.car_name = Some(value),
                "carModel" => form.fields.car_model = Some(value),
                "carDescription" => form.fields.car_description = Some(value),
                other => tracing::debug!(field = other, "Ignoring unknown text field"),
            }
            continue;
        };

        if file_name.is_empty() {
            continue;
        }

        if field_name != MEDIA_FIELD {
            return Err(FileConstraintError::UnexpectedField { field: field_name }.into());
        }

        if form.files.len() >= limits.max_files {
            tracing::warn!(max_files = limits.max_files, "File count limit exceeded, aborting upload");
            return Err(FileConstraintError::TooManyFiles {
                limit: limits.max_files,
            }
            .into());
        }

        let mime_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        if !is_media_type(&mime_type) {
            return Err(FileConstraintError::InvalidFileType { file_name, mime_type }.into());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limits))? {
            // Check size limit incrementally to fail fast
            if (bytes.len() + chunk.len()) as u64 > limits.max_file_size {
                tracing::warn!(
                    file_name = %file_name,
                    max_file_size = limits.max_file_size,
                    "File size limit exceeded, aborting upload"
                );
                return Err(FileConstraintError::FileTooLarge {
                    limit: limits.max_file_size,
                }
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(file_name = %file_name, mime_type = %mime_type, size = bytes.len(), "Staged file");

        form.files.push(StagedFile {
            field_name,
            original_name: file_name,
            mime_type,
            bytes,
        });
    }

    Ok(form)
}

/// The flat directory that holds uploaded media.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the uploads directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| Error::Internal {
            operation: format!("create uploads directory {}: {e}", self.dir.display()),
        })
    }

    /// Writes staged files under generated names.
    ///
    /// All or nothing: if any write fails, files already written for this call are removed.
    #[tracing::instrument(skip_all, fields(count = files.len()))]
    pub async fn persist(&self, files: Vec<StagedFile>) -> Result<Vec<UploadedFile>> {
        let mut stored: Vec<UploadedFile> = Vec::with_capacity(files.len());

        for file in files {
            match self.write_one(&file).await {
                Ok(uploaded) => stored.push(uploaded),
                Err(e) => {
                    for written in &stored {
                        if let Err(remove_err) = tokio::fs::remove_file(&written.storage_path).await {
                            tracing::warn!(path = %written.storage_path.display(), error = %remove_err, "Failed to remove partial upload");
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    async fn write_one(&self, file: &StagedFile) -> Result<UploadedFile> {
        for _ in 0..NAME_ATTEMPTS {
            let name = generated_name(
                &file.field_name,
                &file.original_name,
                chrono::Utc::now().timestamp_millis(),
                rand::rng().random_range(0..1_000_000_000),
            );
            let path = self.dir.join(&name);

            let mut handle = match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(handle) => handle,
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(Error::Internal {
                        operation: format!("create upload {}: {e}", path.display()),
                    });
                }
            };

            let written = async {
                handle.write_all(&file.bytes).await?;
                handle.flush().await
            }
            .await;

            if let Err(e) = written {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial upload");
                }
                return Err(Error::Internal {
                    operation: format!("write upload {}: {e}", path.display()),
                });
            }

            tracing::info!(original_name = %file.original_name, stored_as = %name, "Stored upload");

            return Ok(UploadedFile {
                original_name: file.original_name.clone(),
                generated_name: name,
                size_bytes: file.bytes.len() as u64,
                mime_type: file.mime_type.clone(),
                storage_path: path,
            });
        }

        Err(Error::Internal {
            operation: format!("find a free upload name for {}", file.original_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(name: &str, bytes: &[u8]) -> StagedFile {
        StagedFile {
            field_name: MEDIA_FIELD.to_string(),
            original_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_media_types() {
        for ok in ["image/png", "image/jpeg", "video/mp4", "IMAGE/HEIC", "video/quicktime"] {
            assert!(is_media_type(ok), "{ok}");
        }
        for bad in ["application/pdf", "text/plain", "application/octet-stream", "imagepng", ""] {
            assert!(!is_media_type(bad), "{bad}");
        }
    }

    #[test]
    fn test_generated_name() {
        assert_eq!(
            generated_name("mediaFiles", "front view.JPG", 1_700_000_000_123, 987_654_321),
            "mediaFiles-1700000000123-987654321.JPG"
        );
        assert_eq!(
            generated_name("mediaFiles", "clip.final.mp4", 1, 2),
            "mediaFiles-1-2.mp4"
        );
        assert_eq!(generated_name("mediaFiles", "README", 1, 2), "mediaFiles-1-2");
        assert_eq!(generated_name("mediaFiles", ".hidden", 1, 2), "mediaFiles-1-2");
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path().join("nested").join("uploads"));

        store.ensure_dir().await.unwrap();
        assert!(store.dir().is_dir());

        // Idempotent
        store.ensure_dir().await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_writes_unique_files() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path());

        let uploaded = store
            .persist(vec![staged("front.jpg", b"front"), staged("front.jpg", b"front again")])
            .await
            .unwrap();

        assert_eq!(uploaded.len(), 2);
        assert_ne!(uploaded[0].generated_name, uploaded[1].generated_name);

        for (file, expected) in uploaded.iter().zip([&b"front"[..], &b"front again"[..]]) {
            assert!(file.generated_name.starts_with("mediaFiles-"));
            assert!(file.generated_name.ends_with(".jpg"));
            assert_eq!(file.original_name, "front.jpg");
            assert_eq!(file.size_bytes, expected.len() as u64);
            assert_eq!(std::fs::read(&file.storage_path).unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_persist_fails_when_directory_missing() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path().join("does-not-exist"));

        let result = store.persist(vec![staged("front.jpg", b"front")]).await;
        assert!(matches!(result, Err(Error::Internal { .. })));
    }
}

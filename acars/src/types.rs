//! Request-scoped submission types. Nothing here outlives a request.

use std::path::PathBuf;

/// A validated contact form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

/// A validated sell-car submission whose media has been written to the uploads directory.
#[derive(Debug, Clone)]
pub struct CarListingSubmission {
    pub car_name: String,
    pub car_model: String,
    pub description: String,
    pub word_count: usize,
    pub files: Vec<UploadedFile>,
}

/// A file part accepted from the multipart stream but not yet written to disk.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A file stored in the uploads directory. The process only keeps the path; the file itself
/// stays on disk after the request finishes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub generated_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub storage_path: PathBuf,
}

impl UploadedFile {
    /// Size in megabytes with two decimals, e.g. `"1.50 MB"`
    pub fn display_size(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_size() {
        let file = UploadedFile {
            original_name: "front.jpg".to_string(),
            generated_name: "mediaFiles-1700000000000-42.jpg".to_string(),
            size_bytes: 1024 * 1024 + 512 * 1024,
            mime_type: "image/jpeg".to_string(),
            storage_path: PathBuf::from("uploads/mediaFiles-1700000000000-42.jpg"),
        };
        assert_eq!(file.display_size(), "1.50 MB");

        let tiny = UploadedFile { size_bytes: 2048, ..file };
        assert_eq!(tiny.display_size(), "0.00 MB");
    }
}

//! Upload and note validation.
//!
//! Everything here is a pure function over declared metadata. The client runs
//! [`validate_file`] before opening a connection; the upload gateway runs it
//! again server-side because the client cannot be trusted.
//!
//! The declared MIME type is taken at face value. Content sniffing lives in
//! [`crate::file_safety`] and is opt-in.

use thiserror::Error;

use crate::defaults::MAX_FILE_SIZE;
use crate::models::FileType;

/// MIME types accepted for attachments (lower-case, no parameters).
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/json",
    "text/plain",
    "application/rtf",
    "text/rtf",
    "application/pdf",
    "audio/mp4",
    "audio/x-m4a",
    "audio/m4a",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "text/csv",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/png",
    "image/jpeg",
    "text/html",
];

/// File extensions offered by the client file picker.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    ".json", ".txt", ".rtf", ".pdf", ".m4a", ".docx", ".xls", ".csv", ".xlsx", ".png", ".jpg",
    ".jpeg", ".html",
];

/// Fallback declared type for unknown extensions. Never allow-listed.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A user-correctable rejection. Display strings are shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type: {declared}")]
    UnsupportedType { declared: String },

    #[error("File size must be less than {}MB", .max / (1024 * 1024))]
    TooLarge { size: u64, max: u64 },

    #[error("No file uploaded")]
    MissingFile,

    #[error("User ID is required")]
    MissingOwner,

    #[error("Please add a title")]
    EmptyTitle,

    #[error("Declared size {declared} does not match received size {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("File content ({detected}) does not match declared type {declared}")]
    ContentMismatch { declared: String, detected: String },

    #[error("Invalid file encoding: {0}")]
    InvalidEncoding(String),
}

impl ValidationError {
    /// True when the rejection is about the size ceiling.
    pub fn is_size_limit(&self) -> bool {
        matches!(self, ValidationError::TooLarge { .. })
    }
}

/// What the validator knows about a candidate file: name, declared type, length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub declared_type: String,
    pub size: u64,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            size,
        }
    }
}

/// Lower-case a MIME type and strip parameters (`text/plain; charset=utf-8`).
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a declared MIME type is on the allow-list.
pub fn is_allowed_mime(mime: &str) -> bool {
    let normalized = normalize_mime(mime);
    ALLOWED_MIME_TYPES.contains(&normalized.as_str())
}

/// Lower-cased extension after the last `.`, if any.
pub fn file_extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Whether the file picker would offer this name.
pub fn has_accepted_extension(name: &str) -> bool {
    file_extension(name)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&format!(".{}", ext).as_str()))
        .unwrap_or(false)
}

/// Declared MIME type for a file name, as a browser would report it.
///
/// Unknown extensions map to [`OCTET_STREAM`], which the allow-list rejects.
pub fn mime_for_extension(name: &str) -> &'static str {
    match file_extension(name).as_deref() {
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("rtf") => "application/rtf",
        Some("pdf") => "application/pdf",
        Some("m4a") => "audio/mp4",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("html") | Some("htm") => "text/html",
        _ => OCTET_STREAM,
    }
}

/// Check a size against a ceiling.
pub fn check_size(size: u64, max: u64) -> Result<(), ValidationError> {
    if size > max {
        return Err(ValidationError::TooLarge { size, max });
    }
    Ok(())
}

/// Validate a candidate file against the allow-list and the default ceiling.
///
/// Type is checked before size, so an oversized `.exe` reports the type.
pub fn validate_file(file: &FileDescriptor) -> Result<FileType, ValidationError> {
    validate_file_with_limit(file, MAX_FILE_SIZE)
}

/// [`validate_file`] with an explicit ceiling.
pub fn validate_file_with_limit(
    file: &FileDescriptor,
    max_size: u64,
) -> Result<FileType, ValidationError> {
    if !is_allowed_mime(&file.declared_type) {
        return Err(ValidationError::UnsupportedType {
            declared: file.declared_type.clone(),
        });
    }
    check_size(file.size, max_size)?;
    FileType::from_declared(&file.declared_type, &file.name).ok_or_else(|| {
        ValidationError::UnsupportedType {
            declared: file.declared_type.clone(),
        }
    })
}

/// A note title must contain something other than whitespace.
pub fn validate_note_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_pdf_is_accepted() {
        let file = FileDescriptor::new("report.pdf", "application/pdf", 2 * MIB);
        assert_eq!(validate_file(&file), Ok(FileType::Pdf));
    }

    #[test]
    fn test_every_accepted_extension_validates() {
        for ext in ACCEPTED_EXTENSIONS {
            let name = format!("file{}", ext);
            let file = FileDescriptor::new(&name, mime_for_extension(&name), 10);
            assert!(validate_file(&file).is_ok(), "{} should validate", name);
        }
    }

    #[test]
    fn test_exe_is_rejected_as_unsupported() {
        let name = "setup.exe";
        let file = FileDescriptor::new(name, mime_for_extension(name), 1024);
        let err = validate_file(&file).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedType {
                declared: "application/octet-stream".to_string()
            }
        );
        assert!(!err.is_size_limit());
    }

    #[test]
    fn test_oversized_file_is_rejected_with_size_message() {
        let file = FileDescriptor::new("big.pdf", "application/pdf", 60 * MIB);
        let err = validate_file(&file).unwrap_err();
        assert!(err.is_size_limit());
        assert_eq!(err.to_string(), "File size must be less than 50MB");
    }

    #[test]
    fn test_exactly_max_size_is_accepted() {
        let file = FileDescriptor::new("edge.txt", "text/plain", MAX_FILE_SIZE);
        assert!(validate_file(&file).is_ok());
        let file = FileDescriptor::new("edge.txt", "text/plain", MAX_FILE_SIZE + 1);
        assert!(validate_file(&file).is_err());
    }

    #[test]
    fn test_type_checked_before_size() {
        let file = FileDescriptor::new("huge.exe", "application/x-msdownload", 100 * MIB);
        assert!(matches!(
            validate_file(&file),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_mime_parameters_and_case_are_ignored() {
        assert!(is_allowed_mime("Text/Plain; charset=utf-8"));
        assert!(is_allowed_mime("IMAGE/PNG"));
        assert!(!is_allowed_mime("image/gif"));
        assert!(!is_allowed_mime(""));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a/b/Report.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_has_accepted_extension() {
        assert!(has_accepted_extension("photo.JPEG"));
        assert!(!has_accepted_extension("movie.mp4"));
        assert!(!has_accepted_extension("noext"));
    }

    #[test]
    fn test_note_title_validation() {
        assert!(validate_note_title("Ideas").is_ok());
        assert_eq!(validate_note_title(""), Err(ValidationError::EmptyTitle));
        assert_eq!(validate_note_title("   \t"), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn test_custom_limit() {
        let file = FileDescriptor::new("a.csv", "text/csv", 11);
        assert!(validate_file_with_limit(&file, 10).unwrap_err().is_size_limit());
    }
}

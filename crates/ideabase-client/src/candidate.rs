//! Files picked for upload.

use std::path::{Path, PathBuf};

use ideabase_core::{
    mime_for_extension, validate_file_with_limit, FileDescriptor, FileType, ValidationError,
};

use crate::ClientError;

/// A local file the user wants to attach.
///
/// Size comes from filesystem metadata and the declared type from the
/// extension, the way a browser file picker reports them; the bytes are
/// only read once validation has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub name: String,
    pub declared_type: String,
    pub size: u64,
}

impl FileCandidate {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(ValidationError::MissingFile.into());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(ValidationError::MissingFile)?;

        Ok(Self {
            declared_type: mime_for_extension(&name).to_string(),
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    /// Override the declared type, as a browser may report something other
    /// than the extension suggests.
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = declared_type.into();
        self
    }

    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor::new(self.name.clone(), self.declared_type.clone(), self.size)
    }

    pub fn validate(&self, max_size: u64) -> Result<FileType, ValidationError> {
        validate_file_with_limit(&self.descriptor(), max_size)
    }

    pub async fn read(&self) -> Result<Vec<u8>, ClientError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideabase_core::defaults::MAX_FILE_SIZE;
    use std::io::Write;

    #[test]
    fn test_from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report.PDF");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7 tiny")
            .unwrap();

        let candidate = FileCandidate::from_path(&path).unwrap();
        assert_eq!(candidate.name, "Report.PDF");
        assert_eq!(candidate.declared_type, "application/pdf");
        assert_eq!(candidate.size, 13);
        assert_eq!(candidate.validate(MAX_FILE_SIZE).unwrap(), FileType::Pdf);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        std::fs::write(&path, b"MZ").unwrap();

        let candidate = FileCandidate::from_path(&path).unwrap();
        assert_eq!(candidate.declared_type, "application/octet-stream");
        assert!(matches!(
            candidate.validate(MAX_FILE_SIZE),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_size_checked_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.csv");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_FILE_SIZE + 1).unwrap();

        let candidate = FileCandidate::from_path(&path).unwrap();
        let err = candidate.validate(MAX_FILE_SIZE).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 50MB");
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileCandidate::from_path(dir.path()),
            Err(ClientError::Validation(ValidationError::MissingFile))
        ));
    }
}

//! Content checks on uploaded bytes.
//!
//! The allow-list in [`crate::validation`] trusts the client's declared type.
//! When the gateway runs in strict mode it also sniffs magic bytes here:
//! 1. Executables are rejected whatever they claim to be.
//! 2. Binary formats must be recognised as the declared kind.
//! 3. Text formats (no magic bytes) pass unless they sniff as binary.

use crate::models::FileType;
use crate::validation::ValidationError;

/// Magic byte signatures for executable files
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),           // MZ header
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),         // Linux ELF
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),   // macOS 32-bit
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),   // macOS 64-bit
    ("Java/Mach-O Fat", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]), // WASM
];

/// Name of the executable signature at the start of `data`, if any.
pub fn detect_executable(data: &[u8]) -> Option<&'static str> {
    MAGIC_SIGNATURES
        .iter()
        .find(|(_, magic)| data.starts_with(magic))
        .map(|(name, _)| *name)
}

/// MIME type detected from magic bytes.
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// Whether a detected MIME type is an acceptable body for a declared kind.
fn detected_matches(kind: FileType, detected: &str) -> bool {
    match kind {
        FileType::Pdf => detected == "application/pdf",
        FileType::Png => detected == "image/png",
        FileType::Jpg | FileType::Jpeg => detected == "image/jpeg",
        FileType::M4a => detected.starts_with("audio/") || detected == "video/mp4",
        // OOXML files are zip containers; infer may stop at the container.
        FileType::Docx | FileType::Xlsx => {
            detected == kind.mime_type() || detected == "application/zip"
        }
        // Legacy Office files share the OLE compound format.
        FileType::Xls => {
            detected.starts_with("application/vnd.ms-")
                || detected == "application/msword"
                || detected == "application/x-ole-storage"
        }
        FileType::Json | FileType::Txt | FileType::Rtf | FileType::Csv | FileType::Html => {
            detected.starts_with("text/")
                || detected == "application/rtf"
                || detected == "application/json"
        }
    }
}

/// Verify that uploaded bytes plausibly are what the client declared.
pub fn sniff_content(kind: FileType, declared: &str, data: &[u8]) -> Result<(), ValidationError> {
    if let Some(name) = detect_executable(data) {
        return Err(ValidationError::ContentMismatch {
            declared: declared.to_string(),
            detected: format!("executable:{}", name.to_lowercase().replace(' ', "_")),
        });
    }

    match detect_mime(data) {
        Some(detected) if detected_matches(kind, detected) => Ok(()),
        Some(detected) => Err(ValidationError::ContentMismatch {
            declared: declared.to_string(),
            detected: detected.to_string(),
        }),
        None if kind.is_text_like() => Ok(()),
        None => Err(ValidationError::ContentMismatch {
            declared: declared.to_string(),
            detected: "unknown".to_string(),
        }),
    }
}

/// Sanitize filename for safe storage in metadata.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    // Keep the extension when truncating
    let max = 255;
    if sanitized.chars().count() > max {
        let ext: String = match sanitized.rfind('.') {
            Some(dot) if sanitized.len() - dot <= 16 => sanitized[dot..].to_string(),
            _ => String::new(),
        };
        let stem: String = sanitized
            .chars()
            .take(max - ext.chars().count())
            .collect();
        return format!("{}{}", stem, ext);
    }

    sanitized.to_string()
}

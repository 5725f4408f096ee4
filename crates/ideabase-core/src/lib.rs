//! # ideabase-core
//!
//! Core types, traits, and validation for IdeaBase.
//!
//! This crate holds everything the server and the client share: domain
//! models, the upload allow-list and size ceiling, transport encoding,
//! storage key layout, and the repository traits. It performs no I/O.

pub mod defaults;
pub mod encoding;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod storage_key;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use encoding::{decode_payload, encode_data_url, encoded_len, Transport};
pub use error::{Error, Result};
pub use file_safety::{detect_executable, detect_mime, sanitize_filename, sniff_content};
pub use models::*;
pub use storage_key::{key_owner, storage_key, storage_key_with_id, stored_file_name};
pub use traits::*;
pub use validation::{
    is_allowed_mime, mime_for_extension, validate_file, validate_file_with_limit,
    validate_note_title, FileDescriptor, ValidationError, ACCEPTED_EXTENSIONS,
    ALLOWED_MIME_TYPES,
};

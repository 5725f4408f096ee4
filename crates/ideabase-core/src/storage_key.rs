//! Storage key layout: `{ownerId}/{uuid}.{ext}`.
//!
//! The owner prefix namespaces objects per user; the random v4 UUID makes
//! collisions between two uploads negligible.

use uuid::Uuid;

use crate::validation::file_extension;

/// Derive a fresh storage key for an upload.
pub fn storage_key(owner_id: Uuid, original_name: &str) -> String {
    storage_key_with_id(owner_id, Uuid::new_v4(), original_name)
}

/// Deterministic variant of [`storage_key`].
pub fn storage_key_with_id(owner_id: Uuid, object_id: Uuid, original_name: &str) -> String {
    match file_extension(original_name) {
        Some(ext) => format!("{}/{}.{}", owner_id, object_id, ext),
        None => format!("{}/{}", owner_id, object_id),
    }
}

/// The stored file name: last segment of the key.
pub fn stored_file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Owner prefix of a key, if it parses.
pub fn key_owner(key: &str) -> Option<Uuid> {
    key.split_once('/')
        .and_then(|(owner, _)| Uuid::parse_str(owner).ok())
}

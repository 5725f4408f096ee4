//! Centralized default constants for IdeaBase.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Environment overrides are parsed in the API server's config module.

// =============================================================================
// UPLOADS
// =============================================================================

/// Upload size ceiling (50 MiB), enforced by both client and gateway.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Object storage bucket for attachments.
pub const STORAGE_BUCKET: &str = "attachments";

/// Age after which a pending (two-phase) attachment is considered abandoned.
pub const PENDING_RECONCILE_AFTER_MINUTES: i64 = 60;

/// Success message returned by the upload gateway.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

// =============================================================================
// SESSIONS
// =============================================================================

/// Session lifetime in hours (7 days).
pub const SESSION_TTL_HOURS: i64 = 168;

/// Length of generated session tokens (alphanumeric characters).
pub const SESSION_TOKEN_LENGTH: usize = 48;

/// Prefix of session tokens, to make them recognisable in logs and configs.
pub const SESSION_TOKEN_PREFIX: &str = "ib_st_";

/// Minimum password length at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints (notes, attachments, tags).
pub const PAGE_LIMIT: i64 = 50;

/// Hard upper bound for a requested page size.
pub const PAGE_LIMIT_MAX: i64 = 500;

// =============================================================================
// TAGS
// =============================================================================

/// Maximum tag name length in characters.
pub const TAG_NAME_MAX_LEN: usize = 64;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Request body ceiling for every route except uploads (1 MiB).
pub const API_BODY_LIMIT: usize = 1024 * 1024;


/// Headers accepted on CORS preflight.
pub const CORS_ALLOWED_HEADERS: &[&str] =
    &["authorization", "x-client-info", "apikey", "content-type"];

// =============================================================================
// CLIENT
// =============================================================================

/// Default client API base URL.
pub const API_URL: &str = "http://localhost:3000";

/// Environment variable overriding the client API base URL.
pub const ENV_API_URL: &str = "IDEABASE_API_URL";

/// Environment variable overriding where the CLI keeps its session.
pub const ENV_SESSION_FILE: &str = "IDEABASE_SESSION_FILE";

/// Session file name under the user's config directory.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Per-request timeout for the HTTP client. Large uploads need headroom.
pub const CLIENT_TIMEOUT_SECS: u64 = 300;

//! Structured logging field names for IdeaBase.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Inconsistency or degraded service (e.g. orphaned storage object) |
//! | WARN  | Rejected request, recoverable failure |
//! | INFO  | Lifecycle events, completed uploads and saves |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-chunk / per-row detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the `x-request-id` header.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "storage", "client"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "upload_gateway", "session_guard", "pool", "filesystem"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "upload", "put_object", "insert_note", "sign_in"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Owning user of the note/attachment being operated on.
pub const OWNER_ID: &str = "owner_id";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Attachment UUID being operated on.
pub const ATTACHMENT_ID: &str = "attachment_id";

/// Storage key of an object.
pub const FILE_PATH: &str = "file_path";

/// Declared MIME type of an upload.
pub const FILE_TYPE: &str = "file_type";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Payload size in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

/// Number of rows returned or affected.
pub const RESULT_COUNT: &str = "result_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Marks a storage object with no committed metadata row.
pub const ORPHANED: &str = "orphaned";

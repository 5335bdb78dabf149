//! Shared constants.

use uuid::Uuid;

/// Owner id used when a deployment runs without per-user scoping.
pub const DEFAULT_OWNER_ID: Uuid = Uuid::nil();

/// Content type of the rendered summary document.
pub const SUMMARY_CONTENT_TYPE: &str = "text/markdown";

/// MIME type assigned when the submitter declared nothing usable.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

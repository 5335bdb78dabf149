//! Shared key generation for storage backends.
//!
//! Keys are deterministic functions of (owner, file id, artifact) so a
//! re-run stage overwrites its previous output instead of orphaning it.

use filecask_core::models::DerivativeKind;
use uuid::Uuid;

/// Key of the untouched original upload.
pub fn original_key(owner_id: Uuid, file_id: Uuid) -> String {
    format!("{}/files/{}/original", owner_id, file_id)
}

/// Key of one derivative artifact.
pub fn derivative_key(owner_id: Uuid, file_id: Uuid, kind: DerivativeKind) -> String {
    format!("{}/files/{}/derivatives/{}", owner_id, file_id, kind)
}

/// Fixed key of the machine-readable summary document.
pub fn summary_key(owner_id: Uuid, file_id: Uuid) -> String {
    format!("{}/files/{}/ai/summary.md", owner_id, file_id)
}

/// Prefix under which every artifact of a file lives.
pub fn file_prefix(owner_id: Uuid, file_id: Uuid) -> String {
    format!("{}/files/{}/", owner_id, file_id)
}

//! Content hashing for ingested bytes.

use sha2::{Digest, Sha256};

/// Compute the canonical content hash recorded on an `IngestedFile`.
///
/// Format is `sha256:<hex>` so the algorithm can change later without
/// ambiguity in stored rows or summary frontmatter.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("sha256:{}", hex::encode(digest))
}

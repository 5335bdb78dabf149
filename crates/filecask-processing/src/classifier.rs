//! Classification: MIME type + extension + size to a processing plan.
//!
//! Text content needs no binary decoding, thumbnailing, or heavy
//! extraction, so a fixed allow-list of text-like types takes the
//! abbreviated fast-track plan (direct summarize). Everything else runs
//! the full pipeline; unknown types still classify (the no-op extractor
//! fallback yields a metadata-only summary rather than a failure).

use filecask_core::models::ProcessingPlan;

/// MIME types that fast-track: decode as UTF-8 best-effort and summarize
/// directly, skipping the extract/derive stages.
const FAST_TRACK_MIME_TYPES: &[&str] = &[
    "text/plain",
    "text/markdown",
    "text/csv",
    "text/html",
    "text/css",
    "text/xml",
    "text/javascript",
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-sh",
    "application/x-python",
    "application/toml",
    "application/yaml",
];

/// Extensions that fast-track when the declared MIME type is generic or
/// missing (browsers and scripts frequently send octet-stream for these).
const FAST_TRACK_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "json", "csv", "html", "htm", "css", "js", "ts", "py", "sh", "xml",
    "toml", "yaml", "yml",
];

/// Declared types that say nothing about content.
const GENERIC_MIME_TYPES: &[&str] = &["", "application/octet-stream", "binary/octet-stream"];

/// Fast-track applies to files small enough to inline into the summary
/// body; larger text files take the full pipeline and get an
/// extracted-text derivative instead.
const MAX_FAST_TRACK_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Pure classification function. Never fails: unsupported input routes to
/// the full pipeline, where the extractor fallback degrades gracefully.
pub fn classify(mime_type: &str, extension: &str, size_bytes: u64) -> ProcessingPlan {
    let mime = normalize_mime(mime_type);
    let extension = extension.to_ascii_lowercase();

    if size_bytes > MAX_FAST_TRACK_SIZE_BYTES {
        return ProcessingPlan::full();
    }

    let text_like_mime = FAST_TRACK_MIME_TYPES.contains(&mime.as_str());
    let generic_with_text_extension = GENERIC_MIME_TYPES.contains(&mime.as_str())
        && FAST_TRACK_EXTENSIONS.contains(&extension.as_str());

    if text_like_mime || generic_with_text_extension {
        ProcessingPlan::fast_track()
    } else {
        ProcessingPlan::full()
    }
}

/// Lowercase and strip parameters (`text/plain; charset=utf-8`).
fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filecask_core::models::Stage;

    #[test]
    fn test_plain_text_fast_tracks() {
        let plan = classify("text/plain", "txt", 10);
        assert!(plan.fast_track);
        assert_eq!(plan.stages, vec![Stage::Summarize, Stage::Finalize]);
    }

    #[test]
    fn test_allow_listed_types_fast_track() {
        for mime in ["text/markdown", "application/json", "text/csv", "text/html"] {
            assert!(classify(mime, "", 128).fast_track, "{} should fast-track", mime);
        }
    }

    #[test]
    fn test_mime_parameters_are_stripped() {
        assert!(classify("text/plain; charset=utf-8", "txt", 10).fast_track);
        assert!(classify("Text/Plain", "txt", 10).fast_track);
    }

    #[test]
    fn test_generic_mime_with_text_extension_fast_tracks() {
        assert!(classify("application/octet-stream", "md", 10).fast_track);
        assert!(classify("", "json", 10).fast_track);
    }

    #[test]
    fn test_binary_types_take_full_pipeline() {
        for mime in ["application/pdf", "image/png", "video/mp4", "audio/mpeg"] {
            let plan = classify(mime, "", 1024);
            assert!(!plan.fast_track, "{} should not fast-track", mime);
            assert_eq!(
                plan.stages,
                vec![Stage::Extract, Stage::Derive, Stage::Summarize, Stage::Finalize]
            );
        }
    }

    #[test]
    fn test_unknown_type_still_classifies() {
        let plan = classify("application/x-unheard-of", "xyz", 1024);
        assert!(!plan.fast_track);
        assert!(plan.runs(Stage::Extract));
    }

    #[test]
    fn test_oversized_text_takes_full_pipeline() {
        let plan = classify("text/plain", "txt", MAX_FAST_TRACK_SIZE_BYTES + 1);
        assert!(!plan.fast_track);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let a = classify("text/plain", "txt", 10);
        let b = classify("text/plain", "txt", 10);
        assert_eq!(a, b);
    }
}

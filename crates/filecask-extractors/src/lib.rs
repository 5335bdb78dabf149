//! Extractor plugin infrastructure.
//!
//! Format-specific extraction logic lives behind the [`Extractor`] trait:
//! a named, pure function from (original bytes, declared MIME) to an
//! [`Extraction`]. Extractors never touch storage or the metadata store;
//! the pipeline performs all writes. The [`ExtractorRegistry`] maps
//! MIME/extension patterns to implementations with a no-op fallback, so
//! unsupported types degrade to a metadata-only summary instead of failing.

pub mod extractor;
pub mod noop;
pub mod registry;
pub mod text;

pub use extractor::{ExtractedArtifact, Extraction, Extractor};
pub use noop::NoopExtractor;
pub use registry::ExtractorRegistry;
pub use text::PlainTextExtractor;

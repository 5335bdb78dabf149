//! Extractor registry.
//!
//! Maps MIME/extension patterns to extractor implementations, checked in
//! registration order, with the no-op extractor as the default fallback.
//! Keeping the mapping explicit here (instead of runtime type inspection
//! scattered through the pipeline) makes the supported set testable.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::extractor::Extractor;
use crate::noop::NoopExtractor;

/// Registry for managing and resolving extractors.
///
/// Thread-safe and async-compatible using tokio's RwLock. Registration
/// typically happens once at process start; resolution happens per job.
#[derive(Clone)]
pub struct ExtractorRegistry {
    // Registration order matters for resolution, so keep an ordered list
    // alongside the by-name map.
    ordered: Arc<RwLock<Vec<Arc<dyn Extractor>>>>,
    by_name: Arc<RwLock<HashMap<String, Arc<dyn Extractor>>>>,
    fallback: Arc<dyn Extractor>,
}

impl ExtractorRegistry {
    /// Create a new registry with the no-op fallback.
    pub fn new() -> Self {
        Self {
            ordered: Arc::new(RwLock::new(Vec::new())),
            by_name: Arc::new(RwLock::new(HashMap::new())),
            fallback: Arc::new(NoopExtractor::new()),
        }
    }

    /// Registry preloaded with the in-tree baseline extractors.
    pub fn with_defaults() -> Self {
        let text: Arc<dyn Extractor> = Arc::new(crate::text::PlainTextExtractor::new());
        let mut by_name = HashMap::new();
        by_name.insert(text.name().to_string(), text.clone());

        Self {
            ordered: Arc::new(RwLock::new(vec![text])),
            by_name: Arc::new(RwLock::new(by_name)),
            fallback: Arc::new(NoopExtractor::new()),
        }
    }

    /// Register an extractor. Later registrations with the same name
    /// replace the earlier one; resolution order follows first
    /// registration.
    pub async fn register(&self, extractor: Arc<dyn Extractor>) {
        let name = extractor.name().to_string();

        let mut ordered = self.ordered.write().await;
        let mut by_name = self.by_name.write().await;

        if let Some(existing) = ordered.iter_mut().find(|e| e.name() == name) {
            *existing = extractor.clone();
        } else {
            ordered.push(extractor.clone());
        }
        by_name.insert(name, extractor);
    }

    /// Resolve the extractor for a MIME type / extension pair. Falls back
    /// to the no-op extractor so resolution never fails.
    pub async fn resolve(&self, mime_type: &str, extension: &str) -> Arc<dyn Extractor> {
        let ordered = self.ordered.read().await;

        for extractor in ordered.iter() {
            if extractor.matches(mime_type, extension) {
                return extractor.clone();
            }
        }

        tracing::debug!(
            mime_type = %mime_type,
            extension = %extension,
            "No extractor registered, falling back to noop"
        );
        self.fallback.clone()
    }

    /// Get an extractor by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Extractor>> {
        let by_name = self.by_name.read().await;
        by_name.get(name).cloned()
    }

    /// Names of all registered extractors, in resolution order.
    pub async fn list(&self) -> Vec<String> {
        let ordered = self.ordered.read().await;
        ordered.iter().map(|e| e.name().to_string()).collect()
    }

    /// Check if an extractor is registered.
    pub async fn contains(&self, name: &str) -> bool {
        let by_name = self.by_name.read().await;
        by_name.contains_key(name)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

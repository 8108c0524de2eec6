//! Per-context cache of received target data
//!
//! One drop exposes many flavors and the application may ask for the same
//! flavor once per item. Some backends can only deliver a flavor once per
//! context, so every payload is kept until the context changes.

use std::collections::HashMap;

use crate::types::ContextId;

#[derive(Debug, Default)]
pub struct TargetDataCache {
    context: Option<ContextId>,
    entries: HashMap<String, Vec<u8>>,
}

impl TargetDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry when `context` is not the context the entries belong to
    pub fn invalidate_if_context_changed(&mut self, context: ContextId) {
        if self.context != Some(context) {
            if !self.entries.is_empty() {
                tracing::debug!("drag data cache invalidated, {:?} -> {}", self.context, context);
            }
            self.entries.clear();
            self.context = Some(context);
        }
    }

    pub fn lookup(&mut self, context: ContextId, format: &str) -> Option<&[u8]> {
        self.invalidate_if_context_changed(context);
        self.entries.get(format).map(Vec::as_slice)
    }

    /// An empty payload is cached too, so a failed fetch is not repeated
    pub fn store(&mut self, context: ContextId, format: &str, bytes: Vec<u8>) {
        self.invalidate_if_context_changed(context);
        self.entries.insert(format.to_string(), bytes);
    }

    /// Forget the context; the next lookup starts from an empty cache
    pub fn reset(&mut self) {
        self.context = None;
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_hits_same_context() {
        let mut cache = TargetDataCache::new();
        cache.store(ContextId(1), "text/plain", b"hello".to_vec());
        assert_eq!(cache.lookup(ContextId(1), "text/plain"), Some(&b"hello"[..]));
        assert_eq!(cache.lookup(ContextId(1), "text/html"), None);
    }

    #[test]
    fn test_entries_never_leak_across_contexts() {
        let mut cache = TargetDataCache::new();
        cache.store(ContextId(1), "text/plain", b"hello".to_vec());
        assert_eq!(cache.lookup(ContextId(2), "text/plain"), None);
        // Switching back does not resurrect the old entries
        assert_eq!(cache.lookup(ContextId(1), "text/plain"), None);
    }

    #[test]
    fn test_empty_payload_is_cached() {
        let mut cache = TargetDataCache::new();
        cache.store(ContextId(7), "text/uri-list", Vec::new());
        assert_eq!(cache.lookup(ContextId(7), "text/uri-list"), Some(&[][..]));
    }

    #[test]
    fn test_reset() {
        let mut cache = TargetDataCache::new();
        cache.store(ContextId(3), "a", vec![1]);
        cache.reset();
        assert_eq!(cache.lookup(ContextId(3), "a"), None);
    }
}

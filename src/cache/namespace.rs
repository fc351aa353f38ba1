//! Shared storage for the in-process backend.
//!
//! Every `locmem` backend connecting with the same namespace identifier works
//! on the same map, the way several clients of one external store would. The
//! registry counts connected backends per identifier: the map is created by
//! the first `acquire` and dropped by the last `release`, so reconnecting
//! afterwards starts from an empty namespace.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

/// A stored value with its absolute expiry.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) encoded: String,
    pub(crate) expires_at: Option<Instant>,
}

impl CacheEntry {
    pub(crate) fn new(encoded: String, ttl: Option<u64>, now: Instant) -> Self {
        Self {
            encoded,
            expires_at: expiry(ttl, now),
        }
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Absolute expiry for a TTL, computed once at write time.
///
/// A TTL too large to represent as an instant never expires.
pub(crate) fn expiry(ttl: Option<u64>, now: Instant) -> Option<Instant> {
    ttl.and_then(|seconds| now.checked_add(Duration::from_secs(seconds)))
}

/// Entries of one namespace, keyed by effective key.
pub(crate) type Namespace = DashMap<String, CacheEntry>;

struct Slot {
    namespace: Arc<Namespace>,
    connections: usize,
}

/// Process-wide namespaces keyed by identifier.
///
/// Cloning is cheap and clones share the same namespaces. Use
/// [`NamespaceRegistry::new`] for an isolated set (tests), or
/// [`NamespaceRegistry::global`] for the one shared by default.
#[derive(Clone, Default)]
pub struct NamespaceRegistry {
    slots: Arc<DashMap<String, Slot>>,
}

static GLOBAL: OnceLock<NamespaceRegistry> = OnceLock::new();

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by caches built without an explicit one.
    pub fn global() -> Self {
        GLOBAL.get_or_init(NamespaceRegistry::new).clone()
    }

    /// Join a namespace, creating it if nobody is connected to it.
    pub(crate) fn acquire(&self, id: &str) -> Arc<Namespace> {
        let mut slot = self.slots.entry(id.to_string()).or_insert_with(|| {
            debug!(namespace = id, "creating locmem namespace");
            Slot {
                namespace: Arc::new(Namespace::new()),
                connections: 0,
            }
        });
        slot.connections += 1;
        Arc::clone(&slot.namespace)
    }

    /// Leave a namespace, tearing it down when the last backend leaves.
    pub(crate) fn release(&self, id: &str) {
        let removed = self.slots.remove_if_mut(id, |_, slot| {
            slot.connections = slot.connections.saturating_sub(1);
            slot.connections == 0
        });
        if removed.is_some() {
            debug!(namespace = id, "dropping locmem namespace");
        }
    }

    /// Whether a namespace currently exists.
    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of live namespaces.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_identifier_shares_namespace() {
        let registry = NamespaceRegistry::new();
        let first = registry.acquire("primary");
        let second = registry.acquire("primary");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_different_identifiers_are_isolated() {
        let registry = NamespaceRegistry::new();
        let first = registry.acquire("");
        let second = registry.acquire("other");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_namespace_lives_until_last_release() {
        let registry = NamespaceRegistry::new();
        let namespace = registry.acquire("primary");
        registry.acquire("primary");
        namespace.insert("k".to_string(), CacheEntry::new("1".to_string(), None, Instant::now()));

        registry.release("primary");
        assert!(registry.contains("primary"));
        registry.release("primary");
        assert!(!registry.contains("primary"));

        let fresh = registry.acquire("primary");
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_release_of_unknown_namespace_is_ignored() {
        let registry = NamespaceRegistry::new();
        registry.release("missing");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_ttl_entry_is_expired_immediately() {
        let now = Instant::now();
        assert!(CacheEntry::new("1".to_string(), Some(0), now).is_expired(now));
        assert!(!CacheEntry::new("1".to_string(), Some(1), now).is_expired(now));
        assert!(!CacheEntry::new("1".to_string(), None, now).is_expired(now));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let now = Instant::now();
        assert_eq!(expiry(Some(u64::MAX), now), None);
        assert!(!CacheEntry::new("1".to_string(), Some(u64::MAX), now).is_expired(now));
    }
}

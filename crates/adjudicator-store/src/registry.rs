//! Keyed store of per-document vector indexes
//!
//! Each uploaded document gets its own [`VectorIndex`], built outside the
//! registry and inserted whole. Readers receive an `Arc` and search without
//! holding the registry lock, so a concurrent insert never exposes a half
//! built index.
//!
//! Entries leave the registry in three ways: explicit removal, LRU eviction
//! when the registry is at capacity, and expiry after a period without
//! access. Expired entries are dropped lazily on every access and in bulk
//! by [`IndexRegistry::sweep_expired`].

use crate::vector_index::VectorIndex;
use adjudicator_domain::DocumentId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default maximum number of indexed documents
pub const DEFAULT_CAPACITY: usize = 32;

/// Default idle time after which an index expires (1 hour)
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// A document's index together with its metadata
#[derive(Debug)]
pub struct IndexedDocument {
    /// Document identifier
    pub id: DocumentId,
    /// Original filename
    pub filename: String,
    /// Upload time (Unix seconds)
    pub created_at: u64,
    /// Index over the document's chunks
    pub index: VectorIndex,
}

impl IndexedDocument {
    /// Number of chunks in the index
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Documents inserted
    pub inserted: u64,
    /// Documents evicted to stay within capacity
    pub evicted: u64,
    /// Documents dropped after the idle timeout
    pub expired: u64,
}

#[derive(Debug)]
struct Slot {
    document: Arc<IndexedDocument>,
    last_access: Instant,
    sequence: u64,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<DocumentId, Slot>,
    next_sequence: u64,
    stats: RegistryStats,
}

impl RegistryInner {
    fn purge_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, slot| now.saturating_duration_since(slot.last_access) < ttl);
        let removed = before - self.entries.len();
        self.stats.expired += removed as u64;
        removed
    }

    fn least_recently_used(&self) -> Option<DocumentId> {
        self.entries
            .iter()
            .min_by_key(|(_, slot)| (slot.last_access, slot.sequence))
            .map(|(id, _)| *id)
    }
}

/// Thread-safe map from document id to its index
///
/// # Examples
///
/// ```
/// use adjudicator_domain::{DocumentId, TextChunk};
/// use adjudicator_store::embedding::HashEmbeddingModel;
/// use adjudicator_store::registry::{IndexRegistry, IndexedDocument};
/// use adjudicator_store::vector_index::VectorIndex;
/// use std::time::Duration;
///
/// let registry = IndexRegistry::new(8, Duration::from_secs(3600));
/// let model = HashEmbeddingModel::new(32);
/// let index = VectorIndex::build(&model, vec![TextChunk::new(0, "clause")]).unwrap();
///
/// let id = DocumentId::new();
/// registry.insert(IndexedDocument { id, filename: "policy.pdf".into(), created_at: 0, index });
/// assert_eq!(registry.get(id).unwrap().chunk_count(), 1);
/// assert_eq!(registry.latest().unwrap().id, id);
/// ```
#[derive(Debug)]
pub struct IndexRegistry {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<RegistryInner>,
}

impl IndexRegistry {
    /// Create a registry holding at most `capacity` documents (at least one),
    /// each expiring after `ttl` without access
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum number of documents held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Idle time after which a document expires
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert a built index, evicting the least recently used documents if
    /// the registry is full
    ///
    /// Returns the ids of evicted documents. Inserting an id that is already
    /// present replaces its index.
    pub fn insert(&self, document: IndexedDocument) -> Vec<DocumentId> {
        self.insert_at(document, Instant::now())
    }

    /// [`insert`](Self::insert) with an explicit clock reading
    pub fn insert_at(&self, document: IndexedDocument, now: Instant) -> Vec<DocumentId> {
        let mut inner = self.lock();
        inner.purge_expired(now, self.ttl);

        let id = document.id;
        let mut evicted = Vec::new();
        if !inner.entries.contains_key(&id) {
            while inner.entries.len() >= self.capacity {
                match inner.least_recently_used() {
                    Some(victim) => {
                        inner.entries.remove(&victim);
                        inner.stats.evicted += 1;
                        evicted.push(victim);
                    }
                    None => break,
                }
            }
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.stats.inserted += 1;
        let chunks = document.chunk_count();
        inner.entries.insert(
            id,
            Slot {
                document: Arc::new(document),
                last_access: now,
                sequence,
            },
        );

        info!(document_id = %id, chunks, evicted = evicted.len(), "Indexed document");
        for victim in &evicted {
            debug!(document_id = %victim, "Evicted least recently used index");
        }
        evicted
    }

    /// Look up a document's index, refreshing its last access time
    pub fn get(&self, id: DocumentId) -> Option<Arc<IndexedDocument>> {
        self.get_at(id, Instant::now())
    }

    /// [`get`](Self::get) with an explicit clock reading
    pub fn get_at(&self, id: DocumentId, now: Instant) -> Option<Arc<IndexedDocument>> {
        let mut inner = self.lock();
        inner.purge_expired(now, self.ttl);
        inner.entries.get_mut(&id).map(|slot| {
            slot.last_access = now;
            Arc::clone(&slot.document)
        })
    }

    /// The most recently inserted document still held, refreshing its last
    /// access time
    pub fn latest(&self) -> Option<Arc<IndexedDocument>> {
        self.latest_at(Instant::now())
    }

    /// [`latest`](Self::latest) with an explicit clock reading
    pub fn latest_at(&self, now: Instant) -> Option<Arc<IndexedDocument>> {
        let mut inner = self.lock();
        inner.purge_expired(now, self.ttl);
        inner
            .entries
            .values_mut()
            .max_by_key(|slot| slot.sequence)
            .map(|slot| {
                slot.last_access = now;
                Arc::clone(&slot.document)
            })
    }

    /// Remove a document, returning its index if it was present
    pub fn remove(&self, id: DocumentId) -> Option<Arc<IndexedDocument>> {
        let removed = self.lock().entries.remove(&id).map(|slot| slot.document);
        if removed.is_some() {
            info!(document_id = %id, "Removed document index");
        }
        removed
    }

    /// All held documents in insertion order
    ///
    /// Listing does not count as access.
    pub fn list(&self) -> Vec<Arc<IndexedDocument>> {
        let mut inner = self.lock();
        inner.purge_expired(Instant::now(), self.ttl);

        let mut slots: Vec<&Slot> = inner.entries.values().collect();
        slots.sort_by_key(|slot| slot.sequence);
        slots.iter().map(|slot| Arc::clone(&slot.document)).collect()
    }

    /// Number of documents held, including any not yet swept
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the registry holds no documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every document idle for longer than the TTL
    ///
    /// Returns the number of documents dropped.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// [`sweep_expired`](Self::sweep_expired) with an explicit clock reading
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let removed = self.lock().purge_expired(now, self.ttl);
        if removed > 0 {
            info!(removed, "Expired idle document indexes");
        }
        removed
    }

    /// Lifetime counters
    pub fn stats(&self) -> RegistryStats {
        self.lock().stats
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjudicator_domain::TextChunk;

    fn document(name: &str) -> IndexedDocument {
        let index = VectorIndex::from_vectors(
            2,
            vec![(TextChunk::new(0, format!("{} clause", name)), vec![1.0, 0.0])],
        )
        .unwrap();
        IndexedDocument {
            id: DocumentId::new(),
            filename: name.to_string(),
            created_at: 0,
            index,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let registry = IndexRegistry::default();
        let doc = document("a.pdf");
        let id = doc.id;

        assert!(registry.insert(doc).is_empty());
        let found = registry.get(id).unwrap();
        assert_eq!(found.filename, "a.pdf");
        assert_eq!(registry.len(), 1);
        assert!(registry.get(DocumentId::new()).is_none());
    }

    #[test]
    fn test_latest_tracks_most_recent_insert() {
        let registry = IndexRegistry::default();
        assert!(registry.latest().is_none());

        let first = document("first.pdf");
        let second = document("second.pdf");
        let (first_id, second_id) = (first.id, second.id);
        registry.insert(first);
        registry.insert(second);

        assert_eq!(registry.latest().unwrap().id, second_id);

        registry.remove(second_id);
        assert_eq!(registry.latest().unwrap().id, first_id);
    }

    #[test]
    fn test_lru_eviction() {
        let registry = IndexRegistry::new(2, Duration::from_secs(3600));
        let start = Instant::now();

        let a = document("a");
        let b = document("b");
        let c = document("c");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);

        registry.insert_at(a, start);
        registry.insert_at(b, start + Duration::from_secs(1));
        // Touch a so b becomes least recently used
        registry.get_at(a_id, start + Duration::from_secs(2));

        let evicted = registry.insert_at(c, start + Duration::from_secs(3));
        assert_eq!(evicted, vec![b_id]);
        assert!(registry.get_at(a_id, start + Duration::from_secs(4)).is_some());
        assert!(registry.get_at(c_id, start + Duration::from_secs(4)).is_some());
        assert_eq!(registry.stats().evicted, 1);
    }

    #[test]
    fn test_reinsert_same_id_does_not_evict() {
        let registry = IndexRegistry::new(1, Duration::from_secs(3600));
        let doc = document("a");
        let id = doc.id;
        registry.insert(doc);

        let mut replacement = document("a-v2");
        replacement.id = id;
        assert!(registry.insert(replacement).is_empty());
        assert_eq!(registry.get(id).unwrap().filename, "a-v2");
    }

    #[test]
    fn test_ttl_expiry_on_access() {
        let registry = IndexRegistry::new(4, Duration::from_secs(10));
        let start = Instant::now();
        let doc = document("a");
        let id = doc.id;
        registry.insert_at(doc, start);

        assert!(registry.get_at(id, start + Duration::from_secs(5)).is_some());
        // Access at +5s refreshed the timer
        assert!(registry.get_at(id, start + Duration::from_secs(14)).is_some());
        assert!(registry.get_at(id, start + Duration::from_secs(30)).is_none());
        assert_eq!(registry.stats().expired, 1);
    }

    #[test]
    fn test_sweep_expired() {
        let registry = IndexRegistry::new(4, Duration::from_secs(10));
        let start = Instant::now();
        registry.insert_at(document("old"), start);
        let fresh = document("fresh");
        let fresh_id = fresh.id;
        registry.insert_at(fresh, start + Duration::from_secs(8));

        assert_eq!(registry.sweep_expired_at(start + Duration::from_secs(12)), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry
            .get_at(fresh_id, start + Duration::from_secs(12))
            .is_some());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let registry = IndexRegistry::default();
        registry.insert(document("one"));
        registry.insert(document("two"));
        registry.insert(document("three"));

        let names: Vec<String> = registry
            .list()
            .iter()
            .map(|d| d.filename.clone())
            .collect();
        assert_eq!(names, vec!["one", "two", "three"]);
        assert_eq!(registry.stats().inserted, 3);
    }

    #[test]
    fn test_reader_keeps_index_after_removal() {
        let registry = IndexRegistry::default();
        let doc = document("a");
        let id = doc.id;
        registry.insert(doc);

        let held = registry.get(id).unwrap();
        registry.remove(id);
        assert!(registry.is_empty());
        assert_eq!(held.chunk_count(), 1);
    }
}

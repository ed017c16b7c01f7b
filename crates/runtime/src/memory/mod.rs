//! VectorMemory: an embedding store with cosine similarity + time-decay recall.
//!
//! Mirrors the teacher's context/vector_db.rs shape (a trait plus a concrete
//! store guarded by a single async lock) but persists to a typed binary +
//! JSON sidecar file instead of a remote vector database, per the "no
//! arbitrary-object deserialization" design note.

mod persistence;
pub mod types;

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

pub use types::{MemoryError, MemoryId, MemoryRecord, PruneCriteria};

/// Default half-life for time-decayed recall: one week.
pub const DEFAULT_HALF_LIFE_SECS: u64 = 7 * 24 * 3600;

/// Default cap on the number of records a store retains.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

#[async_trait]
pub trait VectorMemory: Send + Sync {
    /// Append a record. Fails with [`MemoryError::DimensionMismatch`] if the
    /// embedding's length differs from the store's established dimension.
    async fn store(
        &self,
        text: String,
        embedding: Vec<f32>,
        created_at: u64,
        tags: std::collections::HashMap<String, String>,
    ) -> Result<MemoryId, MemoryError>;

    /// Return up to `k` records ordered by descending `cosine * decay` score.
    async fn recall(
        &self,
        query_embedding: &[f32],
        k: usize,
        now: u64,
    ) -> Vec<(MemoryRecord, f32)>;

    /// Remove records matching the given criteria.
    async fn prune(&self, criteria: PruneCriteria) -> usize;

    /// Persist the embedding matrix + record metadata atomically.
    async fn save(&self, path: &Path) -> Result<(), MemoryError>;

    /// Number of records currently held.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// In-process store backed by a single `RwLock`-guarded table, matching the
/// teacher's "one writer at a time, turn-scoped lock" concurrency note.
#[derive(Debug)]
pub struct VectorMemoryStore {
    inner: RwLock<Inner>,
    half_life_secs: u64,
    max_records: usize,
}

#[derive(Debug)]
struct Inner {
    dimension: Option<usize>,
    records: Vec<MemoryRecord>,
}

impl VectorMemoryStore {
    pub fn new(half_life_secs: u64, max_records: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                dimension: None,
                records: Vec::new(),
            }),
            half_life_secs,
            max_records,
        }
    }

    /// Load a store previously written by [`VectorMemory::save`], rejecting
    /// a mismatched dimension against the active embedder.
    pub async fn load(
        path: &Path,
        expected_dimension: Option<usize>,
        half_life_secs: u64,
        max_records: usize,
    ) -> Result<Self, MemoryError> {
        let (dimension, records) = persistence::load(path, expected_dimension)?;
        Ok(Self {
            inner: RwLock::new(Inner { dimension, records }),
            half_life_secs,
            max_records,
        })
    }

    fn decay(&self, age_secs: u64) -> f32 {
        let lambda = std::f64::consts::LN_2 / self.half_life_secs as f64;
        (-lambda * age_secs as f64).exp() as f32
    }

    /// Evict stalest records until `len() <= max_records`. Deterministic:
    /// sorted by ascending decay factor, ties broken by ascending created_at.
    fn evict_if_over_cap(&self, inner: &mut Inner, now: u64) {
        if inner.records.len() <= self.max_records {
            return;
        }
        let mut scored: Vec<(usize, f32, u64)> = inner
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let age = now.saturating_sub(r.created_at);
                (i, self.decay(age), r.created_at)
            })
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.2.cmp(&b.2))
        });
        let excess = inner.records.len() - self.max_records;
        let mut to_remove: Vec<usize> = scored.into_iter().take(excess).map(|(i, _, _)| i).collect();
        to_remove.sort_unstable_by(|a, b| b.cmp(a));
        for idx in to_remove {
            inner.records.remove(idx);
        }
    }
}

impl Default for VectorMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_LIFE_SECS, DEFAULT_MAX_RECORDS)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorMemory for VectorMemoryStore {
    async fn store(
        &self,
        text: String,
        embedding: Vec<f32>,
        created_at: u64,
        tags: std::collections::HashMap<String, String>,
    ) -> Result<MemoryId, MemoryError> {
        let mut inner = self.inner.write().await;
        match inner.dimension {
            Some(d) if d != embedding.len() => {
                return Err(MemoryError::DimensionMismatch {
                    expected: d,
                    got: embedding.len(),
                });
            }
            None => inner.dimension = Some(embedding.len()),
            _ => {}
        }
        let id = MemoryId::new();
        inner.records.push(MemoryRecord {
            id,
            text,
            embedding,
            created_at,
            tags,
        });
        self.evict_if_over_cap(&mut inner, created_at);
        Ok(id)
    }

    async fn recall(&self, query_embedding: &[f32], k: usize, now: u64) -> Vec<(MemoryRecord, f32)> {
        let inner = self.inner.read().await;
        let query_norm: f32 = query_embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if inner.records.is_empty() || query_norm == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<(MemoryRecord, f32, u64)> = inner
            .records
            .iter()
            .map(|r| {
                let cos = cosine(query_embedding, &r.embedding);
                let age = now.saturating_sub(r.created_at);
                let score = cos * self.decay(age);
                (r.clone(), score, r.created_at)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.2.cmp(&a.2))
        });
        scored.truncate(k);
        scored.into_iter().map(|(r, s, _)| (r, s)).collect()
    }

    async fn prune(&self, criteria: PruneCriteria) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        match criteria {
            PruneCriteria::OlderThanSecs(older_than) => {
                inner.records.retain(|r| r.created_at >= older_than);
            }
            PruneCriteria::MinDecayedScore {
                min_score,
                now,
                half_life_secs,
            } => {
                let lambda = std::f64::consts::LN_2 / half_life_secs as f64;
                inner.records.retain(|r| {
                    let age = now.saturating_sub(r.created_at);
                    let d = (-lambda * age as f64).exp() as f32;
                    d >= min_score
                });
            }
        }
        before - inner.records.len()
    }

    async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        let inner = self.inner.read().await;
        let dimension = inner.dimension.unwrap_or(0);
        persistence::save(path, dimension, &inner.records)
    }

    async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn empty_store_recalls_nothing() {
        let store = VectorMemoryStore::default();
        let got = store.recall(&[1.0, 0.0], 5, 0).await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn zero_query_norm_recalls_nothing() {
        let store = VectorMemoryStore::default();
        store
            .store("hi".into(), vec![1.0, 0.0], 0, HashMap::new())
            .await
            .unwrap();
        let got = store.recall(&[0.0, 0.0], 5, 0).await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = VectorMemoryStore::default();
        store
            .store("a".into(), vec![1.0, 0.0], 0, HashMap::new())
            .await
            .unwrap();
        let err = store
            .store("b".into(), vec![1.0, 0.0, 0.0], 0, HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { expected: 2, got: 3 }));
    }

    #[tokio::test]
    async fn recall_decays_old_records_below_fresh_ones() {
        // Scenario 3 from spec.md §8: two records, equal cosine 0.8, one
        // fresh and one 14 days old with a 7-day half_life.
        let store = VectorMemoryStore::new(7 * 24 * 3600, DEFAULT_MAX_RECORDS);
        let e = vec![0.8, 0.6]; // unit-ish vector aligned to produce cosine 1.0 with itself
        store
            .store("fresh".into(), e.clone(), 14 * 24 * 3600, HashMap::new())
            .await
            .unwrap();
        store
            .store("stale".into(), e.clone(), 0, HashMap::new())
            .await
            .unwrap();

        let now = 14 * 24 * 3600;
        let results = store.recall(&e, 2, now).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "fresh");
        assert!(results[0].1 > results[1].1);
    }

    #[tokio::test]
    async fn recall_ordering_is_non_increasing() {
        let store = VectorMemoryStore::default();
        for i in 0..5u64 {
            store
                .store(format!("r{i}"), vec![i as f32, 1.0], i * 100, HashMap::new())
                .await
                .unwrap();
        }
        let results = store.recall(&[1.0, 1.0], 5, 500).await;
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[tokio::test]
    async fn eviction_keeps_freshest_and_is_stable() {
        let store = VectorMemoryStore::new(DEFAULT_HALF_LIFE_SECS, 2);
        store.store("old".into(), vec![1.0], 0, HashMap::new()).await.unwrap();
        store.store("mid".into(), vec![1.0], 100, HashMap::new()).await.unwrap();
        store.store("new".into(), vec![1.0], 200, HashMap::new()).await.unwrap();
        assert_eq!(store.len().await, 2);
        let texts: Vec<String> = {
            let inner = store.inner.read().await;
            inner.records.iter().map(|r| r.text.clone()).collect()
        };
        assert!(texts.contains(&"new".to_string()));
        assert!(texts.contains(&"mid".to_string()));
        assert!(!texts.contains(&"old".to_string()));
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.bin");
        let store = VectorMemoryStore::default();
        store
            .store("hello".into(), vec![0.1, 0.2, 0.3], 42, HashMap::new())
            .await
            .unwrap();
        store.save(&path).await.unwrap();

        let loaded = VectorMemoryStore::load(&path, Some(3), DEFAULT_HALF_LIFE_SECS, DEFAULT_MAX_RECORDS)
            .await
            .unwrap();
        assert_eq!(loaded.len().await, 1);
        let got = loaded.recall(&[0.1, 0.2, 0.3], 1, 42).await;
        assert_eq!(got[0].0.text, "hello");
    }

    #[tokio::test]
    async fn load_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.bin");
        let store = VectorMemoryStore::default();
        store
            .store("hello".into(), vec![0.1, 0.2], 0, HashMap::new())
            .await
            .unwrap();
        store.save(&path).await.unwrap();

        let err = VectorMemoryStore::load(&path, Some(5), DEFAULT_HALF_LIFE_SECS, DEFAULT_MAX_RECORDS)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
    }
}

//! Core data structures for VectorMemory

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single stored memory: free text plus its embedding and bookkeeping fields.
///
/// Invariant: every record in a given [`super::VectorMemory`] shares the same
/// embedding dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Seconds since epoch.
    pub created_at: u64,
    pub tags: HashMap<String, String>,
}

impl MemoryRecord {
    pub fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Errors surfaced by [`super::VectorMemory`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("embedding dimension mismatch: store expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store file is corrupt: {0}")]
    CorruptStore(String),
}

/// Criteria accepted by [`super::VectorMemory::prune`].
#[derive(Debug, Clone, Copy)]
pub enum PruneCriteria {
    OlderThanSecs(u64),
    MinDecayedScore { min_score: f32, now: u64, half_life_secs: u64 },
}

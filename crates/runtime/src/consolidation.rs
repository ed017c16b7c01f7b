//! DualMemoryStore: background consolidation of long sessions into two
//! durable workspace artifacts, `HISTORY.md` and `MEMORY.md`.
//!
//! Mirrors the teacher's `scheduler/cron_scheduler.rs` concurrency-guard
//! shape (a set of in-flight keys gates duplicate work) but fires from the
//! turn loop rather than a tick, and persists to flat Markdown files instead
//! of a job store.

use std::collections::HashSet;
use std::path::PathBuf;

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

use crate::provider::{ChatOptions, ProviderClient};
use crate::session::HistoryEntry;

pub const DEFAULT_CONSOLIDATION_K: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConsolidationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),
}

/// A due consolidation window for one session. Holding this value means the
/// session has been marked in-flight; drop it (or call
/// [`DualMemoryStore::finish`]) to release the guard once the task ends.
pub struct ConsolidationWindow {
    pub session_id: String,
    pub offset: usize,
    pub end: usize,
}

pub struct DualMemoryStore {
    history_path: PathBuf,
    memory_path: PathBuf,
    k: usize,
    in_flight: Mutex<HashSet<String>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl DualMemoryStore {
    pub fn new(workspace_root: PathBuf, k: usize) -> Self {
        Self {
            history_path: workspace_root.join("HISTORY.md"),
            memory_path: workspace_root.join("MEMORY.md"),
            k,
            in_flight: Mutex::new(HashSet::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Check whether `session_id`'s unsummarized tail has reached `k` entries
    /// and, if so, claim the in-flight slot for it. A second trigger while
    /// one is already running for the same session is coalesced (returns
    /// `None`).
    pub fn try_trigger(&self, session_id: &str, history_len: usize, consolidation_offset: usize) -> Option<ConsolidationWindow> {
        if history_len.saturating_sub(consolidation_offset) < self.k {
            return None;
        }
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(session_id.to_string()) {
            return None;
        }
        Some(ConsolidationWindow {
            session_id: session_id.to_string(),
            offset: consolidation_offset,
            end: consolidation_offset + self.k,
        })
    }

    /// Release the in-flight guard for `session_id`, whether the task
    /// succeeded or failed.
    pub fn finish(&self, session_id: &str) {
        self.in_flight.lock().remove(session_id);
    }

    /// Summarize `entries` via the provider and append both artifacts.
    /// Returns the new `consolidation_offset` on success. Callers should log
    /// and otherwise ignore an error without blocking the turn, per the
    /// "failures logged but do not block" rule.
    pub async fn consolidate<P: ProviderClient>(
        &self,
        provider: &P,
        window: &ConsolidationWindow,
        entries: &[HistoryEntry],
    ) -> Result<usize, ConsolidationError> {
        let transcript = render_transcript(entries);

        let history_line = provider
            .chat(
                &[crate::context::ContextMessage {
                    role: crate::session::Role::User,
                    content: format!(
                        "Summarize this conversation excerpt in one line for a running history log:\n\n{transcript}"
                    ),
                }],
                &ChatOptions::default(),
            )
            .await?;

        let bullets_raw = provider
            .chat(
                &[crate::context::ContextMessage {
                    role: crate::session::Role::User,
                    content: format!(
                        "Extract up to three durable facts worth remembering long-term from this excerpt, one per line, no numbering:\n\n{transcript}"
                    ),
                }],
                &ChatOptions::default(),
            )
            .await?;

        let bullets: Vec<&str> = bullets_raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(3)
            .collect();

        let _guard = self.write_lock.lock().await;
        append_line(&self.history_path, history_line.trim()).await?;
        for bullet in &bullets {
            append_line(&self.memory_path, &format!("- {bullet}")).await?;
        }

        Ok(window.end)
    }
}

fn render_transcript(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{:?}: {}", e.role, e.content))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn append_line(path: &std::path::Path, line: &str) -> Result<(), ConsolidationError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn trigger_requires_k_unsummarized_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = DualMemoryStore::new(dir.path().to_path_buf(), 5);
        assert!(store.try_trigger("s1", 4, 0).is_none());
        assert!(store.try_trigger("s1", 5, 0).is_some());
    }

    #[test]
    fn second_trigger_for_same_session_is_coalesced() {
        let dir = tempfile::tempdir().unwrap();
        let store = DualMemoryStore::new(dir.path().to_path_buf(), 5);
        let first = store.try_trigger("s1", 10, 0);
        assert!(first.is_some());
        let second = store.try_trigger("s1", 10, 0);
        assert!(second.is_none());
    }

    #[test]
    fn finish_releases_the_guard_for_a_later_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let store = DualMemoryStore::new(dir.path().to_path_buf(), 5);
        let window = store.try_trigger("s1", 10, 0).unwrap();
        store.finish(&window.session_id);
        assert!(store.try_trigger("s1", 10, 0).is_some());
    }

    #[tokio::test]
    async fn consolidate_appends_history_and_memory_files() {
        use crate::provider::LocalHeuristicClient;

        let dir = tempfile::tempdir().unwrap();
        let store = DualMemoryStore::new(dir.path().to_path_buf(), 2);
        let provider = LocalHeuristicClient;
        let entries = vec![
            HistoryEntry {
                role: Role::User,
                content: "remind me to buy milk".to_string(),
                timestamp: 1,
            },
            HistoryEntry {
                role: Role::Assistant,
                content: "noted".to_string(),
                timestamp: 2,
            },
        ];
        let window = store.try_trigger("s1", 2, 0).unwrap();
        let new_offset = store.consolidate(&provider, &window, &entries).await.unwrap();
        store.finish("s1");

        assert_eq!(new_offset, 2);
        let history = tokio::fs::read_to_string(dir.path().join("HISTORY.md")).await.unwrap();
        assert!(!history.trim().is_empty());
    }
}

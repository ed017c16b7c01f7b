//! SessionState: per-(channel, sender) conversation state with atomic
//! JSON persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// A single turn entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    /// Seconds since epoch.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Append-only conversation state for one (channel, sender) pair.
///
/// Mutated append-only except `consolidation_offset`, which advances
/// monotonically and marks how much of `history` has already been
/// summarized by `DualMemoryStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub channel: String,
    pub history: Vec<HistoryEntry>,
    pub consolidation_offset: usize,
    pub metadata: HashMap<String, String>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            channel: channel.into(),
            history: Vec::new(),
            consolidation_offset: 0,
            metadata: HashMap::new(),
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>, timestamp: u64) {
        self.history.push(HistoryEntry {
            role,
            content: content.into(),
            timestamp,
        });
    }

    /// Advance `consolidation_offset`. Never decreases: callers that pass a
    /// smaller value than the current offset are ignored.
    pub fn advance_consolidation_offset(&mut self, new_offset: usize) {
        if new_offset > self.consolidation_offset {
            self.consolidation_offset = new_offset;
        }
    }

    pub fn pending_for_consolidation(&self) -> usize {
        self.history.len().saturating_sub(self.consolidation_offset)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// All sessions, keyed by session_id, persisted as one JSON map with
/// write-then-rename atomicity.
pub struct SessionStore {
    path: PathBuf,
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn load(path: PathBuf) -> Result<Self, SessionError> {
        let sessions = if path.exists() {
            let contents = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&contents)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    pub async fn get_or_create(&self, session_id: &str, channel: &str) -> SessionState {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id, channel))
            .clone()
    }

    pub async fn put(&self, session: SessionState) -> Result<(), SessionError> {
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.session_id.clone(), session);
        }
        self.persist().await
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn persist(&self) -> Result<(), SessionError> {
        let sessions = self.sessions.read().await;
        write_atomic(&self.path, &sessions).await
    }
}

async fn write_atomic(path: &Path, sessions: &HashMap<String, SessionState>) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(sessions)?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.flush().await?;
    }
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_persists_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions.json"));
        let mut session = store.get_or_create("s1", "cli").await;
        session.push(Role::User, "hello", 1);
        store.put(session).await.unwrap();

        let loaded = SessionStore::load(dir.path().join("sessions.json")).await.unwrap();
        let session = loaded.get("s1").await.unwrap();
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn consolidation_offset_never_decreases() {
        let mut session = SessionState::new("s1", "cli");
        session.advance_consolidation_offset(5);
        session.advance_consolidation_offset(2);
        assert_eq!(session.consolidation_offset, 5);
    }

    #[test]
    fn pending_for_consolidation_counts_unsummarized_entries() {
        let mut session = SessionState::new("s1", "cli");
        for i in 0..10 {
            session.push(Role::User, format!("msg{i}"), i as u64);
        }
        session.advance_consolidation_offset(4);
        assert_eq!(session.pending_for_consolidation(), 6);
    }

    #[tokio::test]
    async fn crash_mid_persist_leaves_previous_file_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let store = SessionStore::new(path.clone());
        let session = store.get_or_create("s1", "cli").await;
        store.put(session).await.unwrap();

        let before = tokio::fs::read_to_string(&path).await.unwrap();
        // No partial-tmp file should remain after a successful persist.
        let mut read_dir = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut tmp_count = 0;
        while let Some(entry) = read_dir.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                tmp_count += 1;
            }
        }
        assert_eq!(tmp_count, 0);
        assert!(!before.is_empty());
    }
}

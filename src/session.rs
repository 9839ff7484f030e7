//! Conversation persistence.
//!
//! Sessions are JSON files on disk, one per conversation, filling the
//! role browser local storage plays for the web front end. The store is
//! an explicit instance rather than process-wide state so tests can
//! point it at a scratch directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::ConversationMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub messages: Vec<ConversationMessage>,
}

impl SessionData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_session_id(),
            name: name.into(),
            created_at: now_timestamp(),
            messages: Vec::new(),
        }
    }
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Store under `~/.whisperfunc/sessions`.
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Self::new(home.join(".whisperfunc").join("sessions"))
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn save(&self, data: &SessionData) -> Result<PathBuf> {
        let path = self.path_for(&data.id);
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<SessionData> {
        let path = self.path_for(id);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Session '{id}' not found"))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        std::fs::remove_file(self.path_for(id))
            .with_context(|| format!("Session '{id}' not found"))
    }

    /// All sessions, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<SessionData>> {
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(data) = serde_json::from_str::<SessionData>(&content) {
                        sessions.push(data);
                    }
                }
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversationMessage, ToolCallRecord};
    use serde_json::json;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_generate_session_id() {
        let id = generate_session_id();
        assert_eq!(id.len(), 8);
    }

    #[test]
    fn save_load_round_trip_preserves_call_trace() {
        let (_dir, store) = store();
        let mut data = SessionData::new("Test Session");
        let call = ToolCallRecord::failed("c1", "calculate", json!({}), "tool not found");
        data.messages.push(ConversationMessage::user("2+2?"));
        data.messages.push(ConversationMessage::assistant("4", vec![call]));
        store.save(&data).unwrap();

        let loaded = store.load(&data.id).unwrap();
        assert_eq!(loaded.name, "Test Session");
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].tool_calls.len(), 1);
    }

    #[test]
    fn list_returns_newest_first() {
        let (_dir, store) = store();
        let mut old = SessionData::new("old");
        old.created_at = "2024-01-01 00:00:00".to_string();
        let mut new = SessionData::new("new");
        new.created_at = "2025-01-01 00:00:00".to_string();
        store.save(&old).unwrap();
        store.save(&new).unwrap();

        let sessions = store.list().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].name, "new");
    }

    #[test]
    fn delete_removes_session() {
        let (_dir, store) = store();
        let data = SessionData::new("gone");
        store.save(&data).unwrap();
        store.delete(&data.id).unwrap();
        assert!(store.load(&data.id).is_err());
        assert!(store.delete(&data.id).is_err());
    }
}

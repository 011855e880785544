//! Conversation history stores. Both are append-only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use contarag_core::error::{Error, Result};
use contarag_core::traits::SessionStore;
use contarag_core::types::Message;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<Vec<Message>>> {
        Ok(self.sessions.read().await.get(conversation_id).cloned())
    }

    async fn append(&self, conversation_id: &str, turns: Vec<Message>) -> Result<()> {
        self.sessions.write().await.entry(conversation_id.to_string()).or_default().extend(turns);
        Ok(())
    }
}

/// One `<id>.json` file per conversation under `dir`.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::resource_load(dir.display().to_string(), e))?;
        Ok(Self { dir: dir.to_path_buf(), write_lock: Mutex::new(()) })
    }

    fn path_for(&self, conversation_id: &str) -> Result<PathBuf> {
        let valid = !conversation_id.is_empty()
            && conversation_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidInput(format!("invalid conversation id '{conversation_id}'")));
        }
        Ok(self.dir.join(format!("{conversation_id}.json")))
    }

    async fn read(path: &Path) -> Result<Option<Vec<Message>>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::Operation(format!("corrupt session file {}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::upstream("session store", e)),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<Vec<Message>>> {
        let path = self.path_for(conversation_id)?;
        Self::read(&path).await
    }

    async fn append(&self, conversation_id: &str, turns: Vec<Message>) -> Result<()> {
        let path = self.path_for(conversation_id)?;
        let _guard = self.write_lock.lock().await;
        let mut messages = Self::read(&path).await?.unwrap_or_default();
        messages.extend(turns);
        let json = serde_json::to_string_pretty(&messages).map_err(|e| Error::Operation(e.to_string()))?;
        // write-then-rename: readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| Error::upstream("session store", e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| Error::upstream("session store", e))?;
        debug!(conversation_id, messages = messages.len(), "session saved");
        Ok(())
    }
}

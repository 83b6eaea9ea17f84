use crate::handle::SessionSnapshot;
use async_trait::async_trait;
use modforge_core::{ModforgeError, ModforgeResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Persistence for session snapshots.
#[async_trait]
pub trait MemorySnapshotStore: Send + Sync {
    /// Creates or overwrites the snapshot for its session id.
    async fn save(&self, snapshot: &SessionSnapshot) -> ModforgeResult<()>;
    #[allow(missing_docs)]
    async fn load(&self, id: Uuid) -> ModforgeResult<Option<SessionSnapshot>>;
    /// Removing a missing snapshot is not an error.
    async fn delete(&self, id: Uuid) -> ModforgeResult<()>;
    #[allow(missing_docs)]
    async fn list(&self) -> ModforgeResult<Vec<Uuid>>;
}

/// Snapshot store writing one pretty-printed `<session-id>.json` per session.
pub struct FileMemorySnapshotStore {
    dir: PathBuf,
}

impl FileMemorySnapshotStore {
    /// Opens the store, creating `dir` if needed.
    pub async fn new(dir: PathBuf) -> ModforgeResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl MemorySnapshotStore for FileMemorySnapshotStore {
    async fn save(&self, snapshot: &SessionSnapshot) -> ModforgeResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(self.snapshot_path(snapshot.session_id), json).await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> ModforgeResult<Option<SessionSnapshot>> {
        let path = self.snapshot_path(id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let snapshot = serde_json::from_str(&data)
            .map_err(|e| ModforgeError::Session(format!("Failed to parse snapshot {id}: {e}")))?;
        Ok(Some(snapshot))
    }

    async fn delete(&self, id: Uuid) -> ModforgeResult<()> {
        let path = self.snapshot_path(id);
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn list(&self) -> ModforgeResult<Vec<Uuid>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = Uuid::parse_str(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

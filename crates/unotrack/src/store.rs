use crate::error::{LedgerError, Result};
use crate::ledger::SessionLedger;
use crate::migrate::{self, Migration};
use crate::paths::SaveResolver;
use crate::types::{Snapshot, SnapshotSummary, derive_title};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Reads, writes and enumerates snapshot files in the saves directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    resolver: SaveResolver,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            resolver: SaveResolver::new(),
        }
    }

    pub fn with_resolver(resolver: SaveResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &SaveResolver {
        &self.resolver
    }

    /// Persists the ledger's session. Does nothing until the ledger has a
    /// snapshot id.
    pub fn write(&self, ledger: &SessionLedger) -> Result<()> {
        let Some(id) = ledger.snapshot_id() else {
            return Ok(());
        };
        self.write_snapshot(id, &ledger.to_snapshot())
    }

    /// Replaces the snapshot file wholesale. The document is written to a
    /// temp file next to the target and renamed over it, so readers never
    /// see a half-written file.
    pub fn write_snapshot(&self, id: &str, snapshot: &Snapshot) -> Result<()> {
        let dir = self.resolver.ensure_saves_dir()?;
        let path = self.resolver.snapshot_file(id)?;

        let tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&tmp, snapshot)?;
        tmp.persist(&path).map_err(|e| LedgerError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        debug!(
            snapshot = id,
            players = snapshot.players.len(),
            current_tick = snapshot.current_tick,
            "snapshot written"
        );
        Ok(())
    }

    /// Reads the raw, unmigrated document.
    pub fn read(&self, id: &str) -> Result<Value> {
        if !is_valid_id(id) {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        let path = self.resolver.snapshot_file(id)?;
        if !path.is_file() {
            return Err(LedgerError::NotFound(id.to_string()));
        }

        let data = std::fs::read_to_string(&path)?;
        let doc: Value =
            serde_json::from_str(&data).map_err(|e| LedgerError::corrupt(id, e.to_string()))?;

        let Some(root) = doc.as_object() else {
            return Err(LedgerError::corrupt(id, "document is not a JSON object"));
        };
        for field in ["current_tick", "players"] {
            if !root.contains_key(field) {
                return Err(LedgerError::corrupt(id, format!("missing field {}", field)));
            }
        }
        Ok(doc)
    }

    /// Reads a snapshot and upgrades it to the current schema. The file on
    /// disk is left as it was.
    pub fn load(&self, id: &str) -> Result<Snapshot> {
        self.load_with_migration(id).map(|(snapshot, _)| snapshot)
    }

    fn load_with_migration(&self, id: &str) -> Result<(Snapshot, Migration)> {
        let mut doc = self.read(id)?;
        let migration = migrate::migrate(&mut doc, id)?;
        let mut snapshot: Snapshot =
            serde_json::from_value(doc).map_err(|e| LedgerError::corrupt(id, e.to_string()))?;

        if snapshot.players.iter().any(|p| p.ordinal == 0) {
            debug!(snapshot = id, "assigning ordinals by position");
            for (i, player) in snapshot.players.iter_mut().enumerate() {
                player.ordinal = i as u32 + 1;
            }
        }
        Ok((snapshot, migration))
    }

    /// Summaries of every readable snapshot, newest first. Files that fail
    /// to load are skipped with a warning.
    pub fn list(&self) -> Result<Vec<SnapshotSummary>> {
        let ids = self.resolver.list_snapshot_ids()?;
        let mut summaries = Vec::new();

        for id in ids {
            match self.load_with_migration(&id) {
                Ok((snapshot, migration)) => summaries.push(SnapshotSummary {
                    title: derive_title(&id),
                    participants: snapshot.players.into_iter().map(|p| p.name).collect(),
                    elapsed_ms: snapshot.current_tick,
                    stored_version: migration.from,
                    id,
                }),
                Err(e) => {
                    warn!(snapshot = %id, error = %e, "skipping unreadable snapshot");
                }
            }
        }
        Ok(summaries)
    }

    /// Every readable snapshot, newest first, skipping bad files like
    /// [`SnapshotStore::list`].
    pub fn load_all(&self) -> Result<Vec<(String, Snapshot)>> {
        let ids = self.resolver.list_snapshot_ids()?;
        let mut snapshots = Vec::new();

        for id in ids {
            match self.load(&id) {
                Ok(snapshot) => snapshots.push((id, snapshot)),
                Err(e) => {
                    warn!(snapshot = %id, error = %e, "skipping unreadable snapshot");
                }
            }
        }
        Ok(snapshots)
    }

    pub fn exists(&self, id: &str) -> bool {
        is_valid_id(id)
            && self
                .resolver
                .snapshot_file(id)
                .map(|p| p.is_file())
                .unwrap_or(false)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

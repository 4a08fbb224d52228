//! Local durable backup of the campaign working copy.
//!
//! This is a backstop, not the primary store: it exists so a change made
//! between "the user edited" and "the server acknowledged" survives a
//! reload or crash. Saves must therefore never block or fail the
//! interactive path, and corrupt data on load is treated as absent.

use crate::campaign::Campaign;
use crate::error::{OutreachError, Result};
use crate::fingerprint::fingerprint;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// BackupSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub campaigns: Vec<Campaign>,
    pub saved_at: DateTime<Utc>,
    pub fingerprint: String,
}

impl BackupSnapshot {
    pub fn new(campaigns: Vec<Campaign>, saved_at: DateTime<Utc>) -> Self {
        let fingerprint = fingerprint(&campaigns);
        Self {
            campaigns,
            saved_at,
            fingerprint,
        }
    }

    pub fn total_emails(&self) -> usize {
        self.campaigns.iter().map(|c| c.email_sequence.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// BackupStore
// ---------------------------------------------------------------------------

/// Storage seam for the backup, so a desktop or server embedding can swap
/// the persistence primitive without touching the sync engine.
pub trait BackupStore {
    /// Persist the full campaign list with a save timestamp and digest.
    /// Infallible by contract: storage failures are logged and swallowed.
    fn save(&self, campaigns: &[Campaign]);

    /// Last saved snapshot, or `None` if absent, corrupt, or empty.
    fn load(&self) -> Option<BackupSnapshot>;
}

// ---------------------------------------------------------------------------
// RedbBackup
// ---------------------------------------------------------------------------

/// Snapshot table: a single fixed key, JSON-encoded snapshot value.
const BACKUP: TableDefinition<&str, &[u8]> = TableDefinition::new("campaign_backup");

const BACKUP_KEY: &str = "campaigns";

pub struct RedbBackup {
    db: Database,
}

impl RedbBackup {
    /// Open or create the backup database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(|e| OutreachError::Backup(e.to_string()))?;
        // Ensure the table exists before any reads
        let wt = db
            .begin_write()
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        wt.open_table(BACKUP)
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        wt.commit()
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        Ok(Self { db })
    }

    fn try_save(&self, snapshot: &BackupSnapshot) -> Result<()> {
        let value = serde_json::to_vec(snapshot)?;
        let wt = self
            .db
            .begin_write()
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        {
            let mut table = wt
                .open_table(BACKUP)
                .map_err(|e| OutreachError::Backup(e.to_string()))?;
            table
                .insert(BACKUP_KEY, value.as_slice())
                .map_err(|e| OutreachError::Backup(e.to_string()))?;
        }
        wt.commit()
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        Ok(())
    }

    fn try_load(&self) -> Result<Option<BackupSnapshot>> {
        let rt = self
            .db
            .begin_read()
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        let table = rt
            .open_table(BACKUP)
            .map_err(|e| OutreachError::Backup(e.to_string()))?;
        let Some(guard) = table
            .get(BACKUP_KEY)
            .map_err(|e| OutreachError::Backup(e.to_string()))?
        else {
            return Ok(None);
        };
        let snapshot: BackupSnapshot = serde_json::from_slice(guard.value())?;
        Ok(Some(snapshot))
    }
}

impl BackupStore for RedbBackup {
    fn save(&self, campaigns: &[Campaign]) {
        let snapshot = BackupSnapshot::new(campaigns.to_vec(), Utc::now());
        if let Err(e) = self.try_save(&snapshot) {
            // Losing the backup must not block the interactive flow
            tracing::warn!(error = %e, "campaign backup save failed");
        }
    }

    fn load(&self) -> Option<BackupSnapshot> {
        match self.try_load() {
            Ok(Some(snapshot)) if !snapshot.campaigns.is_empty() => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "campaign backup unreadable, treating as absent");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryBackup
// ---------------------------------------------------------------------------

/// In-memory backup for tests and ephemeral embeddings.
#[derive(Default)]
pub struct MemoryBackup {
    inner: Mutex<Option<BackupSnapshot>>,
}

impl MemoryBackup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backup with a pre-built snapshot (e.g. a backdated one).
    pub fn with_snapshot(snapshot: BackupSnapshot) -> Self {
        Self {
            inner: Mutex::new(Some(snapshot)),
        }
    }
}

impl BackupStore for MemoryBackup {
    fn save(&self, campaigns: &[Campaign]) {
        let snapshot = BackupSnapshot::new(campaigns.to_vec(), Utc::now());
        *self.inner.lock().expect("backup lock poisoned") = Some(snapshot);
    }

    fn load(&self) -> Option<BackupSnapshot> {
        self.inner
            .lock()
            .expect("backup lock poisoned")
            .clone()
            .filter(|s| !s.campaigns.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Persistent guide/season storage using redb.
//!
//! # Table design
//!
//! `GUIDES` holds at most one entry, keyed by the guide's 16 uuid bytes.
//!
//! `SEASONS` uses a 24-byte composite key:
//! ```text
//! [ recorded_at_ms: u64 big-endian (8 bytes) | uuid: 16 bytes ]
//! ```
//! so the last entry in key order is the most recent season.
//!
//! The database file is opened per operation rather than held for the life
//! of the process. redb locks the file while a `Database` is alive, and the
//! dirty flag has to stay writable by a separate `routefinder guide
//! mark-dirty` process. A contended open surfaces as `GuideDb` and the
//! scheduler retries on its next pass.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::error::{Result, RoutefinderError};

use super::record::{Guide, Season};
use super::GuideStore;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// Key: uuid bytes. Value: JSON-encoded Guide.
const GUIDES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("guides");

/// Key: 24-byte composite (recorded_at_ms big-endian ++ uuid bytes).
/// Value: JSON-encoded Season.
const SEASONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("seasons");

fn season_key(ts: DateTime<Utc>, id: Uuid) -> [u8; 24] {
    let mut key = [0u8; 24];
    let ms = ts.timestamp_millis().max(0) as u64;
    key[..8].copy_from_slice(&ms.to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

fn db_err(e: impl std::fmt::Display) -> RoutefinderError {
    RoutefinderError::GuideDb(e.to_string())
}

// ---------------------------------------------------------------------------
// GuideDb
// ---------------------------------------------------------------------------

/// redb-backed `GuideStore`.
#[derive(Debug, Clone)]
pub struct GuideDb {
    path: PathBuf,
}

impl GuideDb {
    /// Create the database at `path` if needed and make sure both tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(GUIDES).map_err(db_err)?;
        wt.open_table(SEASONS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn database(&self) -> Result<Database> {
        Database::create(&self.path).map_err(db_err)
    }

    /// Append a season record. Used by the operator CLI; the scheduler never
    /// writes seasons.
    pub fn record_season(&self, season: &Season) -> Result<()> {
        let key = season_key(season.recorded_at, Uuid::new_v4());
        let value = serde_json::to_vec(season)?;
        let db = self.database()?;
        let wt = db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(SEASONS).map_err(db_err)?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }
}

impl GuideStore for GuideDb {
    fn load_guide(&self) -> Result<Option<Guide>> {
        let db = self.database()?;
        let rt = db.begin_read().map_err(db_err)?;
        let table = rt.open_table(GUIDES).map_err(db_err)?;
        let record = match table.first().map_err(db_err)? {
            Some((_, v)) => Some(serde_json::from_slice(v.value())?),
            None => None,
        };
        Ok(record)
    }

    fn load_season(&self) -> Result<Option<Season>> {
        let db = self.database()?;
        let rt = db.begin_read().map_err(db_err)?;
        let table = rt.open_table(SEASONS).map_err(db_err)?;
        let record = match table.last().map_err(db_err)? {
            // An unreadable season must not gate recompute.
            Some((_, v)) => match serde_json::from_slice::<Season>(v.value()) {
                Ok(season) => Some(season),
                Err(e) => {
                    tracing::warn!(error = %e, "unreadable season record, treating season as on");
                    None
                }
            },
            None => None,
        };
        Ok(record)
    }

    fn save_guide(&self, guide: &Guide) -> Result<Uuid> {
        let id = guide.id.unwrap_or_else(Uuid::new_v4);
        let stored = Guide {
            id: Some(id),
            ..guide.clone()
        };
        let value = serde_json::to_vec(&stored)?;

        let db = self.database()?;
        let wt = db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(GUIDES).map_err(db_err)?;
            // Keep the table a singleton: anything not under `id` goes.
            let stale: Vec<Vec<u8>> = table
                .iter()
                .map_err(db_err)?
                .filter_map(|entry| entry.ok().map(|(k, _)| k.value().to_vec()))
                .filter(|k| k.as_slice() != id.as_bytes().as_slice())
                .collect();
            for key in stale {
                table.remove(key.as_slice()).map_err(db_err)?;
            }
            table
                .insert(id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(id)
    }

    fn set_dirty(&self, dirty: bool) -> Result<bool> {
        let db = self.database()?;
        let wt = db.begin_write().map_err(db_err)?;
        let updated = {
            let mut table = wt.open_table(GUIDES).map_err(db_err)?;
            let existing = table
                .first()
                .map_err(db_err)?
                .map(|(k, v)| (k.value().to_vec(), v.value().to_vec()));
            match existing {
                Some((key, raw)) => {
                    let mut guide: Guide = serde_json::from_slice(&raw)?;
                    guide.dirty = dirty;
                    let value = serde_json::to_vec(&guide)?;
                    table
                        .insert(key.as_slice(), value.as_slice())
                        .map_err(db_err)?;
                    true
                }
                None => false,
            }
        };
        wt.commit().map_err(db_err)?;
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

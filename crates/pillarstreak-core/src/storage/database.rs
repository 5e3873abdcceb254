//! SQLite-based state storage.
//!
//! Provides persistent storage for:
//! - The serialized pillar state (assignment, streak, checkpoint, stats)
//! - Key-value store for application state

use std::path::Path;

use rusqlite::{params, Connection};

use super::data_dir;
use crate::calendar::{Calendar, Timestamp};
use crate::engine::PillarState;
use crate::error::{Result, StorageError};
use crate::history::retain_recent;

/// kv key holding the serialized [`PillarState`].
pub const STATE_KEY: &str = "pillar_state";

/// SQLite database for pillar state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pillarstreak/pillarstreak.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("pillarstreak.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Load the stored pillar state.
    ///
    /// A missing state is the default state. Stored JSON goes through
    /// [`PillarState::from_json`], so invalid sections are dropped rather
    /// than failing the load.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored text is not JSON.
    pub fn load_state(&self) -> Result<PillarState> {
        match self.kv_get(STATE_KEY)? {
            None => Ok(PillarState::default()),
            Some(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw)?;
                Ok(PillarState::from_json(&value))
            }
        }
    }

    /// Persist `state`, pruning history entries older than
    /// `retention_days` calendar days before `now`.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_state(
        &self,
        state: &PillarState,
        retention_days: u32,
        now: Timestamp,
        calendar: &Calendar,
    ) -> Result<()> {
        let history = &state.streak.pillar_history;
        let kept = retain_recent(history, retention_days, now, calendar);
        if kept.len() != history.len() {
            tracing::debug!(
                pruned = history.len() - kept.len(),
                retention_days,
                "pruning pillar history"
            );
        }

        let mut pruned = state.clone();
        pruned.streak.pillar_history = kept;
        self.kv_set(STATE_KEY, &serde_json::to_string(&pruned)?)?;
        Ok(())
    }

    /// Forget the stored state.
    pub fn reset_state(&self) -> Result<()> {
        self.kv_delete(STATE_KEY)?;
        Ok(())
    }
}

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod requests;
pub mod tags;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::StoreError;

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::models::ProtocolState;

/// Key under which the whole entity blob is persisted.
pub const STATE_KEY: &str = "nt_protocol_v4_unified";

pub type Result<T> = std::result::Result<T, StoreError>;

/// The node's single store. Every entity lives in one JSON blob inside a
/// key/value table; each call loads it, and mutations persist it again while
/// still holding the connection lock, so there is exactly one writer.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Raw local-storage read.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        get_item(&conn, key)
    }

    /// Raw local-storage write.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        set_item(&conn, key, value)
    }

    /// Run a read-only closure against the current state.
    pub(crate) fn read_state<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ProtocolState) -> T,
    {
        let conn = self.lock()?;
        let state = load_state(&conn)?;
        Ok(f(&state))
    }

    /// Load, mutate and persist the state as one unit. Nothing is written
    /// when the closure fails.
    pub(crate) fn mutate<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut ProtocolState) -> Result<T>,
    {
        let conn = self.lock()?;
        let mut state = load_state(&conn)?;
        let out = f(&mut state)?;
        save_state(&conn, &state)?;
        Ok(out)
    }
}

fn get_item(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM local_store WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_item(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO local_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        (key, value),
    )?;
    Ok(())
}

fn load_state(conn: &Connection) -> Result<ProtocolState> {
    match get_item(conn, STATE_KEY)? {
        Some(raw) => {
            let raw: serde_json::Value = serde_json::from_str(&raw)?;
            let mut state: ProtocolState = serde_json::from_value(raw.clone())?;
            state.backfill_opening_balances(&raw);
            Ok(state)
        }
        None => {
            warn!("No protocol state found, seeding defaults");
            let state = ProtocolState::seeded(nt_types::now_millis());
            save_state(conn, &state)?;
            Ok(state)
        }
    }
}

fn save_state(conn: &Connection, state: &ProtocolState) -> Result<()> {
    let raw = serde_json::to_string(state)?;
    set_item(conn, STATE_KEY, &raw)
}

use super::{RegistryError, TierIndexEntry};
use crate::vector::{SourceTable, Tier};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS tier_index (
    id TEXT PRIMARY KEY,
    source_table TEXT NOT NULL,
    tier TEXT NOT NULL CHECK (tier IN ('hot', 'warm', 'cold')),
    location TEXT,
    created_at INTEGER NOT NULL,
    migrated_at INTEGER,
    accessed_at INTEGER,
    access_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_tier_index_tier ON tier_index (tier);
CREATE INDEX IF NOT EXISTS idx_tier_index_accessed_at ON tier_index (accessed_at);
";

/// Blocking SQLite handle shared behind a mutex; all registry work is pushed
/// through `spawn_blocking` so callers stay async.
#[derive(Clone)]
pub(super) struct TierDb {
    conn: Arc<Mutex<Connection>>,
}

impl TierDb {
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, RegistryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, RegistryError> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn call<T, F>(&self, op: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut Connection) -> Result<T, RegistryError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            op(&mut guard)
        })
        .await?
    }
}

pub(super) fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TierIndexEntry> {
    let tier_raw: String = row.get(2)?;
    let source_raw: String = row.get(1)?;
    let tier = Tier::parse(&tier_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown tier `{tier_raw}`").into(),
        )
    })?;
    let source_table = SourceTable::parse(&source_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown source table `{source_raw}`").into(),
        )
    })?;
    let created_at: i64 = row.get(4)?;
    let migrated_at: Option<i64> = row.get(5)?;
    let accessed_at: Option<i64> = row.get(6)?;
    let access_count: i64 = row.get(7)?;
    Ok(TierIndexEntry {
        id: row.get(0)?,
        source_table,
        tier,
        location: row.get(3)?,
        created_at_ms: created_at.max(0) as u64,
        migrated_at_ms: migrated_at.map(|v| v.max(0) as u64),
        accessed_at_ms: accessed_at.map(|v| v.max(0) as u64),
        access_count: access_count.max(0) as u64,
    })
}

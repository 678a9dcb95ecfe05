mod db;

use crate::vector::{SourceTable, Tier};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The registry's unit of record: where one item currently lives and how
/// recently/often it has been read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TierIndexEntry {
    pub id: String,
    pub source_table: SourceTable,
    pub tier: Tier,
    pub location: Option<String>,
    pub created_at_ms: u64,
    pub migrated_at_ms: Option<u64>,
    pub accessed_at_ms: Option<u64>,
    pub access_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderBy {
    AccessedAt,
    AccessCount,
    CreatedAt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Demotion-policy query: staleness by recency of access first, frequency
/// second. LFU-style callers supply `max_access_count` instead of
/// `access_threshold_ms`.
#[derive(Clone, Debug)]
pub struct MigrationCriteria {
    pub from_tier: Tier,
    pub access_threshold_ms: Option<u64>,
    pub max_access_count: Option<u64>,
    pub source_table: Option<SourceTable>,
    pub limit: Option<usize>,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
}

impl MigrationCriteria {
    pub fn from_tier(tier: Tier) -> Self {
        Self {
            from_tier: tier,
            access_threshold_ms: None,
            max_access_count: None,
            source_table: None,
            limit: None,
            order_by: OrderBy::AccessedAt,
            order_direction: OrderDirection::Asc,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TierTarget {
    pub tier: Tier,
    pub location: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MigrationUpdate {
    pub id: String,
    pub target: TierTarget,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierStatistics {
    pub hot: u64,
    pub warm: u64,
    pub cold: u64,
    pub total: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tier `{tier}` requires a storage location")]
    MissingLocation { tier: Tier },
    #[error("invalid migration criteria: {0}")]
    InvalidCriteria(String),
    #[error("atomic batch references unknown ids: {ids:?}")]
    AtomicBatchMissing { ids: Vec<String> },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

const SELECT_COLUMNS: &str =
    "id, source_table, tier, location, created_at, migrated_at, accessed_at, access_count";

/// Durable map from item id to its current storage tier, location descriptor
/// and access counters. Plain struct with the storage handle injected at
/// construction; multiple instances coexist safely.
#[derive(Clone)]
pub struct TierRegistry {
    store: db::TierDb,
}

impl TierRegistry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        Ok(Self {
            store: db::TierDb::open(path.as_ref())?,
        })
    }

    pub fn open_in_memory() -> Result<Self, RegistryError> {
        Ok(Self {
            store: db::TierDb::open_in_memory()?,
        })
    }

    /// Creates (or wholly replaces) the tracked entry for `id`. Replacement
    /// resets the access counters: a fresh record is a fresh lifecycle.
    pub async fn record(
        &self,
        id: &str,
        source_table: SourceTable,
        tier: Tier,
        location: Option<String>,
    ) -> Result<TierIndexEntry, RegistryError> {
        if tier.requires_location() && location.is_none() {
            return Err(RegistryError::MissingLocation { tier });
        }
        let now = now_ms();
        let migrated_at_ms = (tier != Tier::Hot).then_some(now);
        let entry = TierIndexEntry {
            id: id.to_string(),
            source_table,
            tier,
            location,
            created_at_ms: now,
            migrated_at_ms,
            accessed_at_ms: None,
            access_count: 0,
        };
        let row = entry.clone();
        self.store
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tier_index \
                     (id, source_table, tier, location, created_at, migrated_at, accessed_at, access_count) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0) \
                     ON CONFLICT(id) DO UPDATE SET \
                       source_table = excluded.source_table, \
                       tier = excluded.tier, \
                       location = excluded.location, \
                       created_at = excluded.created_at, \
                       migrated_at = excluded.migrated_at, \
                       accessed_at = NULL, \
                       access_count = 0",
                    params![
                        row.id,
                        row.source_table.as_str(),
                        row.tier.as_str(),
                        row.location,
                        row.created_at_ms as i64,
                        row.migrated_at_ms.map(|v| v as i64),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(entry)
    }

    pub async fn get(&self, id: &str) -> Result<Option<TierIndexEntry>, RegistryError> {
        let id = id.to_string();
        self.store
            .call(move |conn| {
                let sql = format!("SELECT {SELECT_COLUMNS} FROM tier_index WHERE id = ?1");
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query_map(params![id], db::entry_from_row)?;
                match rows.next() {
                    Some(row) => Ok(Some(row?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, RegistryError> {
        let id = id.to_string();
        self.store
            .call(move |conn| {
                let changed = conn.execute("DELETE FROM tier_index WHERE id = ?1", params![id])?;
                Ok(changed > 0)
            })
            .await
    }

    pub async fn find_by_tier(
        &self,
        tier: Tier,
        source_table: Option<SourceTable>,
    ) -> Result<Vec<TierIndexEntry>, RegistryError> {
        self.store
            .call(move |conn| {
                let mut sql =
                    format!("SELECT {SELECT_COLUMNS} FROM tier_index WHERE tier = ?1");
                let mut params_vec: Vec<rusqlite::types::Value> =
                    vec![tier.as_str().to_string().into()];
                if let Some(table) = source_table {
                    sql.push_str(" AND source_table = ?2");
                    params_vec.push(table.as_str().to_string().into());
                }
                sql.push_str(" ORDER BY id ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    rusqlite::params_from_iter(params_vec),
                    db::entry_from_row,
                )?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            })
            .await
    }

    /// Selects entries stale enough to demote out of `criteria.from_tier`.
    /// Never-accessed entries sort first under ascending `accessed_at` order:
    /// no recorded access means maximally eligible.
    pub async fn find_eligible_for_migration(
        &self,
        criteria: MigrationCriteria,
    ) -> Result<Vec<TierIndexEntry>, RegistryError> {
        if criteria.limit == Some(0) {
            return Err(RegistryError::InvalidCriteria(
                "limit must be positive".to_string(),
            ));
        }
        self.store
            .call(move |conn| {
                let mut sql =
                    format!("SELECT {SELECT_COLUMNS} FROM tier_index WHERE tier = ?");
                let mut params_vec: Vec<rusqlite::types::Value> =
                    vec![criteria.from_tier.as_str().to_string().into()];
                if let Some(threshold) = criteria.access_threshold_ms {
                    let cutoff = now_ms().saturating_sub(threshold) as i64;
                    sql.push_str(" AND (accessed_at IS NULL OR accessed_at < ?)");
                    params_vec.push(cutoff.into());
                }
                if let Some(max) = criteria.max_access_count {
                    sql.push_str(" AND access_count <= ?");
                    params_vec.push((max as i64).into());
                }
                if let Some(table) = criteria.source_table {
                    sql.push_str(" AND source_table = ?");
                    params_vec.push(table.as_str().to_string().into());
                }
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_clause(criteria.order_by, criteria.order_direction));
                if let Some(limit) = criteria.limit {
                    sql.push_str(" LIMIT ?");
                    params_vec.push((limit as i64).into());
                }
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    rusqlite::params_from_iter(params_vec),
                    db::entry_from_row,
                )?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            })
            .await
    }

    /// Moves `id` to a new tier/location and stamps `migrated_at`. Migration
    /// is not an access: `accessed_at`/`access_count` stay untouched.
    pub async fn migrate(
        &self,
        id: &str,
        target: TierTarget,
    ) -> Result<Option<TierIndexEntry>, RegistryError> {
        if target.tier.requires_location() && target.location.is_none() {
            return Err(RegistryError::MissingLocation { tier: target.tier });
        }
        let id = id.to_string();
        self.store
            .call(move |conn| {
                let now = now_ms() as i64;
                let changed = conn.execute(
                    "UPDATE tier_index SET tier = ?1, location = ?2, migrated_at = ?3 WHERE id = ?4",
                    params![target.tier.as_str(), target.location, now, id],
                )?;
                if changed == 0 {
                    return Ok(None);
                }
                let sql = format!("SELECT {SELECT_COLUMNS} FROM tier_index WHERE id = ?1");
                let entry = conn.query_row(&sql, params![id], db::entry_from_row)?;
                Ok(Some(entry))
            })
            .await
    }

    /// Applies a batch of tier transitions. In atomic mode every id is
    /// validated to exist before any row mutates; one unknown id fails the
    /// whole call and nothing changes. Non-atomic mode applies each update
    /// independently and yields `None` for unknown ids.
    pub async fn batch_migrate(
        &self,
        updates: Vec<MigrationUpdate>,
        atomic: bool,
    ) -> Result<Vec<Option<TierIndexEntry>>, RegistryError> {
        for update in &updates {
            if update.target.tier.requires_location() && update.target.location.is_none() {
                return Err(RegistryError::MissingLocation {
                    tier: update.target.tier,
                });
            }
        }
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                if atomic {
                    let mut missing = Vec::new();
                    for update in &updates {
                        let exists: bool = tx.query_row(
                            "SELECT EXISTS(SELECT 1 FROM tier_index WHERE id = ?1)",
                            params![update.id],
                            |row| row.get(0),
                        )?;
                        if !exists {
                            missing.push(update.id.clone());
                        }
                    }
                    if !missing.is_empty() {
                        // dropping the transaction rolls back; nothing was written yet
                        return Err(RegistryError::AtomicBatchMissing { ids: missing });
                    }
                }
                let now = now_ms() as i64;
                let select_sql =
                    format!("SELECT {SELECT_COLUMNS} FROM tier_index WHERE id = ?1");
                let mut out = Vec::with_capacity(updates.len());
                for update in updates {
                    let changed = tx.execute(
                        "UPDATE tier_index SET tier = ?1, location = ?2, migrated_at = ?3 WHERE id = ?4",
                        params![
                            update.target.tier.as_str(),
                            update.target.location,
                            now,
                            update.id
                        ],
                    )?;
                    if changed == 0 {
                        out.push(None);
                        continue;
                    }
                    let entry =
                        tx.query_row(&select_sql, params![update.id], db::entry_from_row)?;
                    out.push(Some(entry));
                }
                tx.commit()?;
                Ok(out)
            })
            .await
    }

    /// Read-path telemetry: bump `access_count`, stamp `accessed_at`.
    /// An unknown id is a no-op returning `false`, matching the batch form.
    pub async fn record_access(&self, id: &str) -> Result<bool, RegistryError> {
        let id = id.to_string();
        self.store
            .call(move |conn| {
                let now = now_ms() as i64;
                let changed = conn.execute(
                    "UPDATE tier_index SET access_count = access_count + 1, accessed_at = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Batch access telemetry; unknown ids are skipped. Returns how many
    /// entries were actually touched.
    pub async fn batch_record_access(&self, ids: Vec<String>) -> Result<usize, RegistryError> {
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                let now = now_ms() as i64;
                let mut touched = 0usize;
                {
                    let mut stmt = tx.prepare(
                        "UPDATE tier_index SET access_count = access_count + 1, accessed_at = ?1 WHERE id = ?2",
                    )?;
                    for id in &ids {
                        touched += stmt.execute(params![now, id])?;
                    }
                }
                tx.commit()?;
                Ok(touched)
            })
            .await
    }

    pub async fn statistics(
        &self,
        source_table: Option<SourceTable>,
    ) -> Result<TierStatistics, RegistryError> {
        self.store
            .call(move |conn| {
                let mut sql = "SELECT tier, COUNT(*) FROM tier_index".to_string();
                let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
                if let Some(table) = source_table {
                    sql.push_str(" WHERE source_table = ?1");
                    params_vec.push(table.as_str().to_string().into());
                }
                sql.push_str(" GROUP BY tier");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), |row| {
                    let tier: String = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    Ok((tier, count))
                })?;
                let mut stats = TierStatistics::default();
                for row in rows {
                    let (tier, count) = row?;
                    let count = count.max(0) as u64;
                    match Tier::parse(&tier) {
                        Some(Tier::Hot) => stats.hot = count,
                        Some(Tier::Warm) => stats.warm = count,
                        Some(Tier::Cold) => stats.cold = count,
                        None => continue,
                    }
                    stats.total += count;
                }
                Ok(stats)
            })
            .await
    }
}

fn order_clause(order_by: OrderBy, direction: OrderDirection) -> String {
    let column = match order_by {
        OrderBy::AccessedAt => "accessed_at",
        OrderBy::AccessCount => "access_count",
        OrderBy::CreatedAt => "created_at",
    };
    let dir = match direction {
        OrderDirection::Asc => "ASC",
        OrderDirection::Desc => "DESC",
    };
    if order_by == OrderBy::AccessedAt && direction == OrderDirection::Asc {
        // never-accessed rows lead the scan; state the NULLs-first rule
        // instead of inheriting it from SQLite's collation
        return "accessed_at IS NOT NULL, accessed_at ASC, id ASC".to_string();
    }
    format!("{column} {dir}, id ASC")
}

pub(crate) fn now_ms() -> u64 {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as u64
}

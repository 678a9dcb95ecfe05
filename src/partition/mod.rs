pub mod codec;
mod fs;
mod memory;

pub use fs::FsPartitionStore;
pub use memory::MemoryPartitionStore;

use crate::vector::{PartitionMetadata, VectorEntry};
use anyhow::Result;
use async_trait::async_trait;

/// A parsed cold partition: its metadata document plus the full-precision
/// entries it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionData {
    pub metadata: PartitionMetadata,
    pub vectors: Vec<VectorEntry>,
}

/// Narrow seam over the cold backing store (R2, archive bucket, local disk).
/// Byte contents are opaque to the search engine; `codec` is the parsing
/// layer behind this trait.
///
/// There is no timeout or cancellation contract here. An implementation that
/// needs one should wrap its own I/O (e.g. `tokio::time::timeout`) so the
/// scan/merge pipeline stays unaware of it.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Fetch a partition's raw bytes. `Ok(None)` means the key does not
    /// resolve; the search path treats that as a degraded result, not a
    /// failure.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Fetch a partition's metadata without its payload.
    async fn head(&self, key: &str) -> Result<Option<PartitionMetadata>>;

    /// List stored partition keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

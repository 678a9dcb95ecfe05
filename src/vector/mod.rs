pub mod simd;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "hot" => Some(Tier::Hot),
            "warm" => Some(Tier::Warm),
            "cold" => Some(Tier::Cold),
            _ => None,
        }
    }

    /// Hot entries live in-process; warm and cold must point at object storage.
    pub fn requires_location(self) -> bool {
        !matches!(self, Tier::Hot)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceTable {
    Things,
    Relationships,
}

impl SourceTable {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTable::Things => "things",
            SourceTable::Relationships => "relationships",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "things" => Some(SourceTable::Things),
            "relationships" => Some(SourceTable::Relationships),
            _ => None,
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VectorMetadata {
    pub ns: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

/// One indexed item's full-precision representation as stored in a cold
/// partition. Immutable once written; removed only when the owning partition
/// is rewritten or the item is deleted upstream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VectorEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub source_table: SourceTable,
    pub source_rowid: i64,
    pub metadata: VectorMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PartitionMetadata {
    pub cluster_id: String,
    pub vector_count: usize,
    pub dimensionality: usize,
    pub compression_type: String,
    pub size_bytes: u64,
    pub created_at_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub centroid: Vec<f32>,
    pub vector_count: usize,
    pub partition_key: String,
}

/// Versioned snapshot of all cluster centroids. Rebuilt out-of-band by the
/// compaction job and swapped in whole; the engine never mutates one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClusterIndex {
    pub version: u64,
    pub clusters: Vec<ClusterInfo>,
    pub total_vectors: u64,
    pub built_at_ms: u64,
}

impl ClusterIndex {
    pub fn empty() -> Self {
        Self {
            version: 0,
            clusters: Vec::new(),
            total_vectors: 0,
            built_at_ms: 0,
        }
    }
}

impl Default for ClusterIndex {
    fn default() -> Self {
        Self::empty()
    }
}

use super::{codec, PartitionStore};
use crate::vector::{ClusterIndex, PartitionMetadata, VectorEntry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

const OBJECT_SUFFIX: &str = ".part";
const META_SUFFIX: &str = ".meta.json";
const CLUSTER_INDEX_FILE: &str = "clusters.json";

/// Directory-backed partition store: one framed object per key, a JSON
/// metadata document alongside it, and the out-of-band cluster index as a
/// single `clusters.json` at the root. Keys may contain `/` and map to
/// subdirectories.
#[derive(Clone)]
pub struct FsPartitionStore {
    root: PathBuf,
}

impl FsPartitionStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create partition dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{OBJECT_SUFFIX}"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{META_SUFFIX}"))
    }

    /// Writes one partition object plus its metadata sidecar. Used by the
    /// compaction job and by test fixtures; the search path only reads.
    pub fn put_partition(
        &self,
        key: &str,
        metadata: &PartitionMetadata,
        vectors: &[VectorEntry],
    ) -> Result<()> {
        let bytes = codec::encode_partition(metadata, vectors)
            .with_context(|| format!("encode partition {key}"))?;
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &bytes)
            .with_context(|| format!("write partition {}", path.display()))?;
        let mut file = std::fs::File::create(self.meta_path(key))?;
        serde_json::to_writer_pretty(&mut file, metadata)?;
        Ok(())
    }

    pub fn store_cluster_index(&self, index: &ClusterIndex) -> Result<()> {
        let mut file = std::fs::File::create(self.root.join(CLUSTER_INDEX_FILE))?;
        serde_json::to_writer_pretty(&mut file, index).context("write cluster index")?;
        Ok(())
    }

    pub fn load_cluster_index(&self) -> Result<Option<ClusterIndex>> {
        let path = self.root.join(CLUSTER_INDEX_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let index = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse cluster index {}", path.display()))?;
        Ok(Some(index))
    }
}

#[async_trait]
impl PartitionStore for FsPartitionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.object_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<PartitionMetadata>> {
        let bytes = match tokio::fs::read(self.meta_path(key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let metadata = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse partition metadata for {key}"))?;
        Ok(Some(metadata))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        let keys = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let mut keys = Vec::new();
            collect_keys(&root, &root, &mut keys)?;
            keys.retain(|key| key.starts_with(&prefix));
            keys.sort();
            Ok(keys)
        })
        .await
        .context("partition list task failed")??;
        Ok(keys)
    }
}

fn collect_keys(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_keys(root, &path, out)?;
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if let Some(key) = relative.strip_suffix(OBJECT_SUFFIX) {
            out.push(key.to_string());
        }
    }
    Ok(())
}

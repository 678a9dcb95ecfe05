use super::{codec, PartitionStore};
use crate::vector::{PartitionMetadata, VectorEntry};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory partition store for tests and embedders running without a data
/// directory.
#[derive(Clone, Default)]
pub struct MemoryPartitionStore(Arc<RwLock<Inner>>);

#[derive(Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
    metadata: HashMap<String, PartitionMetadata>,
}

impl MemoryPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_partition(
        &self,
        key: &str,
        metadata: &PartitionMetadata,
        vectors: &[VectorEntry],
    ) -> Result<(), codec::CodecError> {
        let bytes = codec::encode_partition(metadata, vectors)?;
        let mut inner = self.0.write();
        inner.objects.insert(key.to_string(), bytes);
        inner.metadata.insert(key.to_string(), metadata.clone());
        Ok(())
    }

    /// Stores raw bytes without encoding; lets tests plant corrupt frames.
    pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        self.0.write().objects.insert(key.to_string(), bytes);
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.0.write();
        inner.metadata.remove(key);
        inner.objects.remove(key).is_some()
    }
}

#[async_trait]
impl PartitionStore for MemoryPartitionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.0.read().objects.get(key).cloned())
    }

    async fn head(&self, key: &str) -> Result<Option<PartitionMetadata>> {
        Ok(self.0.read().metadata.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.0.read();
        let mut keys: Vec<String> = inner
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

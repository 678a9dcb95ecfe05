use super::PartitionData;
use crate::vector::{PartitionMetadata, VectorEntry};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

const PARTITION_MAGIC: [u8; 4] = *b"TVP1";
const FRAME_VERSION: u32 = 1;
const HEADER_BYTES: usize = 8;
const TRAILER_BYTES: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("partition frame truncated")]
    Truncated,
    #[error("bad partition magic")]
    BadMagic,
    #[error("unsupported partition frame version {0}")]
    UnsupportedVersion(u32),
    #[error("partition frame checksum mismatch")]
    ChecksumMismatch,
    #[error("partition payload malformed")]
    Malformed,
    #[error("metadata declares {declared} vectors but payload holds {parsed}")]
    CountMismatch { declared: usize, parsed: usize },
    #[error("entry `{id}` has dimensionality {actual}, partition declares {declared}")]
    DimensionMismatch {
        id: String,
        declared: usize,
        actual: usize,
    },
}

#[derive(Serialize, Deserialize)]
struct FramePayload {
    metadata: PartitionMetadata,
    vectors: Vec<VectorEntry>,
}

/// Frame layout: magic, little-endian version, bincode payload, crc32 of the
/// payload as trailer.
pub fn encode_partition(
    metadata: &PartitionMetadata,
    vectors: &[VectorEntry],
) -> Result<Vec<u8>, CodecError> {
    check_invariants(metadata, vectors)?;
    let payload = bincode::serialize(&FramePayload {
        metadata: metadata.clone(),
        vectors: vectors.to_vec(),
    })
    .map_err(|_| CodecError::Malformed)?;
    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(HEADER_BYTES + payload.len() + TRAILER_BYTES);
    out.extend_from_slice(&PARTITION_MAGIC);
    out.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

pub fn decode_partition(bytes: &[u8]) -> Result<PartitionData, CodecError> {
    if bytes.len() < HEADER_BYTES + TRAILER_BYTES {
        return Err(CodecError::Truncated);
    }
    if bytes[..4] != PARTITION_MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FRAME_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let payload = &bytes[HEADER_BYTES..bytes.len() - TRAILER_BYTES];
    let trailer = &bytes[bytes.len() - TRAILER_BYTES..];
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != stored_crc {
        return Err(CodecError::ChecksumMismatch);
    }
    let frame: FramePayload = bincode::deserialize(payload).map_err(|_| CodecError::Malformed)?;
    check_invariants(&frame.metadata, &frame.vectors)?;
    Ok(PartitionData {
        metadata: frame.metadata,
        vectors: frame.vectors,
    })
}

fn check_invariants(
    metadata: &PartitionMetadata,
    vectors: &[VectorEntry],
) -> Result<(), CodecError> {
    if metadata.vector_count != vectors.len() {
        return Err(CodecError::CountMismatch {
            declared: metadata.vector_count,
            parsed: vectors.len(),
        });
    }
    for entry in vectors {
        if entry.embedding.len() != metadata.dimensionality {
            return Err(CodecError::DimensionMismatch {
                id: entry.id.clone(),
                declared: metadata.dimensionality,
                actual: entry.embedding.len(),
            });
        }
    }
    Ok(())
}

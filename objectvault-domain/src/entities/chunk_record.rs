//! Chunk Record: one row per stored chunk (§3). `(file_id, sequence_index)`
//! is unique and indices must be dense over `0..total_chunks`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::FileId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub file_id: FileId,
    pub sequence_index: u32,
    pub backend_endpoint: String,
    pub remote_path: String,
    pub stored_length: u64,
    pub crc32: u32,
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    pub fn new(
        file_id: FileId,
        sequence_index: u32,
        backend_endpoint: String,
        remote_path: String,
        stored_length: u64,
        crc32: u32,
    ) -> Self {
        Self {
            file_id,
            sequence_index,
            backend_endpoint,
            remote_path,
            stored_length,
            crc32,
            created_at: Utc::now(),
        }
    }
}

/// Checks the chunk density invariant: indices form `0..records.len()`
/// with no gaps, independent of the order `records` is passed in.
pub fn indices_are_dense(records: &[ChunkRecord]) -> bool {
    let mut seen: Vec<u32> = records.iter().map(|r| r.sequence_index).collect();
    seen.sort_unstable();
    seen.iter().enumerate().all(|(i, &idx)| i as u32 == idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::FileId;

    fn record(idx: u32) -> ChunkRecord {
        ChunkRecord::new(FileId::generate(), idx, "b1".into(), "/p".into(), 10, 1)
    }

    #[test]
    fn dense_indices_pass() {
        assert!(indices_are_dense(&[record(0), record(1), record(2)]));
    }

    #[test]
    fn gap_fails() {
        assert!(!indices_are_dense(&[record(0), record(2)]));
    }

    #[test]
    fn order_independent() {
        assert!(indices_are_dense(&[record(2), record(0), record(1)]));
    }
}

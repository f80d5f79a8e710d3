//! Chunk Backend Client port (§4.1): file-level operations against a
//! single storage endpoint. Each call opens a fresh authenticated
//! session, creates the parent directory if missing, transfers bytes,
//! and tears the session down on every exit path - the concrete `ssh2`
//! adapter lives in `objectvault-core::infrastructure::backend`.

use async_trait::async_trait;

use crate::error::ObjectVaultError;

#[async_trait]
pub trait ChunkBackendClient: Send + Sync {
    async fn put(&self, endpoint: &str, remote_path: &str, bytes: &[u8]) -> Result<(), ObjectVaultError>;

    async fn get(&self, endpoint: &str, remote_path: &str) -> Result<Vec<u8>, ObjectVaultError>;

    async fn delete(&self, endpoint: &str, remote_path: &str) -> Result<(), ObjectVaultError>;
}

/// Remote path convention shared by every backend: `{root}/{file_id}/chunk_{index}.enc`.
pub fn chunk_remote_path(storage_root: &str, file_id: &str, sequence_index: u32) -> String {
    format!("{storage_root}/{file_id}/chunk_{sequence_index}.enc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_follows_convention() {
        assert_eq!(
            chunk_remote_path("/vault", "abc-123", 7),
            "/vault/abc-123/chunk_7.enc"
        );
    }
}

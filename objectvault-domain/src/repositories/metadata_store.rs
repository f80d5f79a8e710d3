// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Port for the Metadata Store (§4.5): persisted File/Chunk tables plus
//! the append-only audit log sink. Infrastructure provides the concrete
//! `sqlx`-backed implementation; the aggregator pipeline depends only on
//! this trait.

use async_trait::async_trait;

use crate::entities::{AuditLogEntry, ChunkRecord, FileRecord};
use crate::error::ObjectVaultError;
use crate::value_objects::FileId;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn begin_upload(&self, file: &FileRecord) -> Result<(), ObjectVaultError>;

    async fn save_chunk(&self, chunk: &ChunkRecord) -> Result<(), ObjectVaultError>;

    /// Ordered by `sequence_index` ascending.
    async fn list_chunks(&self, file_id: FileId) -> Result<Vec<ChunkRecord>, ObjectVaultError>;

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, ObjectVaultError>;

    async fn exists(&self, file_id: FileId) -> Result<bool, ObjectVaultError>;

    /// Cascades to every chunk row for `file_id`.
    async fn delete_file(&self, file_id: FileId) -> Result<(), ObjectVaultError>;

    async fn delete_chunk(&self, file_id: FileId, sequence_index: u32) -> Result<(), ObjectVaultError>;

    /// Never blocks the primary path and never raises - failures here are
    /// logged by the caller, not propagated.
    async fn log(&self, entry: AuditLogEntry);
}

// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Aggregator Pipeline (§4.6-4.8): orchestrates upload, download, and
//! delete. Holds explicit references to its collaborators - metadata
//! store, crypto engine, integrity engine, backend pool, and backend
//! client - so there are no back-references anywhere in the graph
//! (Design Notes §9).

use std::sync::Arc;

use tokio::sync::Semaphore;

use objectvault_bootstrap::CancellationToken;
use objectvault_domain::entities::{AuditLogEntry, ChunkRecord, FileRecord, OwnerId};
use objectvault_domain::repositories::MetadataStore;
use objectvault_domain::services::{chunk_remote_path, ChunkBackendClient, CryptoEngine, IntegrityEngine};
use objectvault_domain::value_objects::{CipherTag, EventKind, FileId};
use objectvault_domain::ObjectVaultError;

use crate::infrastructure::backend::BackendPool;
use crate::infrastructure::metrics::Metrics;

const MAX_FILENAME_LEN: usize = 255;

pub struct UploadRequest {
    pub display_name: String,
    pub owner: String,
    pub cipher_tag: CipherTag,
    pub client_file_id: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct AggregatorPipeline {
    metadata: Arc<dyn MetadataStore>,
    crypto: Arc<dyn CryptoEngine>,
    integrity: Arc<dyn IntegrityEngine>,
    backend_pool: Arc<BackendPool>,
    backend_client: Arc<dyn ChunkBackendClient>,
    metrics: Arc<Metrics>,
    upload_permits: Arc<Semaphore>,
    chunk_size: u64,
    max_file_size: u64,
    storage_root: String,
}

impl AggregatorPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        crypto: Arc<dyn CryptoEngine>,
        integrity: Arc<dyn IntegrityEngine>,
        backend_pool: Arc<BackendPool>,
        backend_client: Arc<dyn ChunkBackendClient>,
        metrics: Arc<Metrics>,
        upload_concurrency: usize,
        chunk_size: u64,
        max_file_size: u64,
        storage_root: String,
    ) -> Self {
        Self {
            metadata,
            crypto,
            integrity,
            backend_pool,
            backend_client,
            metrics,
            upload_permits: Arc::new(Semaphore::new(upload_concurrency)),
            chunk_size,
            max_file_size,
            storage_root,
        }
    }

    fn validate_filename(name: &str) -> Result<(), ObjectVaultError> {
        if name.is_empty() || name.len() > MAX_FILENAME_LEN {
            return Err(ObjectVaultError::validation(
                "fileName",
                format!("file name must be 1-{MAX_FILENAME_LEN} bytes"),
            ));
        }
        if name.contains("..") || name.starts_with('/') {
            return Err(ObjectVaultError::validation("fileName", "file name must not contain path traversal"));
        }
        Ok(())
    }

    /// `cancel` propagates cooperative interruption onto every long wait
    /// in this upload - permit acquisition and each chunk's backend I/O
    /// (§4, "Cancellation and timeouts") - so cancelling mid-stream takes
    /// the same rollback path as any other mid-upload failure rather
    /// than leaving a partial File/Chunk Record behind (property 10).
    pub async fn upload(&self, request: UploadRequest, cancel: CancellationToken) -> Result<FileRecord, ObjectVaultError> {
        Self::validate_filename(&request.display_name)?;
        if request.bytes.is_empty() {
            return Err(ObjectVaultError::validation("fileSize", "upload stream must not be empty"));
        }
        if request.bytes.len() as u64 > self.max_file_size {
            return Err(ObjectVaultError::validation(
                "fileSize",
                format!("file exceeds the maximum size of {} bytes", self.max_file_size),
            ));
        }

        let _permit = tokio::select! {
            permit = self.upload_permits.acquire() => {
                permit.map_err(|_| ObjectVaultError::Cancelled("upload permit acquisition interrupted".into()))?
            }
            _ = cancel.cancelled() => {
                return Err(ObjectVaultError::Cancelled("upload cancelled while waiting for a permit".into()));
            }
        };

        let file_id = request
            .client_file_id
            .as_deref()
            .and_then(|raw| FileId::parse(raw).ok())
            .unwrap_or_else(FileId::generate);

        let total_chunks = request.bytes.len().div_ceil(self.chunk_size as usize) as u32;
        let file_record = FileRecord::new(
            file_id,
            request.display_name,
            request.bytes.len() as u64,
            total_chunks,
            request.cipher_tag,
            OwnerId(request.owner),
        );

        self.metadata
            .log(AuditLogEntry::new(EventKind::UploadStart, "aggregator", format!("upload start for {file_id}")))
            .await;

        if let Err(e) = self.metadata.begin_upload(&file_record).await {
            self.metadata
                .log(AuditLogEntry::new(EventKind::UploadFail, "aggregator", format!("begin_upload failed: {e}")))
                .await;
            return Err(e);
        }

        if let Err(e) = self.stream_chunks(file_id, &request.bytes, &cancel).await {
            self.rollback(file_id).await;
            self.metadata
                .log(AuditLogEntry::new(EventKind::UploadFail, "aggregator", format!("upload failed: {e}")))
                .await;
            return Err(e);
        }

        self.metadata
            .log(AuditLogEntry::new(EventKind::UploadComplete, "aggregator", format!("upload complete for {file_id}")))
            .await;
        Ok(file_record)
    }

    async fn stream_chunks(&self, file_id: FileId, bytes: &[u8], cancel: &CancellationToken) -> Result<(), ObjectVaultError> {
        for (index, plaintext) in bytes.chunks(self.chunk_size as usize).enumerate() {
            if cancel.is_cancelled() {
                return Err(ObjectVaultError::Cancelled(format!("upload of {file_id} cancelled before chunk {index}")));
            }

            let timer = self.metrics.chunk_upload_seconds.start_timer();
            let ciphertext = self.crypto.encrypt(plaintext)?;
            let crc = self.integrity.crc32(&ciphertext);
            let endpoint = self.backend_pool.next()?;
            let remote_path = chunk_remote_path(&self.storage_root, &file_id.to_string(), index as u32);

            let client = self.backend_client.clone();
            let put_endpoint = endpoint.clone();
            let path = remote_path.clone();
            let payload = ciphertext.clone();
            tokio::select! {
                result = self.backend_pool.with_permit(&endpoint, || async move { client.put(&put_endpoint, &path, &payload).await }) => {
                    result?;
                }
                _ = cancel.cancelled() => {
                    return Err(ObjectVaultError::Cancelled(format!("upload of {file_id} cancelled during chunk {index}")));
                }
            }

            self.metadata
                .save_chunk(&ChunkRecord::new(
                    file_id,
                    index as u32,
                    endpoint,
                    remote_path,
                    ciphertext.len() as u64,
                    crc,
                ))
                .await?;
            timer.observe_duration();
        }
        Ok(())
    }

    /// Best-effort rollback: deletes every stored chunk on its backend,
    /// the chunk records, and the file record. Each failure here is
    /// audited but never replaces the original error the caller already
    /// has in hand.
    async fn rollback(&self, file_id: FileId) {
        self.metrics.rollbacks_total.inc();
        if let Ok(chunks) = self.metadata.list_chunks(file_id).await {
            for chunk in chunks {
                if let Err(e) = self.backend_client.delete(&chunk.backend_endpoint, &chunk.remote_path).await {
                    self.metadata
                        .log(
                            AuditLogEntry::new(
                                EventKind::Rollback,
                                "aggregator",
                                format!("failed to delete chunk {} of {file_id}: {e}", chunk.sequence_index),
                            )
                            .with_severity(objectvault_domain::value_objects::Severity::Warning),
                        )
                        .await;
                }
                if let Err(e) = self.metadata.delete_chunk(file_id, chunk.sequence_index).await {
                    self.metadata
                        .log(AuditLogEntry::new(
                            EventKind::Rollback,
                            "aggregator",
                            format!("failed to delete chunk record {} of {file_id}: {e}", chunk.sequence_index),
                        ))
                        .await;
                }
            }
        }
        if let Err(e) = self.metadata.delete_file(file_id).await {
            self.metadata
                .log(AuditLogEntry::new(EventKind::Rollback, "aggregator", format!("failed to delete file {file_id}: {e}")))
                .await;
        }
        self.metadata
            .log(AuditLogEntry::new(EventKind::Rollback, "aggregator", format!("rollback complete for {file_id}")))
            .await;
    }

    pub async fn download(&self, file_id: FileId, cipher_tag: CipherTag) -> Result<Vec<u8>, ObjectVaultError> {
        self.metadata
            .log(AuditLogEntry::new(EventKind::DownloadStart, "aggregator", format!("download start for {file_id}")))
            .await;

        let file = self
            .metadata
            .get_file(file_id)
            .await?
            .ok_or_else(|| ObjectVaultError::NotFound(format!("file {file_id} not found")))?;
        if file.cipher_tag != cipher_tag {
            return Err(ObjectVaultError::NotFound(format!("file {file_id} not found")));
        }

        let mut chunks = self.metadata.list_chunks(file_id).await?;
        chunks.sort_by_key(|c| c.sequence_index);
        if chunks.len() as u32 != file.total_chunks || !objectvault_domain::entities::indices_are_dense(&chunks) {
            return Err(ObjectVaultError::Integrity(format!(
                "chunk records for {file_id} are not dense over 0..{}",
                file.total_chunks
            )));
        }

        let mut output = Vec::with_capacity(file.total_length as usize);
        for chunk in chunks {
            let timer = self.metrics.chunk_download_seconds.start_timer();
            let ciphertext = self.backend_client.get(&chunk.backend_endpoint, &chunk.remote_path).await?;
            if !self.integrity.verify(&ciphertext, chunk.crc32) {
                self.metrics.crc_mismatches_total.inc();
                self.metadata
                    .log(AuditLogEntry::new(
                        EventKind::CrcMismatch,
                        "aggregator",
                        format!("CRC mismatch on chunk {} of {file_id}", chunk.sequence_index),
                    ))
                    .await;
                return Err(ObjectVaultError::Integrity(format!(
                    "CRC mismatch on chunk {} of {file_id}",
                    chunk.sequence_index
                )));
            }
            let plaintext = self.crypto.decrypt(&ciphertext)?;
            output.extend_from_slice(&plaintext);
            timer.observe_duration();
        }

        self.metadata
            .log(AuditLogEntry::new(EventKind::DownloadComplete, "aggregator", format!("download complete for {file_id}")))
            .await;
        Ok(output)
    }

    pub async fn delete(&self, file_id: FileId) -> Result<(), ObjectVaultError> {
        let chunks = self.metadata.list_chunks(file_id).await?;
        for chunk in &chunks {
            if let Err(e) = self.backend_client.delete(&chunk.backend_endpoint, &chunk.remote_path).await {
                self.metadata
                    .log(AuditLogEntry::new(
                        EventKind::DeleteComplete,
                        "aggregator",
                        format!("best-effort chunk delete failed for {file_id} chunk {}: {e}", chunk.sequence_index),
                    ))
                    .await;
            }
        }
        self.metadata.delete_file(file_id).await?;
        self.metadata
            .log(AuditLogEntry::new(EventKind::DeleteComplete, "aggregator", format!("delete complete for {file_id}")))
            .await;
        Ok(())
    }
}

// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! `sqlx`-backed Metadata Store (§4.5): the File/Chunk tables plus the
//! append-only audit log sink, against a `SqlitePool` bootstrapped by
//! [`super::schema::connect_with_retry`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use objectvault_domain::entities::{AuditLogEntry, ChunkRecord, FileRecord, OwnerId};
use objectvault_domain::repositories::MetadataStore;
use objectvault_domain::value_objects::{CipherTag, EventKind, FileId};
use objectvault_domain::ObjectVaultError;

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_err(err: sqlx::Error) -> ObjectVaultError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return ObjectVaultError::Storage(format!("duplicate key: {db_err}"));
        }
    }
    ObjectVaultError::Storage(err.to_string())
}

fn event_kind_key(kind: EventKind) -> &'static str {
    match kind {
        EventKind::UploadStart => "upload_start",
        EventKind::UploadComplete => "upload_complete",
        EventKind::UploadFail => "upload_fail",
        EventKind::DownloadStart => "download_start",
        EventKind::DownloadComplete => "download_complete",
        EventKind::DownloadFail => "download_fail",
        EventKind::CrcMismatch => "crc_mismatch",
        EventKind::Rollback => "rollback",
        EventKind::ScaleRequest => "scale_request",
        EventKind::DeleteComplete => "delete_complete",
        EventKind::HealthTransition => "health_transition",
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn begin_upload(&self, file: &FileRecord) -> Result<(), ObjectVaultError> {
        sqlx::query(
            "INSERT INTO files (file_id, display_name, total_length, total_chunks, cipher_tag, owner_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.file_id.to_string())
        .bind(&file.display_name)
        .bind(file.total_length as i64)
        .bind(file.total_chunks as i64)
        .bind(file.cipher_tag.to_string())
        .bind(&file.owner_id.0)
        .bind(file.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn save_chunk(&self, chunk: &ChunkRecord) -> Result<(), ObjectVaultError> {
        sqlx::query(
            "INSERT INTO chunks (file_id, sequence_index, backend_endpoint, remote_path, stored_length, crc32, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(chunk.file_id.to_string())
        .bind(chunk.sequence_index as i64)
        .bind(&chunk.backend_endpoint)
        .bind(&chunk.remote_path)
        .bind(chunk.stored_length as i64)
        .bind(chunk.crc32 as i64)
        .bind(chunk.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_chunks(&self, file_id: FileId) -> Result<Vec<ChunkRecord>, ObjectVaultError> {
        let rows = sqlx::query(
            "SELECT file_id, sequence_index, backend_endpoint, remote_path, stored_length, crc32, created_at
             FROM chunks WHERE file_id = ? ORDER BY sequence_index ASC",
        )
        .bind(file_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at").map_err(map_sqlx_err)?;
                Ok(ChunkRecord {
                    file_id,
                    sequence_index: row.try_get::<i64, _>("sequence_index").map_err(map_sqlx_err)? as u32,
                    backend_endpoint: row.try_get("backend_endpoint").map_err(map_sqlx_err)?,
                    remote_path: row.try_get("remote_path").map_err(map_sqlx_err)?,
                    stored_length: row.try_get::<i64, _>("stored_length").map_err(map_sqlx_err)? as u64,
                    crc32: row.try_get::<i64, _>("crc32").map_err(map_sqlx_err)? as u32,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .collect()
    }

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, ObjectVaultError> {
        let row = sqlx::query(
            "SELECT file_id, display_name, total_length, total_chunks, cipher_tag, owner_id, created_at
             FROM files WHERE file_id = ?",
        )
        .bind(file_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let Some(row) = row else { return Ok(None) };
        let cipher_tag: String = row.try_get("cipher_tag").map_err(map_sqlx_err)?;
        let created_at: String = row.try_get("created_at").map_err(map_sqlx_err)?;
        Ok(Some(FileRecord {
            file_id,
            display_name: row.try_get("display_name").map_err(map_sqlx_err)?,
            total_length: row.try_get::<i64, _>("total_length").map_err(map_sqlx_err)? as u64,
            total_chunks: row.try_get::<i64, _>("total_chunks").map_err(map_sqlx_err)? as u32,
            cipher_tag: CipherTag::parse(&cipher_tag)?,
            owner_id: OwnerId(row.try_get("owner_id").map_err(map_sqlx_err)?),
            created_at: parse_timestamp(&created_at),
        }))
    }

    async fn exists(&self, file_id: FileId) -> Result<bool, ObjectVaultError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE file_id = ?")
            .bind(file_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count > 0)
    }

    async fn delete_file(&self, file_id: FileId) -> Result<(), ObjectVaultError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query("DELETE FROM chunks WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        sqlx::query("DELETE FROM files WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn delete_chunk(&self, file_id: FileId, sequence_index: u32) -> Result<(), ObjectVaultError> {
        sqlx::query("DELETE FROM chunks WHERE file_id = ? AND sequence_index = ?")
            .bind(file_id.to_string())
            .bind(sequence_index as i64)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn log(&self, entry: AuditLogEntry) {
        let result = sqlx::query(
            "INSERT INTO audit_log (event_kind, owner_id, description, severity, component, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event_kind_key(entry.event_kind))
        .bind(&entry.owner_id)
        .bind(&entry.description)
        .bind(entry.severity.to_string())
        .bind(&entry.component)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "audit log write failed, dropping entry");
        }
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectvault_domain::entities::FileRecord;
    use objectvault_domain::value_objects::FileId;

    async fn store() -> SqliteMetadataStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteMetadataStore::new(pool)
    }

    #[tokio::test]
    async fn upload_then_list_chunks_round_trips() {
        let store = store().await;
        let file_id = FileId::generate();
        let file = FileRecord::new(
            file_id,
            "a.bin".into(),
            2_097_152,
            2,
            CipherTag::Aes256Gcm,
            OwnerId("alice".into()),
        );
        store.begin_upload(&file).await.unwrap();
        assert!(store.exists(file_id).await.unwrap());

        let chunk0 = ChunkRecord::new(file_id, 0, "b1".into(), "/vault/f/chunk_0.enc".into(), 1024, 111);
        let chunk1 = ChunkRecord::new(file_id, 1, "b2".into(), "/vault/f/chunk_1.enc".into(), 1024, 222);
        store.save_chunk(&chunk0).await.unwrap();
        store.save_chunk(&chunk1).await.unwrap();

        let chunks = store.list_chunks(file_id).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[1].sequence_index, 1);
    }

    #[tokio::test]
    async fn delete_file_cascades_to_chunks() {
        let store = store().await;
        let file_id = FileId::generate();
        let file = FileRecord::new(file_id, "a.bin".into(), 10, 1, CipherTag::Aes256Gcm, OwnerId("bob".into()));
        store.begin_upload(&file).await.unwrap();
        store
            .save_chunk(&ChunkRecord::new(file_id, 0, "b1".into(), "/p".into(), 10, 1))
            .await
            .unwrap();

        store.delete_file(file_id).await.unwrap();
        assert!(!store.exists(file_id).await.unwrap());
        assert!(store.list_chunks(file_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_file_id_is_rejected() {
        let store = store().await;
        let file_id = FileId::generate();
        let file = FileRecord::new(file_id, "a.bin".into(), 10, 1, CipherTag::Aes256Gcm, OwnerId("bob".into()));
        store.begin_upload(&file).await.unwrap();
        assert!(store.begin_upload(&file).await.is_err());
    }
}

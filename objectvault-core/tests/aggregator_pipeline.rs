// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end exercise of the Aggregator pipeline against an in-memory
//! backend and a real sqlite metadata store, covering round-trip
//! integrity, rollback completeness, and CRC sensitivity (§10).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use objectvault_bootstrap::CancellationToken;
use objectvault_core::application::aggregator_pipeline::{AggregatorPipeline, UploadRequest};
use objectvault_core::infrastructure::backend::BackendPool;
use objectvault_core::infrastructure::crypto::AesGcmEngine;
use objectvault_core::infrastructure::integrity::Crc32Engine;
use objectvault_core::infrastructure::metadata::SqliteMetadataStore;
use objectvault_core::infrastructure::metrics::Metrics;
use objectvault_domain::entities::FileRecord;
use objectvault_domain::repositories::MetadataStore;
use objectvault_domain::services::ChunkBackendClient;
use objectvault_domain::value_objects::CipherTag;
use objectvault_domain::ObjectVaultError;

/// Stores chunk payloads in memory, keyed by `(endpoint, remote_path)`.
/// `fail_after` makes the nth `put` call onward fail, to exercise
/// rollback without a real network fault.
struct InMemoryBackend {
    store: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_after: Option<usize>,
    put_calls: Mutex<usize>,
}

impl InMemoryBackend {
    fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            fail_after: None,
            put_calls: Mutex::new(0),
        }
    }

    fn failing_after(calls: usize) -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            fail_after: Some(calls),
            put_calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ChunkBackendClient for InMemoryBackend {
    async fn put(&self, endpoint: &str, remote_path: &str, bytes: &[u8]) -> Result<(), ObjectVaultError> {
        let mut calls = self.put_calls.lock();
        *calls += 1;
        if let Some(threshold) = self.fail_after {
            if *calls > threshold {
                return Err(ObjectVaultError::Transport("simulated backend outage".into()));
            }
        }
        self.store.lock().insert((endpoint.to_string(), remote_path.to_string()), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, endpoint: &str, remote_path: &str) -> Result<Vec<u8>, ObjectVaultError> {
        self.store
            .lock()
            .get(&(endpoint.to_string(), remote_path.to_string()))
            .cloned()
            .ok_or_else(|| ObjectVaultError::NotFound(format!("no chunk at {endpoint}{remote_path}")))
    }

    async fn delete(&self, endpoint: &str, remote_path: &str) -> Result<(), ObjectVaultError> {
        self.store.lock().remove(&(endpoint.to_string(), remote_path.to_string()));
        Ok(())
    }
}

/// A backend whose `put` blocks indefinitely after signalling that it has
/// been entered, so a test can cancel the upload while a chunk write is
/// genuinely in flight rather than racing against a fast in-memory call.
struct BlockingBackend {
    entered: Notify,
}

impl BlockingBackend {
    fn new() -> Self {
        Self { entered: Notify::new() }
    }
}

#[async_trait]
impl ChunkBackendClient for BlockingBackend {
    async fn put(&self, _endpoint: &str, _remote_path: &str, _bytes: &[u8]) -> Result<(), ObjectVaultError> {
        self.entered.notify_one();
        std::future::pending::<()>().await;
        unreachable!("cancellation must win the select before this ever resolves")
    }

    async fn get(&self, _endpoint: &str, _remote_path: &str) -> Result<Vec<u8>, ObjectVaultError> {
        Err(ObjectVaultError::NotFound("BlockingBackend has no stored chunks".into()))
    }

    async fn delete(&self, _endpoint: &str, _remote_path: &str) -> Result<(), ObjectVaultError> {
        Ok(())
    }
}

async fn memory_metadata_store() -> Arc<dyn MetadataStore> {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Arc::new(SqliteMetadataStore::new(pool))
}

fn test_key() -> [u8; 32] {
    [7u8; 32]
}

fn pipeline(backend: Arc<dyn ChunkBackendClient>, metadata: Arc<dyn MetadataStore>, chunk_size: u64) -> AggregatorPipeline {
    let crypto = Arc::new(AesGcmEngine::new(&test_key()).unwrap());
    let integrity = Arc::new(Crc32Engine);
    let metrics = Arc::new(Metrics::new());
    let backend_pool = Arc::new(BackendPool::new(vec!["backend-1".into()], 4, metrics.clone()));
    AggregatorPipeline::new(
        metadata,
        crypto,
        integrity,
        backend_pool,
        backend,
        metrics,
        4,
        chunk_size,
        10 * 1024 * 1024,
        "/vault".into(),
    )
}

#[tokio::test]
async fn upload_then_download_round_trips_exactly() {
    let backend = Arc::new(InMemoryBackend::new());
    let metadata = memory_metadata_store().await;
    let pipeline = pipeline(backend, metadata, 64);

    let payload: Vec<u8> = (0..500).map(|i| (i % 251) as u8).collect();
    let file = pipeline
        .upload(UploadRequest {
            display_name: "roundtrip.bin".into(),
            owner: "alice".into(),
            cipher_tag: CipherTag::Aes256Gcm,
            client_file_id: None,
            bytes: payload.clone(),
        }, CancellationToken::new())
        .await
        .unwrap();

    let downloaded = pipeline.download(file.file_id, CipherTag::Aes256Gcm).await.unwrap();
    assert_eq!(downloaded, payload);
}

#[tokio::test]
async fn failed_chunk_upload_rolls_back_every_prior_chunk_and_the_file_record() {
    // Large enough payload to span several chunks before the backend starts failing.
    let backend = Arc::new(InMemoryBackend::failing_after(2));
    let metadata = memory_metadata_store().await;
    let pipeline = pipeline(backend, metadata.clone(), 16);

    let file_id = objectvault_domain::value_objects::FileId::generate();
    let result = pipeline
        .upload(UploadRequest {
            display_name: "rollback.bin".into(),
            owner: "bob".into(),
            cipher_tag: CipherTag::Aes256Gcm,
            client_file_id: Some(file_id.to_string()),
            bytes: vec![0xABu8; 200],
        }, CancellationToken::new())
        .await;

    result.expect_err("upload must fail once the backend starts rejecting writes");

    let survived: Option<FileRecord> = metadata.get_file(file_id).await.unwrap();
    assert!(survived.is_none(), "rollback must delete the file record on a failed upload");
    assert!(
        metadata.list_chunks(file_id).await.unwrap().is_empty(),
        "rollback must delete every chunk record on a failed upload"
    );
}

#[tokio::test]
async fn tampered_ciphertext_is_rejected_on_download() {
    let backend = Arc::new(InMemoryBackend::new());
    let metadata = memory_metadata_store().await;
    let pipeline = pipeline(backend.clone(), metadata, 1024);

    let file = pipeline
        .upload(UploadRequest {
            display_name: "tamper.bin".into(),
            owner: "carol".into(),
            cipher_tag: CipherTag::Aes256Gcm,
            client_file_id: None,
            bytes: vec![1, 2, 3, 4, 5],
        }, CancellationToken::new())
        .await
        .unwrap();

    // Flip a byte directly in the backend's store to simulate corruption in transit/at rest.
    {
        let mut store = backend.store.lock();
        let (_key, bytes) = store.iter_mut().next().expect("one chunk was stored");
        bytes[0] ^= 0xFF;
    }

    let result = pipeline.download(file.file_id, CipherTag::Aes256Gcm).await;
    assert!(matches!(result, Err(ObjectVaultError::Integrity(_))));
}

#[tokio::test]
async fn cancelling_mid_upload_leaves_no_partial_record() {
    let backend = Arc::new(BlockingBackend::new());
    let metadata = memory_metadata_store().await;
    let pipeline = Arc::new(pipeline(backend.clone(), metadata.clone(), 16));
    let cancel = CancellationToken::new();

    let file_id = objectvault_domain::value_objects::FileId::generate();
    let task = {
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            pipeline
                .upload(
                    UploadRequest {
                        display_name: "cancel.bin".into(),
                        owner: "dave".into(),
                        cipher_tag: CipherTag::Aes256Gcm,
                        client_file_id: Some(file_id.to_string()),
                        bytes: vec![0x11u8; 200],
                    },
                    cancel,
                )
                .await
        })
    };

    // Wait until the first chunk's backend write is genuinely in flight
    // before cancelling, so this exercises the mid-stream path rather
    // than the permit-acquisition one.
    backend.entered.notified().await;
    cancel.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(ObjectVaultError::Cancelled(_))), "cancelled upload must fail with Cancelled");

    let survived: Option<FileRecord> = metadata.get_file(file_id).await.unwrap();
    assert!(survived.is_none(), "cancellation must leave no partial file record");
    assert!(
        metadata.list_chunks(file_id).await.unwrap().is_empty(),
        "cancellation must leave no partial chunk records"
    );
}

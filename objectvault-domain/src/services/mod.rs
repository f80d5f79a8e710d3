//! Domain service ports (§4.1, §4.3, §4.4). Infrastructure supplies the
//! concrete adapters; the aggregator pipeline depends only on these
//! traits, following the teacher's "no back-references" construction
//! pattern (§9 Design Notes).

mod chunk_backend_client;
mod crypto_engine;
mod integrity_engine;

pub use chunk_backend_client::{chunk_remote_path, ChunkBackendClient};
pub use crypto_engine::CryptoEngine;
pub use integrity_engine::IntegrityEngine;

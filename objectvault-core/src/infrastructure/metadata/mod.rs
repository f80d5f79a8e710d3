mod schema;
mod sqlite_store;

pub use schema::{connect_with_retry, MetadataStoreConfig};
pub use sqlite_store::SqliteMetadataStore;

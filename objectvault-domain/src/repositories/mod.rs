mod metadata_store;

pub use metadata_store::MetadataStore;

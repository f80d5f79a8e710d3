mod aes_gcm_engine;

pub use aes_gcm_engine::AesGcmEngine;

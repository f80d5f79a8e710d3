mod crc32_engine;

pub use crc32_engine::Crc32Engine;

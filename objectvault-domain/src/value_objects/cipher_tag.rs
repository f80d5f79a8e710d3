//! Identifies which authenticated cipher a file was encrypted with.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ObjectVaultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CipherTag {
    #[default]
    Aes256Gcm,
}

impl CipherTag {
    pub fn parse(raw: &str) -> Result<Self, ObjectVaultError> {
        match raw {
            "AES256GCM" | "aes-256-gcm" | "aes256gcm" => Ok(Self::Aes256Gcm),
            other => Err(ObjectVaultError::validation(
                "cipher_tag",
                format!("unknown cipher tag '{other}'"),
            )),
        }
    }
}

impl fmt::Display for CipherTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes256Gcm => write!(f, "AES256GCM"),
        }
    }
}


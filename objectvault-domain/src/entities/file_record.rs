// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! File Record: the row persisted per uploaded object (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{CipherTag, FileId};

/// Identifies the account a file was uploaded under. Resolved from an
/// opaque username at the API boundary; the domain never interprets it
/// beyond tagging ownership (per the explicit non-goal on
/// authentication/authorization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: FileId,
    pub display_name: String,
    pub total_length: u64,
    pub total_chunks: u32,
    pub cipher_tag: CipherTag,
    pub owner_id: OwnerId,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        file_id: FileId,
        display_name: String,
        total_length: u64,
        total_chunks: u32,
        cipher_tag: CipherTag,
        owner_id: OwnerId,
    ) -> Self {
        Self {
            file_id,
            display_name,
            total_length,
            total_chunks,
            cipher_tag,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

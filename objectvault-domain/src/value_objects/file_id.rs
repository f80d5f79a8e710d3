// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # File Identifier
//!
//! `FileId` wraps a 128-bit UUID and is the primary key shared by the File
//! Record and its Chunk Records. Its canonical string form is exactly the
//! 36-character value the SQL schema's primary key column expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ObjectVaultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Generates a fresh, random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a client-supplied id, rejecting anything that isn't a
    /// well-formed UUID rather than silently falling back to `generate`.
    pub fn parse(raw: &str) -> Result<Self, ObjectVaultError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| ObjectVaultError::validation("file_id", format!("invalid file id: {e}")))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = ObjectVaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for FileId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_36_chars() {
        assert_eq!(FileId::generate().to_string().len(), 36);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(FileId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn parse_roundtrips_through_display() {
        let id = FileId::generate();
        assert_eq!(FileId::parse(&id.to_string()).unwrap(), id);
    }

    proptest::proptest! {
        /// `parse` must reject or accept every arbitrary string without
        /// panicking - it sits directly on the upload path's client-supplied
        /// id (aggregator_pipeline::upload), which must never crash on
        /// malformed input.
        #[test]
        fn parse_never_panics_on_arbitrary_input(raw: String) {
            let _ = FileId::parse(&raw);
        }
    }
}

//! Audit Log Entry: append-only business event record (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{EventKind, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub event_kind: EventKind,
    pub owner_id: Option<String>,
    pub description: String,
    pub severity: Severity,
    pub component: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(event_kind: EventKind, component: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            event_kind,
            owner_id: None,
            description: description.into(),
            severity: Severity::Info,
            component: component.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

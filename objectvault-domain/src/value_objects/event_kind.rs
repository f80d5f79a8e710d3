//! Audit log event kinds, per §3 "Audit Log Entry".

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UploadStart,
    UploadComplete,
    UploadFail,
    DownloadStart,
    DownloadComplete,
    DownloadFail,
    CrcMismatch,
    Rollback,
    ScaleRequest,
    DeleteComplete,
    HealthTransition,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UploadStart => "UPLOAD_START",
            Self::UploadComplete => "UPLOAD_COMPLETE",
            Self::UploadFail => "UPLOAD_FAIL",
            Self::DownloadStart => "DOWNLOAD_START",
            Self::DownloadComplete => "DOWNLOAD_COMPLETE",
            Self::DownloadFail => "DOWNLOAD_FAIL",
            Self::CrcMismatch => "CRC_MISMATCH",
            Self::Rollback => "ROLLBACK",
            Self::ScaleRequest => "SCALE_REQUEST",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::HealthTransition => "HEALTH_TRANSITION",
        };
        write!(f, "{s}")
    }
}

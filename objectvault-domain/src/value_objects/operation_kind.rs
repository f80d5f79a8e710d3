use serde::{Deserialize, Serialize};

/// What an in-memory Request represents, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Upload,
    Download,
}

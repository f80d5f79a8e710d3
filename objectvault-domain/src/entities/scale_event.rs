//! Scale Event: transient publish-only signal from the load balancer to
//! the host controller (§3, §4.13).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleAction {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleEvent {
    pub action: ScaleAction,
    pub requested_count: usize,
    pub queue_size: usize,
    pub emitted_at: DateTime<Utc>,
}

impl ScaleEvent {
    pub fn new(action: ScaleAction, requested_count: usize, queue_size: usize) -> Self {
        Self {
            action,
            requested_count,
            queue_size,
            emitted_at: Utc::now(),
        }
    }
}

//! In-memory Request (§3) and its state machine (§4, "State machines").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{OperationKind, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Enqueued,
    Dequeued,
    Scheduled,
    InFlight,
    Completed,
    Failed,
}

impl RequestState {
    /// Cancellation may transition any pre-`InFlight` state directly to
    /// `Failed`; once in flight the request must run to completion.
    pub fn can_cancel(&self) -> bool {
        !matches!(self, Self::InFlight | Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub operation: OperationKind,
    pub size_bytes: u64,
    pub arrived_at: DateTime<Utc>,
    pub state: RequestState,
}

impl Request {
    pub fn new(operation: OperationKind, size_bytes: u64) -> Self {
        Self {
            id: RequestId::generate(),
            operation,
            size_bytes,
            arrived_at: Utc::now(),
            state: RequestState::Enqueued,
        }
    }

    /// `size_mb - age_ms * alpha`: lower scores are dequeued first. Small
    /// requests are preferred (SJN); as a request ages its score keeps
    /// falling, so an old large request eventually outranks any newer
    /// small one (starvation-freedom, §4.9 / property 5).
    pub fn priority_score(&self, alpha: f64, now: DateTime<Utc>) -> f64 {
        let size_mb = self.size_bytes as f64 / (1024.0 * 1024.0);
        let age_ms = (now - self.arrived_at).num_milliseconds().max(0) as f64;
        size_mb - age_ms * alpha
    }

    pub fn cancel(&mut self) -> bool {
        if self.state.can_cancel() {
            self.state = RequestState::Failed;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn aging_lowers_score_over_time() {
        let req = Request::new(OperationKind::Upload, 1_000 * 1024 * 1024);
        let now = req.arrived_at;
        let later = now + Duration::milliseconds(200_000);
        assert!(req.priority_score(0.01, later) < req.priority_score(0.01, now));
    }

    #[test]
    fn cannot_cancel_in_flight() {
        let mut req = Request::new(OperationKind::Download, 10);
        req.state = RequestState::InFlight;
        assert!(!req.cancel());
    }

    proptest::proptest! {
        /// For any non-negative aging coefficient, a request's score never
        /// rises as it gets older - this is the invariant starvation-freedom
        /// (property 5) leans on.
        #[test]
        fn score_never_increases_with_age(size_bytes: u64, alpha in 0.0f64..1.0, age_ms in 0i64..1_000_000) {
            let req = Request::new(OperationKind::Upload, size_bytes);
            let now = req.arrived_at;
            let later = now + Duration::milliseconds(age_ms);
            proptest::prop_assert!(req.priority_score(alpha, later) <= req.priority_score(alpha, now));
        }
    }
}

// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Request Queue (§4.9): a SJN-plus-aging priority queue built as a
//! monitor - a `parking_lot::Mutex`-guarded `BinaryHeap` signalled by a
//! `parking_lot::Condvar` - matching the mutex + methods "small actor"
//! shape Design Notes §9 calls for instead of raw shared mutable state.
//!
//! Score is recomputed at comparison time rather than stored, so an
//! item's position in the heap reflects its current age every time the
//! heap reorders - this is what makes aging actually age.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Condvar, Mutex};

use objectvault_domain::entities::Request;

use super::super::scheduler::SchedulerPolicy;

const DEFAULT_AGING_COEFFICIENT: f64 = 0.01;

struct ScoredRequest {
    request: Request,
    alpha: f64,
    /// Under FCFS the queue orders purely by arrival (§4.11); every other
    /// policy keeps the SJN-plus-aging order (§4.9) and leaves policy to
    /// affect node selection only.
    fcfs: bool,
}

impl ScoredRequest {
    fn score(&self) -> f64 {
        self.request.priority_score(self.alpha, Utc::now())
    }
}

impl PartialEq for ScoredRequest {
    fn eq(&self, other: &Self) -> bool {
        self.request.id == other.request.id
    }
}
impl Eq for ScoredRequest {}

impl PartialOrd for ScoredRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredRequest {
    /// Lower score (or, under FCFS, earlier arrival) sorts "greater" so
    /// that `BinaryHeap` pops the earliest-due request first. Ties break
    /// on arrival time, oldest first.
    fn cmp(&self, other: &Self) -> Ordering {
        if self.fcfs {
            return other.request.arrived_at.cmp(&self.request.arrived_at);
        }
        match other.score().partial_cmp(&self.score()) {
            Some(Ordering::Equal) | None => other.request.arrived_at.cmp(&self.request.arrived_at),
            Some(ordering) => ordering,
        }
    }
}

pub struct RequestQueue {
    alpha: f64,
    fcfs: bool,
    state: Mutex<BinaryHeap<ScoredRequest>>,
    condvar: Condvar,
}

impl RequestQueue {
    pub fn new(alpha: f64, policy: SchedulerPolicy) -> Self {
        Self {
            alpha,
            fcfs: policy == SchedulerPolicy::Fcfs,
            state: Mutex::new(BinaryHeap::new()),
            condvar: Condvar::new(),
        }
    }

    /// Non-blocking. Wakes one blocked `dequeue` caller.
    pub fn enqueue(&self, request: Request) {
        let mut heap = self.state.lock();
        heap.push(ScoredRequest {
            request,
            alpha: self.alpha,
            fcfs: self.fcfs,
        });
        self.condvar.notify_one();
    }

    /// Blocks until an item is available. Re-checks the heap after each
    /// wake since `notify_new` may be a spurious or unrelated wakeup.
    pub fn dequeue(&self) -> Request {
        let mut heap = self.state.lock();
        loop {
            if let Some(scored) = heap.pop() {
                return scored.request;
            }
            self.condvar.wait(&mut heap);
        }
    }

    /// Like `dequeue` but gives up after `timeout`, for cooperative
    /// cancellation of a blocked worker loop.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Request> {
        let mut heap = self.state.lock();
        if let Some(scored) = heap.pop() {
            return Some(scored.request);
        }
        let result = self.condvar.wait_for(&mut heap, timeout);
        if result.timed_out() {
            return None;
        }
        heap.pop().map(|s| s.request)
    }

    /// Wakes every blocked `dequeue` caller without enqueueing anything -
    /// used after a registry/config change that might let a waiter make
    /// progress.
    pub fn notify_new(&self) {
        self.condvar.notify_all();
    }

    pub fn size(&self) -> usize {
        self.state.lock().len()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(DEFAULT_AGING_COEFFICIENT, SchedulerPolicy::Sjn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectvault_domain::value_objects::OperationKind;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn small_request_preferred_over_big_when_fresh() {
        let queue = RequestQueue::new(0.01, SchedulerPolicy::Sjn);
        queue.enqueue(Request::new(OperationKind::Upload, 1000 * 1024 * 1024));
        queue.enqueue(Request::new(OperationKind::Upload, 1024 * 1024));
        let first = queue.dequeue();
        assert_eq!(first.size_bytes, 1024 * 1024);
    }

    #[test]
    fn aging_eventually_favors_the_old_big_request() {
        let queue = RequestQueue::new(0.01, SchedulerPolicy::Sjn);
        let mut big = Request::new(OperationKind::Upload, 1000 * 1024 * 1024);
        big.arrived_at = Utc::now() - chrono::Duration::milliseconds(200_000);
        queue.enqueue(big.clone());
        queue.enqueue(Request::new(OperationKind::Upload, 1024 * 1024));
        let first = queue.dequeue();
        assert_eq!(first.id, big.id);
    }

    #[test]
    fn dequeue_blocks_until_enqueue_wakes_it() {
        let queue = Arc::new(RequestQueue::new(0.01, SchedulerPolicy::Sjn));
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.enqueue(Request::new(OperationKind::Download, 10));
        });
        let request = queue.dequeue();
        assert_eq!(request.operation, OperationKind::Download);
        handle.join().unwrap();
    }

    #[test]
    fn dequeue_timeout_returns_none_when_empty() {
        let queue = RequestQueue::new(0.01, SchedulerPolicy::Sjn);
        assert!(queue.dequeue_timeout(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn fcfs_ignores_size_and_orders_purely_by_arrival() {
        let queue = RequestQueue::new(0.01, SchedulerPolicy::Fcfs);
        let big_first = Request::new(OperationKind::Upload, 1000 * 1024 * 1024);
        let big_first_id = big_first.id;
        queue.enqueue(big_first);
        queue.enqueue(Request::new(OperationKind::Upload, 1024));
        let first = queue.dequeue();
        assert_eq!(first.id, big_first_id, "FCFS must ignore size and pop in arrival order");
    }
}

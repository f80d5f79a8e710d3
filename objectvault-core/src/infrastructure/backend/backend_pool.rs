// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Backend Pool (§4.2): round-robin endpoint selection plus per-endpoint
//! mutual-exclusion permits, mirroring the `parking_lot`-guarded shared
//! state the teacher's resource manager uses for its own token pools.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};

use objectvault_domain::ObjectVaultError;

use super::super::metrics::Metrics;

pub struct BackendPool {
    endpoints: Vec<String>,
    cursor: Mutex<usize>,
    permits: HashMap<String, Arc<Semaphore>>,
    metrics: Arc<Metrics>,
}

impl BackendPool {
    pub fn new(endpoints: Vec<String>, permit_count_per_backend: usize, metrics: Arc<Metrics>) -> Self {
        let permits = endpoints
            .iter()
            .map(|e| (e.clone(), Arc::new(Semaphore::new(permit_count_per_backend))))
            .collect();
        Self {
            endpoints,
            cursor: Mutex::new(0),
            permits,
            metrics,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Round-robin, wrapping, thread-safe next endpoint.
    pub fn next(&self) -> Result<String, ObjectVaultError> {
        if self.endpoints.is_empty() {
            return Err(ObjectVaultError::Resource("backend pool has no endpoints".into()));
        }
        let mut cursor = self.cursor.lock();
        let endpoint = self.endpoints[*cursor % self.endpoints.len()].clone();
        *cursor = cursor.wrapping_add(1);
        Ok(endpoint)
    }

    /// Acquires the endpoint's permit, runs `f`, and releases the permit
    /// on every exit path - including panics, since `SemaphorePermit`'s
    /// `Drop` runs regardless of how the async block unwinds.
    pub async fn with_permit<F, Fut, T>(&self, endpoint: &str, f: F) -> Result<T, ObjectVaultError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ObjectVaultError>>,
    {
        let semaphore = self
            .permits
            .get(endpoint)
            .ok_or_else(|| ObjectVaultError::Resource(format!("unknown backend endpoint {endpoint}")))?
            .clone();
        let timer = self.metrics.backend_permit_wait_seconds.start_timer();
        let _permit: SemaphorePermit<'_> = semaphore
            .acquire()
            .await
            .map_err(|_| ObjectVaultError::Cancelled("permit acquisition interrupted".into()))?;
        timer.observe_duration();
        f().await
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_wraps() {
        let pool = BackendPool::new(vec!["b1".into(), "b2".into(), "b3".into()], 1, Arc::new(Metrics::new()));
        let picks: Vec<_> = (0..5).map(|_| pool.next().unwrap()).collect();
        assert_eq!(picks, vec!["b1", "b2", "b3", "b1", "b2"]);
    }

    #[tokio::test]
    async fn permit_serializes_access_to_one_backend() {
        let pool = Arc::new(BackendPool::new(vec!["b1".into()], 1, Arc::new(Metrics::new())));
        let active = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let max_seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                pool.with_permit("b1", || async {
                    let now = active.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, std::sync::atomic::Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    active.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                    Ok::<_, ObjectVaultError>(())
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

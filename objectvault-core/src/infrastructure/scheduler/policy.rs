// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Scheduler Policies (§4.11): a strategy value rather than a trait
//! hierarchy, per Design Notes §9 - all three policies share one
//! signature, so a tag plus a single `select` method is enough.
//!
//! SJN ordering already lives in the Request Queue (§4.9); at the node
//! layer all three policies select cyclically, which is the "coherent
//! intent" Design Notes §9's Open Questions resolve the source's
//! divergent variants to.

use std::sync::atomic::{AtomicUsize, Ordering};

use objectvault_domain::entities::StorageNode;
use objectvault_domain::ObjectVaultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPolicy {
    Fcfs,
    Sjn,
    RoundRobin,
}

impl SchedulerPolicy {
    pub fn parse(raw: &str) -> Result<Self, ObjectVaultError> {
        match raw.to_ascii_uppercase().as_str() {
            "FCFS" => Ok(Self::Fcfs),
            "SJN" => Ok(Self::Sjn),
            "ROUNDROBIN" | "ROUND_ROBIN" => Ok(Self::RoundRobin),
            other => Err(ObjectVaultError::validation(
                "scheduler_policy",
                format!("unknown scheduler policy '{other}'"),
            )),
        }
    }

    /// Selects exactly one node from the healthy snapshot, cyclically
    /// advancing `cursor` so repeated calls visit the set round-robin
    /// regardless of which policy is configured (§4.11).
    pub fn select(&self, healthy: &[StorageNode], cursor: &AtomicUsize) -> Result<StorageNode, ObjectVaultError> {
        if healthy.is_empty() {
            return Err(ObjectVaultError::NoHealthyNodes);
        }
        let index = cursor.fetch_add(1, Ordering::Relaxed) % healthy.len();
        Ok(healthy[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> StorageNode {
        let mut n = StorageNode::new(name, format!("sftp://{name}"), 1);
        n.record_probe_success();
        n
    }

    #[test]
    fn parses_configured_policy_names() {
        assert_eq!(SchedulerPolicy::parse("fcfs").unwrap(), SchedulerPolicy::Fcfs);
        assert_eq!(SchedulerPolicy::parse("SJN").unwrap(), SchedulerPolicy::Sjn);
        assert_eq!(SchedulerPolicy::parse("roundrobin").unwrap(), SchedulerPolicy::RoundRobin);
        assert!(SchedulerPolicy::parse("bogus").is_err());
    }

    #[test]
    fn selection_is_fair_over_many_rounds() {
        let nodes = vec![node("b1"), node("b2"), node("b3")];
        let cursor = AtomicUsize::new(0);
        let policy = SchedulerPolicy::RoundRobin;
        let mut counts = [0usize; 3];
        for _ in 0..300 {
            let picked = policy.select(&nodes, &cursor).unwrap();
            let idx = nodes.iter().position(|n| n.endpoint == picked.endpoint).unwrap();
            counts[idx] += 1;
        }
        assert!(counts.iter().all(|&c| c == 100));
    }

    #[test]
    fn no_healthy_nodes_fails() {
        let cursor = AtomicUsize::new(0);
        assert!(SchedulerPolicy::Fcfs.select(&[], &cursor).is_err());
    }
}

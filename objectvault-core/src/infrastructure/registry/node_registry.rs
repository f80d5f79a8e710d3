// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Node Registry (§4.10): a readers-writer lock over the live Storage
//! Node set. Registration and de-registration are dynamic so backends
//! the Host Controller starts are picked up without a restart.

use parking_lot::RwLock;

use objectvault_domain::entities::StorageNode;

pub struct NodeRegistry {
    nodes: RwLock<Vec<StorageNode>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, node: StorageNode) {
        let mut nodes = self.nodes.write();
        if !nodes.iter().any(|n| n.endpoint == node.endpoint) {
            nodes.push(node);
        }
    }

    pub fn unregister(&self, endpoint: &str) {
        self.nodes.write().retain(|n| n.endpoint != endpoint);
    }

    pub fn all(&self) -> Vec<StorageNode> {
        self.nodes.read().clone()
    }

    pub fn healthy(&self) -> Vec<StorageNode> {
        self.nodes.read().iter().filter(|n| n.is_healthy()).cloned().collect()
    }

    /// Applies `f` to the node matching `endpoint` under the write lock,
    /// returning whether a matching node was found.
    pub fn with_node_mut(&self, endpoint: &str, f: impl FnOnce(&mut StorageNode)) -> bool {
        let mut nodes = self.nodes.write();
        match nodes.iter_mut().find(|n| n.endpoint == endpoint) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_by_endpoint() {
        let registry = NodeRegistry::new();
        registry.register(StorageNode::new("b1", "sftp://b1", 1));
        registry.register(StorageNode::new("b1-dup", "sftp://b1", 1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn healthy_snapshot_excludes_unhealthy_nodes() {
        let registry = NodeRegistry::new();
        registry.register(StorageNode::new("b1", "sftp://b1", 1));
        registry.register(StorageNode::new("b2", "sftp://b2", 1));
        registry.with_node_mut("sftp://b1", |n| n.record_probe_success());
        registry.with_node_mut("sftp://b2", |n| {
            n.record_probe_failure(1);
        });
        let healthy = registry.healthy();
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].endpoint, "sftp://b1");
    }

    #[test]
    fn unregister_removes_node() {
        let registry = NodeRegistry::new();
        registry.register(StorageNode::new("b1", "sftp://b1", 1));
        registry.unregister("sftp://b1");
        assert!(registry.is_empty());
    }
}

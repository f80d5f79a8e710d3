mod health_prober;
mod node_registry;

pub use health_prober::{HealthProber, LivenessCheck, TcpLivenessCheck};
pub use node_registry::NodeRegistry;

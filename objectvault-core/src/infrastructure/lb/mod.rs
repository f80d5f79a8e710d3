mod scaling_publisher;
mod worker;

pub use scaling_publisher::{ScalingPublisher, ScalingPublisherConfig};
pub use worker::{LoadBalancerWorker, LoadBalancerWorkerConfig, PendingForward};

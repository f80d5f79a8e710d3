mod mqtt;

pub use mqtt::{MessageBus, ScaleEventSubscription, SCALE_TOPIC};

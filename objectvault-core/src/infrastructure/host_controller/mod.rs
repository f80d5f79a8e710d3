mod controller;
mod executor;

pub use controller::{HostController, HostControllerConfig};
pub use executor::{CommandExecutor, ContainerHandle, ContainerSpec, ContainerState, LocalCliExecutor};

// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Command Executor abstraction (§4.14): `start(spec) -> handle`,
//! `stop(handle)`, `inspect(handle) -> state`. The reference
//! implementation shells out to the local container CLI (`docker` by
//! default, overridable), but the Host Controller depends only on the
//! trait.

use async_trait::async_trait;
use tokio::process::Command;

use objectvault_domain::ObjectVaultError;

#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub network: String,
    pub internal_port: u16,
    pub volume_host_path: String,
    pub volume_container_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    Unknown,
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle, ObjectVaultError>;
    async fn stop(&self, handle: &ContainerHandle) -> Result<(), ObjectVaultError>;
    async fn inspect(&self, handle: &ContainerHandle) -> Result<ContainerState, ObjectVaultError>;
}

pub struct LocalCliExecutor {
    binary: String,
}

impl LocalCliExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for LocalCliExecutor {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl CommandExecutor for LocalCliExecutor {
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle, ObjectVaultError> {
        let port_mapping = format!("{0}:{0}", spec.internal_port);
        let volume_mapping = format!("{}:{}", spec.volume_host_path, spec.volume_container_path);
        let output = Command::new(&self.binary)
            .args([
                "run",
                "-d",
                "--name",
                &spec.name,
                "--network",
                &spec.network,
                "-p",
                &port_mapping,
                "-v",
                &volume_mapping,
                &spec.image,
            ])
            .output()
            .await
            .map_err(|e| ObjectVaultError::Internal(format!("failed to start container: {e}")))?;

        if !output.status.success() {
            return Err(ObjectVaultError::Internal(format!(
                "container start failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(ContainerHandle(if id.is_empty() { spec.name.clone() } else { id }))
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), ObjectVaultError> {
        let output = Command::new(&self.binary)
            .args(["rm", "-f", &handle.0])
            .output()
            .await
            .map_err(|e| ObjectVaultError::Internal(format!("failed to stop container: {e}")))?;
        if !output.status.success() {
            return Err(ObjectVaultError::Internal(format!(
                "container stop failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn inspect(&self, handle: &ContainerHandle) -> Result<ContainerState, ObjectVaultError> {
        let output = Command::new(&self.binary)
            .args(["inspect", "-f", "{{.State.Running}}", &handle.0])
            .output()
            .await
            .map_err(|e| ObjectVaultError::Internal(format!("failed to inspect container: {e}")))?;
        if !output.status.success() {
            return Ok(ContainerState::Unknown);
        }
        match String::from_utf8_lossy(&output.stdout).trim() {
            "true" => Ok(ContainerState::Running),
            "false" => Ok(ContainerState::Stopped),
            _ => Ok(ContainerState::Unknown),
        }
    }
}

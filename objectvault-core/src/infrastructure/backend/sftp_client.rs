// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SFTP-backed Chunk Backend Client (§4.1).
//!
//! Each call opens a fresh authenticated session over `ssh2`'s blocking
//! API, creates the parent directory if it doesn't exist, transfers the
//! bytes, and tears the session down on every exit path - the session is
//! a function-local value, so it drops (and closes its socket) however
//! the call returns. The blocking work runs on Tokio's blocking thread
//! pool so it doesn't stall the async executor.

use std::io::{Read, Write};
use std::net::TcpStream;

use async_trait::async_trait;
use ssh2::Session;

use objectvault_domain::services::ChunkBackendClient;
use objectvault_domain::ObjectVaultError;

#[derive(Debug, Clone)]
pub struct SftpCredentials {
    pub username: String,
    pub password: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct SftpClient {
    credentials: SftpCredentials,
}

impl SftpClient {
    pub fn new(credentials: SftpCredentials) -> Self {
        Self { credentials }
    }

    fn session(&self, endpoint: &str) -> Result<Session, ObjectVaultError> {
        let host = strip_scheme(endpoint);
        let addr = format!("{host}:{}", self.credentials.port);
        let tcp = TcpStream::connect(&addr)
            .map_err(|e| ObjectVaultError::Transport(format!("connect to {addr} failed: {e}")))?;

        let mut session = Session::new()
            .map_err(|e| ObjectVaultError::Transport(format!("session init failed: {e}")))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| ObjectVaultError::Transport(format!("handshake with {addr} failed: {e}")))?;
        session
            .userauth_password(&self.credentials.username, &self.credentials.password)
            .map_err(|e| ObjectVaultError::Transport(format!("authentication to {addr} failed: {e}")))?;
        Ok(session)
    }

    fn ensure_parent_dir(sftp: &ssh2::Sftp, remote_path: &str) -> Result<(), ObjectVaultError> {
        if let Some((parent, _)) = remote_path.rsplit_once('/') {
            if !parent.is_empty() {
                match sftp.mkdir(std::path::Path::new(parent), 0o755) {
                    Ok(()) => {}
                    Err(e) if sftp.stat(std::path::Path::new(parent)).is_ok() => {
                        tracing::trace!(parent, error = %e, "parent directory already existed");
                    }
                    Err(e) => {
                        return Err(ObjectVaultError::Transport(format!(
                            "failed to create parent dir {parent}: {e}"
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

fn strip_scheme(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("sftp://")
        .unwrap_or(endpoint)
        .split(':')
        .next()
        .unwrap_or(endpoint)
}

#[async_trait]
impl ChunkBackendClient for SftpClient {
    async fn put(&self, endpoint: &str, remote_path: &str, bytes: &[u8]) -> Result<(), ObjectVaultError> {
        let this = self.clone();
        let endpoint = endpoint.to_string();
        let remote_path = remote_path.to_string();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let session = this.session(&endpoint)?;
            let sftp = session
                .sftp()
                .map_err(|e| ObjectVaultError::Transport(format!("sftp subsystem init failed: {e}")))?;
            Self::ensure_parent_dir(&sftp, &remote_path)?;
            let mut file = sftp
                .create(std::path::Path::new(&remote_path))
                .map_err(|e| ObjectVaultError::Transport(format!("create {remote_path} failed: {e}")))?;
            file.write_all(&bytes)
                .map_err(|e| ObjectVaultError::Transport(format!("write to {remote_path} failed: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| ObjectVaultError::Internal(format!("blocking task panicked: {e}")))?
    }

    async fn get(&self, endpoint: &str, remote_path: &str) -> Result<Vec<u8>, ObjectVaultError> {
        let this = self.clone();
        let endpoint = endpoint.to_string();
        let remote_path = remote_path.to_string();
        tokio::task::spawn_blocking(move || {
            let session = this.session(&endpoint)?;
            let sftp = session
                .sftp()
                .map_err(|e| ObjectVaultError::Transport(format!("sftp subsystem init failed: {e}")))?;
            let mut file = sftp.open(std::path::Path::new(&remote_path)).map_err(|e| {
                ObjectVaultError::NotFound(format!("remote path {remote_path} not found: {e}"))
            })?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .map_err(|e| ObjectVaultError::Transport(format!("read of {remote_path} failed: {e}")))?;
            Ok(buf)
        })
        .await
        .map_err(|e| ObjectVaultError::Internal(format!("blocking task panicked: {e}")))?
    }

    async fn delete(&self, endpoint: &str, remote_path: &str) -> Result<(), ObjectVaultError> {
        let this = self.clone();
        let endpoint = endpoint.to_string();
        let remote_path = remote_path.to_string();
        tokio::task::spawn_blocking(move || {
            let session = this.session(&endpoint)?;
            let sftp = session
                .sftp()
                .map_err(|e| ObjectVaultError::Transport(format!("sftp subsystem init failed: {e}")))?;
            sftp.unlink(std::path::Path::new(&remote_path)).map_err(|e| {
                ObjectVaultError::NotFound(format!("remote path {remote_path} not found: {e}"))
            })
        })
        .await
        .map_err(|e| ObjectVaultError::Internal(format!("blocking task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_port() {
        assert_eq!(strip_scheme("sftp://backend1.internal:22"), "backend1.internal");
        assert_eq!(strip_scheme("backend1.internal"), "backend1.internal");
    }
}

// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Configuration surface (§6 "Configuration surface"): environment
//! variables layered over defaults via the `config` crate, the same
//! layering pattern the teacher's `infrastructure::config` uses. Missing
//! the encryption key is a hard startup failure.

use std::time::Duration;

use serde::Deserialize;

use objectvault_domain::ObjectVaultError;

fn env_source() -> config::Environment {
    config::Environment::with_prefix("OBJECTVAULT").separator("_")
}

/// Shared settings every daemon reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    /// Hex-encoded 32-byte AES-256-GCM key. Mandatory - the process
    /// refuses to start without it.
    pub encryption_key: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub reset_schema: bool,
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    #[serde(default = "default_startup_retry_attempts")]
    pub startup_retry_attempts: u32,
    #[serde(default = "default_startup_retry_delay_secs")]
    pub startup_retry_delay_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://objectvault.db".into()
}
fn default_mqtt_host() -> String {
    "localhost".into()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_startup_retry_attempts() -> u32 {
    5
}
fn default_startup_retry_delay_secs() -> u64 {
    2
}

impl CommonConfig {
    pub fn load() -> Result<Self, ObjectVaultError> {
        let settings = config::Config::builder()
            .add_source(env_source())
            .build()
            .map_err(|e| ObjectVaultError::Validation {
                field: "configuration".into(),
                message: format!("failed to load configuration: {e}"),
            })?;

        settings
            .try_deserialize::<Self>()
            .map_err(|e| ObjectVaultError::Validation {
                field: "OBJECTVAULT_ENCRYPTION_KEY".into(),
                message: format!("missing or invalid configuration: {e}"),
            })
    }

    pub fn decoded_key(&self) -> Result<Vec<u8>, ObjectVaultError> {
        hex::decode(&self.encryption_key)
            .map_err(|e| ObjectVaultError::Crypto(format!("encryption key is not valid hex: {e}")))
    }

    pub fn startup_retry_delay(&self) -> Duration {
        Duration::from_secs(self.startup_retry_delay_secs)
    }
}

/// Aggregator-specific settings layered on top of `CommonConfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_backend_endpoints")]
    pub backend_endpoints: String,
    #[serde(default = "default_permit_count")]
    pub permit_count_per_backend: usize,
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    #[serde(default = "default_sftp_username")]
    pub sftp_username: String,
    #[serde(default)]
    pub sftp_password: String,
    #[serde(default = "default_sftp_port")]
    pub sftp_port: u16,
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_chunk_size() -> u64 {
    1024 * 1024
}
fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 * 1024
}
fn default_backend_endpoints() -> String {
    String::new()
}
fn default_permit_count() -> usize {
    1
}
fn default_upload_concurrency() -> usize {
    4
}
fn default_sftp_username() -> String {
    "objectvault".into()
}
fn default_sftp_port() -> u16 {
    22
}
fn default_storage_root() -> String {
    "/vault".into()
}
fn default_http_port() -> u16 {
    9090
}

impl AggregatorConfig {
    pub fn load() -> Result<Self, ObjectVaultError> {
        config::Config::builder()
            .add_source(env_source())
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ObjectVaultError::Validation {
                field: "configuration".into(),
                message: format!("failed to load aggregator configuration: {e}"),
            })
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.backend_endpoints
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Load-balancer-specific settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancerConfig {
    #[serde(default = "default_scheduler_policy")]
    pub scheduler_policy: String,
    #[serde(default = "default_http_port_lb")]
    pub http_port: u16,
    #[serde(default = "default_latency_min_ms")]
    pub latency_min_ms: u64,
    #[serde(default = "default_latency_max_ms")]
    pub latency_max_ms: u64,
    #[serde(default = "default_queue_high_watermark")]
    pub queue_high_watermark: usize,
    #[serde(default = "default_queue_low_watermark")]
    pub queue_low_watermark: usize,
    #[serde(default = "default_scale_check_interval_secs")]
    pub scale_check_interval_secs: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_aging_coefficient")]
    pub aging_coefficient: f64,
    #[serde(default = "default_max_backends")]
    pub max_backends: usize,
    #[serde(default = "default_min_backends")]
    pub min_backends: usize,
}

fn default_scheduler_policy() -> String {
    "ROUNDROBIN".into()
}
fn default_http_port_lb() -> u16 {
    8080
}
fn default_latency_min_ms() -> u64 {
    1000
}
fn default_latency_max_ms() -> u64 {
    5000
}
fn default_queue_high_watermark() -> usize {
    80
}
fn default_queue_low_watermark() -> usize {
    10
}
fn default_scale_check_interval_secs() -> u64 {
    10
}
fn default_health_check_interval_secs() -> u64 {
    5
}
fn default_aging_coefficient() -> f64 {
    0.01
}
fn default_max_backends() -> usize {
    5
}
fn default_min_backends() -> usize {
    1
}

impl LoadBalancerConfig {
    pub fn load() -> Result<Self, ObjectVaultError> {
        config::Config::builder()
            .add_source(env_source())
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ObjectVaultError::Validation {
                field: "configuration".into(),
                message: format!("failed to load load-balancer configuration: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_backend_endpoint_list() {
        let config = AggregatorConfig {
            chunk_size_bytes: default_chunk_size(),
            max_file_size_bytes: default_max_file_size(),
            backend_endpoints: " sftp://b1:22 , sftp://b2:22 ,".into(),
            permit_count_per_backend: default_permit_count(),
            upload_concurrency: default_upload_concurrency(),
            sftp_username: default_sftp_username(),
            sftp_password: String::new(),
            sftp_port: default_sftp_port(),
            storage_root: default_storage_root(),
            http_port: default_http_port(),
        };
        assert_eq!(config.endpoints(), vec!["sftp://b1:22", "sftp://b2:22"]);
    }
}

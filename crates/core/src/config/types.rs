use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::job::JobConfig;
use crate::manifest::DEFAULT_SECRET_PREFIX;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub update: UpdateConfig,
    pub sts: StsConfig,
    pub license_server: LicenseServerConfig,
    #[serde(default)]
    pub job: JobConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Where the lock and license files live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,
    #[serde(default = "default_license_dir")]
    pub license_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            license_dir: default_license_dir(),
        }
    }
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("./data/lock")
}

fn default_license_dir() -> PathBuf {
    PathBuf::from("./data/license")
}

/// Values handed to the update agent
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateConfig {
    /// Base URL the agent reports progress to; the lock id is appended as a path segment.
    pub callback_endpoint: String,
    /// Endpoint the agent exchanges its token at for registry credentials.
    pub credential_provider_endpoint: String,
    /// Prefix of generated image pull secret names.
    #[serde(default = "default_secret_prefix")]
    pub secret_prefix: String,
}

fn default_secret_prefix() -> String {
    DEFAULT_SECRET_PREFIX.to_string()
}

/// Security token service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StsConfig {
    pub endpoint: String,
    /// Sent as the `authorization` header
    pub server_api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// License server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LicenseServerConfig {
    /// License URL; `:serverId` is replaced with `server_id`
    pub endpoint: String,
    pub server_id: String,
    pub server_api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub update: UpdateConfig,
    pub sts: SanitizedStsConfig,
    pub license_server: SanitizedLicenseServerConfig,
    pub job: JobConfig,
}

/// Sanitized STS config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStsConfig {
    pub endpoint: String,
    pub server_api_key_configured: bool,
    pub timeout_secs: u64,
}

/// Sanitized license server config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLicenseServerConfig {
    pub endpoint: String,
    pub server_id: String,
    pub server_api_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            update: config.update.clone(),
            sts: SanitizedStsConfig {
                endpoint: config.sts.endpoint.clone(),
                server_api_key_configured: !config.sts.server_api_key.is_empty(),
                timeout_secs: config.sts.timeout_secs,
            },
            license_server: SanitizedLicenseServerConfig {
                endpoint: config.license_server.endpoint.clone(),
                server_id: config.license_server.server_id.clone(),
                server_api_key_configured: !config.license_server.server_api_key.is_empty(),
                timeout_secs: config.license_server.timeout_secs,
            },
            job: config.job.clone(),
        }
    }
}

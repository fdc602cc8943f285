//! The Docker config `auths` map backend. Read-only.

use async_trait::async_trait;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

use crate::CredentialBackend;
use crate::docker_config_file::load;

/// Reads `$DOCKER_CONFIG/config.json` (or `~/.docker/config.json`) `auths`.
#[derive(Debug, Clone, Default)]
pub struct DockerConfigBackend;

impl DockerConfigBackend {
    /// Create a new backend instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialBackend for DockerConfigBackend {
    fn name(&self) -> &'static str {
        "docker-config"
    }

    async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
        let Some(config) = load().await? else {
            return Err(Error::CredentialsNotFound(registry_host.to_string()));
        };
        match config.find_auth(registry_host) {
            Some(record) if !record.is_empty() => Ok(record),
            _ => Err(Error::CredentialsNotFound(registry_host.to_string())),
        }
    }
}

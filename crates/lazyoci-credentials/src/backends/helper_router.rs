//! The per-registry credential-helper router: reads `config.json`'s
//! `credHelpers` map and delegates to whichever helper binary is listed
//! for the requested host.

use async_trait::async_trait;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

use crate::CredentialBackend;
use crate::docker_config_file::load;
use crate::helper_protocol::invoke;

/// Routes a `get` to the per-registry helper named in `credHelpers`.
#[derive(Debug, Clone, Default)]
pub struct HelperRouterBackend;

impl HelperRouterBackend {
    /// Create a new backend instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialBackend for HelperRouterBackend {
    fn name(&self) -> &'static str {
        "cred-helper-router"
    }

    async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
        let Some(config) = load().await? else {
            return Err(Error::CredentialsNotFound(registry_host.to_string()));
        };
        let Some(helper) = config.find_cred_helper(registry_host) else {
            return Err(Error::CredentialsNotFound(registry_host.to_string()));
        };
        invoke(helper, registry_host).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn name_is_stable() {
        assert_eq!(HelperRouterBackend::new().name(), "cred-helper-router");
    }
}

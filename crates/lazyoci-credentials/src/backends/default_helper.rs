//! The default credential-helper backend: `config.json`'s `credsStore`,
//! used when no per-registry override in `credHelpers` matched.

use async_trait::async_trait;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

use crate::CredentialBackend;
use crate::docker_config_file::load;
use crate::helper_protocol::invoke;

/// Delegates to the single helper named by `credsStore`, for any host.
#[derive(Debug, Clone, Default)]
pub struct DefaultHelperBackend;

impl DefaultHelperBackend {
    /// Create a new backend instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialBackend for DefaultHelperBackend {
    fn name(&self) -> &'static str {
        "default-cred-helper"
    }

    async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
        let Some(config) = load().await? else {
            return Err(Error::CredentialsNotFound(registry_host.to_string()));
        };
        let Some(helper) = config.creds_store.as_deref() else {
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
        assert_eq!(DefaultHelperBackend::new().name(), "default-cred-helper");
    }
}

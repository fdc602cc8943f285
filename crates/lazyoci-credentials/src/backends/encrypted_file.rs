//! The encrypted-file backend. Reserved: currently always not-implemented.
//!
//! A first-class chain member, not a placeholder — see
//! [`crate::CredentialBackend`]'s contract for why a stub still
//! participates in the fold rather than being omitted.

use async_trait::async_trait;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

use crate::CredentialBackend;

/// Always returns [`Error::NotImplemented`].
#[derive(Debug, Clone, Default)]
pub struct EncryptedFileBackend;

impl EncryptedFileBackend {
    /// Create a new backend instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialBackend for EncryptedFileBackend {
    fn name(&self) -> &'static str {
        "encrypted-file"
    }

    async fn get(&self, _registry_host: &str) -> Result<CredentialRecord> {
        Err(Error::NotImplemented(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_not_implemented() {
        let err = EncryptedFileBackend::new().get("ghcr.io").await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }
}

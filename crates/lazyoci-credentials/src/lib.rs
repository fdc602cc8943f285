//! A multi-backend credential chain: an ordered list of backends queried
//! in sequence until one answers, modeled as a fold with two
//! "keep going" exits (`credentials-not-found`, `not-implemented`) and one
//! "stop" exit (any other error).
//!
//! Backends are never treated as placeholders: a stub backend is a
//! first-class chain member that signals `not-implemented` rather than
//! being omitted, so the chain's shape stays stable regardless of which
//! backends are actually wired up for a given registry host.

pub mod backends;
mod docker_config_file;
mod helper_protocol;
mod registry_key;

pub use docker_config_file::DockerConfigFile;
pub use registry_key::candidate_keys;

use async_trait::async_trait;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

/// A single credential source queried by the chain.
///
/// Implementors return [`lazyoci_core::Error::CredentialsNotFound`] or
/// [`lazyoci_core::Error::NotImplemented`] to mean "keep trying the next
/// backend"; any other `Err` stops the chain immediately.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// A short, stable name for diagnostics (`"plaintext"`, `"docker-config"`, ...).
    fn name(&self) -> &'static str;

    /// Look up credentials for `registry_host`.
    async fn get(&self, registry_host: &str) -> Result<CredentialRecord>;

    /// Store a credential. Backends that cannot persist credentials return
    /// [`lazyoci_core::Error::NotImplemented`].
    async fn put(&self, registry_host: &str, credential: &CredentialRecord) -> Result<()> {
        let _ = (registry_host, credential);
        Err(lazyoci_core::Error::NotImplemented(self.name().to_string()))
    }

    /// Remove a stored credential, if this backend supports mutation.
    /// A no-op (not an error) when there was nothing to remove.
    async fn erase(&self, registry_host: &str) -> Result<()> {
        let _ = registry_host;
        Ok(())
    }

    /// List every registry host this backend currently holds a credential
    /// for. Backends that cannot enumerate return an empty list.
    async fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// The ordered chain of credential backends.
pub struct CredentialChain {
    backends: Vec<Box<dyn CredentialBackend>>,
}

impl CredentialChain {
    /// Build a chain from an ordered list of backends.
    #[must_use]
    pub fn new(backends: Vec<Box<dyn CredentialBackend>>) -> Self {
        Self { backends }
    }

    /// Build the standard six-backend chain, in the order described in
    /// §4.2: plaintext file, Docker config auths, per-registry helper
    /// router, default helper, OS keychain, encrypted file.
    #[must_use]
    pub fn standard() -> Self {
        let mut chain_backends: Vec<Box<dyn CredentialBackend>> = Vec::new();
        if let Some(path) = backends::PlaintextBackend::default_path() {
            chain_backends.push(Box::new(backends::PlaintextBackend::new(path)));
        }
        chain_backends.push(Box::new(backends::DockerConfigBackend::new()));
        chain_backends.push(Box::new(backends::HelperRouterBackend::new()));
        chain_backends.push(Box::new(backends::DefaultHelperBackend::new()));
        chain_backends.push(Box::new(backends::KeychainBackend::new()));
        chain_backends.push(Box::new(backends::EncryptedFileBackend::new()));
        Self::new(chain_backends)
    }

    /// Query each backend in order, returning the first credential found.
    ///
    /// # Errors
    /// Returns [`lazyoci_core::Error::CredentialsNotFound`] if every
    /// backend returned not-found or not-implemented; otherwise propagates
    /// the first fatal error immediately, without consulting the remaining
    /// backends.
    pub async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
        for backend in &self.backends {
            match backend.get(registry_host).await {
                Ok(credential) => {
                    tracing::debug!(registry = registry_host, backend = backend.name(), "credential found");
                    return Ok(credential);
                }
                Err(e) if e.is_transparent_to_chain() => {
                    tracing::trace!(registry = registry_host, backend = backend.name(), "backend passed");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(lazyoci_core::Error::CredentialsNotFound(registry_host.to_string()))
    }

    /// Store `credential` via the first backend in the chain.
    ///
    /// # Errors
    /// Propagates whatever the first backend's [`CredentialBackend::put`] returns.
    pub async fn put(&self, registry_host: &str, credential: &CredentialRecord) -> Result<()> {
        match self.backends.first() {
            Some(backend) => backend.put(registry_host, credential).await,
            None => Err(lazyoci_core::Error::NotImplemented("empty credential chain".to_string())),
        }
    }

    /// Attempt to erase `registry_host` from every backend, returning the
    /// last non-trivial error encountered, if any.
    ///
    /// # Errors
    /// Returns the last fatal error from any backend's
    /// [`CredentialBackend::erase`]; not-found/not-implemented are ignored.
    pub async fn erase(&self, registry_host: &str) -> Result<()> {
        let mut last_err = None;
        for backend in &self.backends {
            match backend.erase(registry_host).await {
                Ok(()) => {}
                Err(e) if e.is_transparent_to_chain() => {}
                Err(e) => last_err = Some(e),
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    /// The union of every backend's [`CredentialBackend::list`], deduplicated.
    ///
    /// # Errors
    /// This call itself cannot fail; per-backend errors are swallowed, matching
    /// `list`'s role as a best-effort enumeration.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut hosts = std::collections::BTreeSet::new();
        for backend in &self.backends {
            if let Ok(entries) = backend.list().await {
                hosts.extend(entries);
            }
        }
        Ok(hosts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysNotFound;
    #[async_trait]
    impl CredentialBackend for AlwaysNotFound {
        fn name(&self) -> &'static str {
            "always-not-found"
        }
        async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
            Err(lazyoci_core::Error::CredentialsNotFound(registry_host.to_string()))
        }
    }

    struct AlwaysNotImplemented;
    #[async_trait]
    impl CredentialBackend for AlwaysNotImplemented {
        fn name(&self) -> &'static str {
            "always-not-implemented"
        }
        async fn get(&self, _registry_host: &str) -> Result<CredentialRecord> {
            Err(lazyoci_core::Error::NotImplemented(self.name().to_string()))
        }
    }

    struct Fixed(CredentialRecord);
    #[async_trait]
    impl CredentialBackend for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn get(&self, _registry_host: &str) -> Result<CredentialRecord> {
            Ok(self.0.clone())
        }
    }

    struct Poisoned;
    #[async_trait]
    impl CredentialBackend for Poisoned {
        fn name(&self) -> &'static str {
            "poisoned"
        }
        async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
            Err(lazyoci_core::Error::Transport(format!("dns failure for {registry_host}")))
        }
    }

    fn cred(user: &str) -> CredentialRecord {
        CredentialRecord {
            username: Some(user.to_string()),
            password: Some("pw".to_string()),
            refresh_token: None,
            access_token: None,
        }
    }

    #[tokio::test]
    async fn returns_first_success() {
        let chain = CredentialChain::new(vec![
            Box::new(AlwaysNotFound),
            Box::new(Fixed(cred("bob"))),
            Box::new(Poisoned),
        ]);
        let result = chain.get("ghcr.io").await.unwrap();
        assert_eq!(result.username.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn not_implemented_is_transparent_like_not_found() {
        let chain = CredentialChain::new(vec![
            Box::new(AlwaysNotImplemented),
            Box::new(Fixed(cred("carol"))),
        ]);
        let result = chain.get("ghcr.io").await.unwrap();
        assert_eq!(result.username.as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn fatal_error_stops_the_chain() {
        let chain = CredentialChain::new(vec![
            Box::new(Poisoned),
            Box::new(Fixed(cred("should-not-be-reached"))),
        ]);
        let err = chain.get("ghcr.io").await.unwrap_err();
        assert!(matches!(err, lazyoci_core::Error::Transport(_)));
    }

    #[tokio::test]
    async fn all_not_found_yields_credentials_not_found() {
        let chain = CredentialChain::new(vec![
            Box::new(AlwaysNotFound),
            Box::new(AlwaysNotImplemented),
        ]);
        let err = chain.get("ghcr.io").await.unwrap_err();
        assert!(matches!(err, lazyoci_core::Error::CredentialsNotFound(_)));
    }

    #[tokio::test]
    async fn three_backend_scenario_second_backend_wins_third_never_invoked() {
        struct Counting(std::sync::Arc<std::sync::atomic::AtomicUsize>);
        #[async_trait]
        impl CredentialBackend for Counting {
            fn name(&self) -> &'static str {
                "counting"
            }
            async fn get(&self, _registry_host: &str) -> Result<CredentialRecord> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(lazyoci_core::Error::NotImplemented(self.name().to_string()))
            }
        }
        let invocations = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let chain = CredentialChain::new(vec![
            Box::new(AlwaysNotFound),
            Box::new(Fixed(cred("ghcr-user"))),
            Box::new(Counting(invocations.clone())),
        ]);
        let result = chain.get("ghcr.io").await.unwrap();
        assert_eq!(result.username.as_deref(), Some("ghcr-user"));
        assert_eq!(invocations.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}

//! Bridges the credential chain into the shape the wire client needs: a
//! provider keyed by registry host, so two registries reachable in the
//! same mirror or build run can be addressed with two different
//! identities without either leaking into the other.

use async_trait::async_trait;
use oci_distribution::secrets::RegistryAuth;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_credentials::CredentialChain;

/// A source of registry credentials, looked up per-host.
///
/// Implementors never cache across hosts: a provider backing two
/// registries in the same run must resolve each independently.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve the credential to use when talking to `registry_host`.
    ///
    /// # Errors
    /// Returns whatever the backing credential source returns; callers
    /// that want to fall back to anonymous auth on
    /// [`lazyoci_core::Error::CredentialsNotFound`] do so explicitly via
    /// [`resolve_auth`].
    async fn credential_for(&self, registry_host: &str) -> Result<lazyoci_core::model::CredentialRecord>;
}

#[async_trait]
impl CredentialProvider for CredentialChain {
    async fn credential_for(&self, registry_host: &str) -> Result<lazyoci_core::model::CredentialRecord> {
        self.get(registry_host).await
    }
}

/// A provider that never has credentials, for sources a mirror run wants
/// to address without ever consulting the local credential chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousProvider;

#[async_trait]
impl CredentialProvider for AnonymousProvider {
    async fn credential_for(&self, registry_host: &str) -> Result<lazyoci_core::model::CredentialRecord> {
        Err(Error::CredentialsNotFound(registry_host.to_string()))
    }
}

/// Resolve a [`RegistryAuth`] for `registry_host`, falling back to
/// anonymous access when the provider has no credential on file.
///
/// # Errors
/// Propagates any fatal error from the provider (anything other than
/// [`lazyoci_core::Error::CredentialsNotFound`]).
pub async fn resolve_auth(provider: &dyn CredentialProvider, registry_host: &str) -> Result<RegistryAuth> {
    match provider.credential_for(registry_host).await {
        Ok(credential) => Ok(to_registry_auth(&credential)),
        Err(Error::CredentialsNotFound(_)) => Ok(RegistryAuth::Anonymous),
        Err(e) => Err(e),
    }
}

fn to_registry_auth(credential: &lazyoci_core::model::CredentialRecord) -> RegistryAuth {
    if let (Some(username), Some(password)) = (&credential.username, &credential.password) {
        return RegistryAuth::Basic(username.clone(), password.clone());
    }
    if let Some(token) = &credential.access_token {
        return RegistryAuth::Basic(String::new(), token.clone());
    }
    if let Some(token) = &credential.refresh_token {
        return RegistryAuth::Basic(String::new(), token.clone());
    }
    RegistryAuth::Anonymous
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyoci_core::model::CredentialRecord;

    #[tokio::test]
    async fn anonymous_provider_falls_back_to_anonymous_auth() {
        let auth = resolve_auth(&AnonymousProvider, "ghcr.io").await.unwrap();
        assert!(matches!(auth, RegistryAuth::Anonymous));
    }

    #[test]
    fn basic_credential_maps_to_basic_auth() {
        let credential = CredentialRecord {
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
            refresh_token: None,
            access_token: None,
        };
        let auth = to_registry_auth(&credential);
        assert!(matches!(auth, RegistryAuth::Basic(ref u, ref p) if u == "alice" && p == "hunter2"));
    }

    #[test]
    fn access_token_maps_to_basic_auth_with_empty_username() {
        let credential = CredentialRecord {
            username: None,
            password: None,
            refresh_token: None,
            access_token: Some("token123".to_string()),
        };
        let auth = to_registry_auth(&credential);
        assert!(matches!(auth, RegistryAuth::Basic(ref u, ref p) if u.is_empty() && p == "token123"));
    }

    #[test]
    fn empty_credential_maps_to_anonymous() {
        let credential = CredentialRecord {
            username: None,
            password: None,
            refresh_token: None,
            access_token: None,
        };
        assert!(matches!(to_registry_auth(&credential), RegistryAuth::Anonymous));
    }
}

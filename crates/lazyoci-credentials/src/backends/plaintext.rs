//! The plaintext backend: lazyoci's own credential file, a flat list of
//! registries with embedded credentials. The only writable backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

use crate::CredentialBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    registry: String,
    username: Option<String>,
    password: Option<String>,
    refresh_token: Option<String>,
    access_token: Option<String>,
}

impl Entry {
    fn into_record(self) -> CredentialRecord {
        CredentialRecord {
            username: self.username,
            password: self.password,
            refresh_token: self.refresh_token,
            access_token: self.access_token,
        }
    }
}

/// Reads and writes a JSON array of `{registry, username, password, ...}`
/// entries at a fixed path.
pub struct PlaintextBackend {
    path: PathBuf,
}

impl PlaintextBackend {
    /// Build a backend bound to an explicit file path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.config/lazyoci/credentials.json` (or the platform equivalent),
    /// if a config directory could be resolved.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lazyoci").join("credentials.json"))
    }

    async fn load(&self) -> Result<Vec<Entry>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &[Entry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialBackend for PlaintextBackend {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    async fn get(&self, registry_host: &str) -> Result<CredentialRecord> {
        let entries = self.load().await?;
        let record = entries
            .into_iter()
            .find(|e| e.registry == registry_host)
            .map(Entry::into_record);
        match record {
            Some(record) if !record.is_empty() => Ok(record),
            _ => Err(Error::CredentialsNotFound(registry_host.to_string())),
        }
    }

    async fn put(&self, registry_host: &str, credential: &CredentialRecord) -> Result<()> {
        let mut entries = self.load().await?;
        entries.retain(|e| e.registry != registry_host);
        entries.push(Entry {
            registry: registry_host.to_string(),
            username: credential.username.clone(),
            password: credential.password.clone(),
            refresh_token: credential.refresh_token.clone(),
            access_token: credential.access_token.clone(),
        });
        self.save(&entries).await
    }

    async fn erase(&self, registry_host: &str) -> Result<()> {
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| e.registry != registry_host);
        if entries.len() != before {
            self.save(&entries).await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.into_iter().map(|e| e.registry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cred() -> CredentialRecord {
        CredentialRecord {
            username: Some("alice".to_string()),
            password: Some("pw".to_string()),
            refresh_token: None,
            access_token: None,
        }
    }

    #[tokio::test]
    async fn missing_file_is_not_found_not_an_error() {
        let dir = tempdir().unwrap();
        let backend = PlaintextBackend::new(dir.path().join("credentials.json"));
        let err = backend.get("ghcr.io").await.unwrap_err();
        assert!(matches!(err, Error::CredentialsNotFound(_)));
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let backend = PlaintextBackend::new(dir.path().join("credentials.json"));
        backend.put("ghcr.io", &cred()).await.unwrap();
        let found = backend.get("ghcr.io").await.unwrap();
        assert_eq!(found.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn erase_removes_entry() {
        let dir = tempdir().unwrap();
        let backend = PlaintextBackend::new(dir.path().join("credentials.json"));
        backend.put("ghcr.io", &cred()).await.unwrap();
        backend.erase("ghcr.io").await.unwrap();
        let err = backend.get("ghcr.io").await.unwrap_err();
        assert!(matches!(err, Error::CredentialsNotFound(_)));
    }

    #[tokio::test]
    async fn erase_of_missing_entry_is_a_no_op() {
        let dir = tempdir().unwrap();
        let backend = PlaintextBackend::new(dir.path().join("credentials.json"));
        backend.erase("ghcr.io").await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_all_registries() {
        let dir = tempdir().unwrap();
        let backend = PlaintextBackend::new(dir.path().join("credentials.json"));
        backend.put("ghcr.io", &cred()).await.unwrap();
        backend.put("r.example", &cred()).await.unwrap();
        let mut hosts = backend.list().await.unwrap();
        hosts.sort();
        assert_eq!(hosts, vec!["ghcr.io".to_string(), "r.example".to_string()]);
    }
}

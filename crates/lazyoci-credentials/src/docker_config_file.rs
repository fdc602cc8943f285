//! Read-only access to the Docker CLI's `config.json`.

use base64::Engine as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

use crate::registry_key::candidate_keys;

/// One entry of `config.json`'s `auths` map.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DockerAuthEntry {
    /// `base64(username:password)`, the form the Docker CLI itself writes.
    pub auth: Option<String>,
    /// Plain username, an alternative form some tools write directly.
    pub username: Option<String>,
    /// Plain password, paired with `username`.
    pub password: Option<String>,
    /// An OAuth2 identity token, when present instead of a password.
    pub identitytoken: Option<String>,
}

impl DockerAuthEntry {
    fn decode(&self) -> CredentialRecord {
        if let Some(auth) = &self.auth {
            if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(auth) {
                if let Ok(text) = String::from_utf8(decoded) {
                    if let Some((user, pass)) = text.split_once(':') {
                        return CredentialRecord {
                            username: Some(user.to_string()),
                            password: Some(pass.to_string()),
                            refresh_token: None,
                            access_token: self.identitytoken.clone(),
                        };
                    }
                }
            }
        }
        CredentialRecord {
            username: self.username.clone(),
            password: self.password.clone(),
            refresh_token: None,
            access_token: self.identitytoken.clone(),
        }
    }
}

/// The subset of `config.json` this crate reads.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DockerConfigFile {
    /// Per-registry embedded credentials.
    #[serde(default)]
    pub auths: HashMap<String, DockerAuthEntry>,
    /// Per-registry credential-helper binary name suffix.
    #[serde(default, rename = "credHelpers")]
    pub cred_helpers: HashMap<String, String>,
    /// Default credential-helper binary name suffix.
    #[serde(default, rename = "credsStore")]
    pub creds_store: Option<String>,
}

/// Resolve the path to the Docker config file: `$DOCKER_CONFIG/config.json`
/// if set, else `~/.docker/config.json`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCKER_CONFIG") {
        return Some(PathBuf::from(dir).join("config.json"));
    }
    dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
}

/// Load and parse the Docker config file. Returns `None` (not an error) when
/// the file does not exist, matching "read-only, best-effort" backends that
/// simply have nothing to contribute when Docker has never been configured.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Json`] if the file exists but does not parse.
pub async fn load() -> Result<Option<DockerConfigFile>> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DockerConfigFile {
    /// Find an `auths` entry for `registry_host`, probing alias forms.
    #[must_use]
    pub fn find_auth(&self, registry_host: &str) -> Option<CredentialRecord> {
        candidate_keys(registry_host)
            .iter()
            .find_map(|key| self.auths.get(key))
            .map(DockerAuthEntry::decode)
    }

    /// Find the per-registry credential-helper name for `registry_host`,
    /// probing alias forms.
    #[must_use]
    pub fn find_cred_helper(&self, registry_host: &str) -> Option<&str> {
        candidate_keys(registry_host)
            .iter()
            .find_map(|key| self.cred_helpers.get(key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_auth_field() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:s3cret");
        let entry = DockerAuthEntry {
            auth: Some(encoded),
            username: None,
            password: None,
            identitytoken: None,
        };
        let cred = entry.decode();
        assert_eq!(cred.username.as_deref(), Some("alice"));
        assert_eq!(cred.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn decodes_plain_username_password_form() {
        let entry = DockerAuthEntry {
            auth: None,
            username: Some("bob".to_string()),
            password: Some("pw".to_string()),
            identitytoken: None,
        };
        let cred = entry.decode();
        assert_eq!(cred.username.as_deref(), Some("bob"));
    }

    #[test]
    fn find_auth_probes_docker_hub_alias() {
        let mut config = DockerConfigFile::default();
        config.auths.insert(
            "https://index.docker.io/v1/".to_string(),
            DockerAuthEntry {
                auth: None,
                username: Some("hub-user".to_string()),
                password: Some("pw".to_string()),
                identitytoken: None,
            },
        );
        let found = config.find_auth("docker.io").unwrap();
        assert_eq!(found.username.as_deref(), Some("hub-user"));
    }
}

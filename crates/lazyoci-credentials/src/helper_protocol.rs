//! Invocation of the Docker credential-helper protocol:
//! `docker-credential-<name> get`, registry host on stdin, a JSON triple
//! on stdout.

use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use lazyoci_core::Error;
use lazyoci_core::Result;
use lazyoci_core::model::CredentialRecord;

const HELPER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct HelperResponse {
    #[serde(rename = "ServerURL")]
    #[allow(dead_code)]
    server_url: String,
    #[serde(rename = "Username")]
    username: String,
    #[serde(rename = "Secret")]
    secret: String,
}

/// Invoke `docker-credential-<name> get` with `registry_host` on stdin.
///
/// # Errors
/// Returns [`Error::NotImplemented`] if the helper binary does not exist on
/// `PATH`, [`Error::CredentialsNotFound`] if the helper ran but returned an
/// empty username and secret, or [`Error::Subprocess`] for any other
/// failure (stderr included).
pub async fn invoke(helper_name: &str, registry_host: &str) -> Result<CredentialRecord> {
    let binary = format!("docker-credential-{helper_name}");

    let mut cmd = tokio::process::Command::new(&binary);
    cmd.arg("get");
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotImplemented(format!("credential helper '{binary}' not found")));
        }
        Err(e) => return Err(Error::subprocess(&binary, format!("failed to spawn: {e}"))),
    };

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(registry_host.as_bytes())
            .await
            .map_err(|e| Error::subprocess(&binary, format!("failed to write stdin: {e}")))?;
    }

    let output = match tokio::time::timeout(HELPER_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(Error::subprocess(&binary, format!("failed waiting: {e}"))),
        Err(_) => return Err(Error::subprocess(&binary, "timed out")),
    };

    if !output.status.success() {
        return Err(Error::subprocess(
            &binary,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let response: HelperResponse = serde_json::from_slice(&output.stdout)?;
    if response.username.is_empty() && response.secret.is_empty() {
        return Err(Error::CredentialsNotFound(registry_host.to_string()));
    }

    Ok(CredentialRecord {
        username: Some(response.username),
        password: Some(response.secret),
        refresh_token: None,
        access_token: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_helper_binary_is_not_implemented() {
        let err = invoke("definitely-nonexistent-helper-xyz", "ghcr.io")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }
}

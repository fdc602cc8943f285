//! Cross-cutting error taxonomy shared by every lazyoci crate.

use thiserror::Error;

/// Result type threaded through the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds named in the error handling design: each maps onto a
/// disposition a caller is expected to know about (fatal, per-item,
/// transparent) rather than a single flat "something went wrong" bucket.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid declarative build file or mirror configuration.
    #[error("configuration error in {context}: {message}")]
    Configuration {
        /// What was being configured (an artifact name/index, a file path).
        context: String,
        /// Human-readable reason.
        message: String,
    },

    /// An image or target reference failed to parse.
    #[error("invalid reference '{reference}': {message}")]
    Reference {
        /// The offending reference string.
        reference: String,
        /// Human-readable reason.
        message: String,
    },

    /// No credential backend had a credential for this host.
    #[error("no credentials found for registry '{0}'")]
    CredentialsNotFound(String),

    /// A backend or subsystem is a stub and has nothing to contribute.
    ///
    /// Transparent to callers: the credential chain treats this exactly
    /// like [`Error::CredentialsNotFound`] for the purpose of moving on
    /// to the next backend.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// An authenticated request was rejected by the remote registry.
    #[error("credentials denied for registry '{0}': {1}")]
    CredentialsDenied(String, String),

    /// Network, TLS, or timeout failure talking to a registry.
    #[error("transport error: {0}")]
    Transport(String),

    /// An external binary (docker, helm, buildx, a credential helper, a VCS
    /// binary) exited non-zero or could not be spawned.
    #[error("subprocess '{command}' failed: {message}")]
    Subprocess {
        /// The command that was run (binary name, not full argv).
        command: String,
        /// Captured stderr, or a spawn-failure reason.
        message: String,
    },

    /// A malformed OCI layout or Docker-save tarball.
    #[error("malformed {what}: {message}")]
    Format {
        /// What was being read (`"OCI layout"`, `"docker-save tarball"`, ...).
        what: String,
        /// Human-readable reason.
        message: String,
    },

    /// Template rendering referenced a key that resolved to nothing.
    #[error("template render failed: missing key '{0}'")]
    Template(String),

    /// Wrapped I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Configuration`] identifying the offending artifact
    /// or file by name, index, or path.
    #[must_use]
    pub fn configuration(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Reference`].
    #[must_use]
    pub fn reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Subprocess`].
    #[must_use]
    pub fn subprocess(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subprocess {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Format`].
    #[must_use]
    pub fn format(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            what: what.into(),
            message: message.into(),
        }
    }

    /// True for the two "keep trying the next backend" signals a credential
    /// chain treats identically.
    #[must_use]
    pub fn is_transparent_to_chain(&self) -> bool {
        matches!(self, Self::CredentialsNotFound(_) | Self::NotImplemented(_))
    }
}

//! The six credential backends, in the order [`crate::CredentialChain`]
//! queries them by default.

mod default_helper;
mod docker_config;
mod encrypted_file;
mod helper_router;
mod keychain;
mod plaintext;

pub use default_helper::DefaultHelperBackend;
pub use docker_config::DockerConfigBackend;
pub use encrypted_file::EncryptedFileBackend;
pub use helper_router::HelperRouterBackend;
pub use keychain::KeychainBackend;
pub use plaintext::PlaintextBackend;

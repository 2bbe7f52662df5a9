//! Remote tree backend configuration.
//!
//! ```toml
//! ref = "main"
//! root = "packages"          # optional, defaults to the repository root
//! token_env = "GITHUB_TOKEN" # or: token = "..."
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};
use crate::path;

/// Access credential for the remote store. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the transport to put on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Construction parameters for a remote tree filesystem.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTreeConfig {
    /// Branch or tag to read.
    #[serde(rename = "ref")]
    pub reference: String,

    /// Directory inside the tree that acts as the filesystem root.
    #[serde(default)]
    pub root: String,

    /// Access token (inline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the access token (alternative to inline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl fmt::Debug for RemoteTreeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTreeConfig")
            .field("reference", &self.reference)
            .field("root", &self.root)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_env", &self.token_env)
            .finish()
    }
}

impl RemoteTreeConfig {
    /// Config for `reference`, rooted at the top of the tree.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            root: String::new(),
            token: None,
            token_env: None,
        }
    }

    /// Set the root directory.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the token directly.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read the token from an environment variable.
    pub fn with_token_env(mut self, env_var: impl Into<String>) -> Self {
        self.token_env = Some(env_var.into());
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(src: &str) -> FsResult<Self> {
        let config: Self =
            toml::from_str(src).map_err(|e| FsError::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .map_err(|e| FsError::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&src)
    }

    /// Check the config is usable.
    pub fn validate(&self) -> FsResult<()> {
        if self.reference.trim().is_empty() {
            return Err(FsError::config("ref must not be empty"));
        }
        Ok(())
    }

    /// Normalized root directory (`""` for the top of the tree).
    pub fn normalized_root(&self) -> String {
        path::normalize(&self.root)
    }

    /// Resolve the credential from the inline token or the environment.
    pub fn resolve_credential(&self) -> FsResult<Credential> {
        if let Some(token) = &self.token {
            return Ok(Credential::new(token.clone()));
        }
        if let Some(var) = &self.token_env {
            return std::env::var(var)
                .map(Credential::new)
                .map_err(|_| FsError::config(format!("environment variable {var} is not set")));
        }
        Err(FsError::config("no token or token_env configured"))
    }
}

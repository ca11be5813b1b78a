//! Signing credential sources
//!
//! The sequencer never embeds a key. It names a secret, and a backend chosen
//! in configuration resolves it:
//! - Environment variables (development)
//! - Key files in a directory (one file per secret, e.g. a mounted volume)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Opaque secret value; never printed
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret to the code that consumes it
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Secret source trait
pub trait SecretSource: Send + Sync {
    /// Resolve a secret by name
    fn fetch(&self, name: &str) -> Result<Credential>;
}

/// Environment variables backend (development only)
#[derive(Debug, Default)]
pub struct EnvironmentSource;

impl SecretSource for EnvironmentSource {
    fn fetch(&self, name: &str) -> Result<Credential> {
        let value = std::env::var(name)
            .map_err(|_| Error::Secret(format!("environment variable {} not set", name)))?;
        non_empty(name, value)
    }
}

/// Directory of key files, one secret per file
#[derive(Debug)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    /// Create new file source rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SecretSource for FileSource {
    fn fetch(&self, name: &str) -> Result<Credential> {
        if name.contains('/') || name.contains('\\') || name == ".." {
            return Err(Error::Secret(format!("invalid secret name: {}", name)));
        }

        let path = self.dir.join(name);
        let value = std::fs::read_to_string(&path)
            .map_err(|e| Error::Secret(format!("cannot read {}: {}", path.display(), e)))?;
        non_empty(name, value)
    }
}

fn non_empty(name: &str, value: String) -> Result<Credential> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Secret(format!("secret {} is empty", name)));
    }
    Ok(Credential::new(trimmed))
}

/// Secrets backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretBackend {
    /// Environment variables
    Environment,

    /// Key files in a directory
    File {
        /// Directory holding the key files
        dir: PathBuf,
    },
}

impl Default for SecretBackend {
    fn default() -> Self {
        SecretBackend::Environment
    }
}

impl SecretBackend {
    /// Build the configured source
    pub fn source(&self) -> Box<dyn SecretSource> {
        match self {
            SecretBackend::Environment => Box::new(EnvironmentSource),
            SecretBackend::File { dir } => Box::new(FileSource::new(dir.clone())),
        }
    }

    /// Resolve `name` through the configured backend
    pub fn fetch(&self, name: &str) -> Result<Credential> {
        info!("Resolving credential {} from {:?} backend", name, self);
        self.source().fetch(name)
    }
}

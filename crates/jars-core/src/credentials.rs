//! Bearer token storage for API clients

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::config::data_dir;
use crate::error::{Error, Result};

/// Source of the bearer token attached to API requests
pub trait CredentialProvider: Send + Sync {
    /// Current token, if logged in
    fn token(&self) -> Result<Option<String>>;

    /// Remember a token after login
    fn store(&self, token: &str) -> Result<()>;

    /// Forget the token on logout
    fn clear(&self) -> Result<()>;
}

/// `Authorization` header value for a token
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Token held in memory for the life of the process
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn token(&self) -> Result<Option<String>> {
        let token = self
            .token
            .read()
            .map_err(|_| Error::Auth("Credential lock poisoned".into()))?;
        Ok(token.clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| Error::Auth("Credential lock poisoned".into()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| Error::Auth("Credential lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

/// Fixed token, e.g. from `JARS_TOKEN`; store and clear are no-ops
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    fn token(&self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }

    fn store(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Token persisted to a file (default `<data dir>/token`)
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl Default for FileCredentials {
    fn default() -> Self {
        Self::new(data_dir().join("token"))
    }
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialProvider for FileCredentials {
    fn token(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&self.path)?.trim().to_string();
        Ok(if token.is_empty() { None } else { Some(token) })
    }

    fn store(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, token)?;
        restrict_permissions(&self.path)?;
        debug!("Saved token to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!("Removed token file {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

//! Credential seam between the backend client and the refresh job.
//!
//! The acquisition protocol is an external collaborator; the core only
//! needs something that can produce a bearer token now and again. The
//! refresh job calls [`CredentialStore::refresh`] on its own interval; a
//! failed refresh leaves the previously issued credentials in place so the
//! agent keeps shipping until they actually expire.

use async_trait::async_trait;
use std::env;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AgentError;

/// An issued set of credentials. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
}

/// Source of credentials, driven periodically by the refresh job.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> Result<Credentials, AgentError>;
}

/// Fixed credentials handed over at startup.
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn fetch(&self) -> Result<Credentials, AgentError> {
        Ok(Credentials {
            token: self.token.clone(),
        })
    }
}

/// Credentials re-read from an environment variable on every refresh, so an
/// external rotation mechanism can swap them under a running agent.
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    #[must_use]
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn fetch(&self) -> Result<Credentials, AgentError> {
        match env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(Credentials {
                token: token.trim().to_string(),
            }),
            Ok(_) => Err(AgentError::CredentialRefresh(format!(
                "{} is set but empty",
                self.var
            ))),
            Err(_) => Err(AgentError::CredentialRefresh(format!(
                "{} is not set",
                self.var
            ))),
        }
    }
}

/// Holds the most recently issued credentials.
///
/// Written only by the refresh job, read by the backend client on every
/// request.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches fresh credentials and swaps them in.
    ///
    /// On failure the stored credentials are untouched.
    pub async fn refresh(&self, provider: &dyn CredentialProvider) -> Result<(), AgentError> {
        let fresh = provider.fetch().await?;
        *self.current.write().await = Some(fresh);
        debug!("AUTH | Credentials refreshed");
        Ok(())
    }

    /// The current bearer token, if any credentials have been issued.
    pub async fn bearer(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|c| c.token.clone())
    }
}

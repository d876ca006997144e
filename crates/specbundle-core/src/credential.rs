//! Access token handed to the remote fetcher.
//!
//! The token is read once, at startup, and then owned by the fetcher for the
//! rest of the run. Nothing else in the library looks at the process
//! environment.

use std::fmt;

use crate::Error;

/// Personal access token for the contents API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap an already known token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from the process environment.
    pub fn from_env(var: &str) -> crate::Result<Self> {
        Self::from_lookup(var, |name| std::env::var(name).ok())
    }

    /// Read the token through `lookup`, failing if it is absent or blank.
    pub fn from_lookup<F>(var: &str, lookup: F) -> crate::Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(var) {
            Some(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(Error::config(format!(
                "Could not run the assembly. The {var} environment variable must be set to a valid Personal Access Token."
            ))),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("token {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"***").finish()
    }
}

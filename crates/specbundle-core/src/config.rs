//! Configuration management for bundle assembly.
//!
//! This module defines the `Config` struct that controls where bundles are
//! written, which environment variable carries the access token and which
//! remote host fragments are fetched from. The configuration can be loaded
//! from a YAML file, created programmatically, or filled from command-line
//! arguments.
//!
//! # Examples
//!
//! ```no_run
//! use specbundle_core::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> specbundle_core::Result<()> {
//! // Create a new config programmatically
//! let mut config = Config::new("generated");
//! config.remote.owner = "my-org".to_string();
//!
//! // Or load from a config file
//! let config = Config::from_file("specbundle.yaml").await?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use tokio::fs;
use url::Url;

/// Environment variable read for the access token unless configured otherwise
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_PAT";

/// Configuration for bundle assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory that bundle output paths are resolved against
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Name of the environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Remote host settings
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Remove the bundle directory before assembling
    #[serde(default = "default_clean")]
    pub clean: bool,
}

/// Where fragments are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the contents API
    #[serde(default = "default_api_base")]
    pub api_base: Url,

    /// Account owning the fragment repositories
    #[serde(default = "default_owner")]
    pub owner: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: default_owner(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_output_root())
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            token_env: default_token_env(),
            remote: RemoteSettings::default(),
            clean: default_clean(),
        }
    }

    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_clean() -> bool {
    true
}

fn default_api_base() -> Url {
    // Literal is a valid absolute URL.
    Url::parse("https://api.github.com/").expect("static URL parses")
}

fn default_owner() -> String {
    "snyk".to_string()
}

//! Provider configuration from the environment or a JSON settings file.
//!
//! ```rust,no_run
//! use kube_cloud_auth::{AuthConfig, AuthProvider, CloudProvider};
//!
//! # async fn example() -> kube_cloud_auth::Result<()> {
//! let provider = AuthConfig::from_env(CloudProvider::Aws).build().await?;
//! let header = provider.auth_header().await?;
//! # Ok(())
//! # }
//! ```

pub mod cloud;
pub mod env;

pub use cloud::{AwsConfig, AzureConfig, GcpConfig};
pub use env::EnvLookup;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthProvider;
use crate::Result;

/// Failure to load provider settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Malformed JSON settings
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Settings file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Provider compiled out of this build
    #[error("Provider '{provider}' is not enabled")]
    Unsupported { provider: CloudProvider },
}

/// Managed Kubernetes platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" | "eks" => Ok(CloudProvider::Aws),
            "azure" | "aks" => Ok(CloudProvider::Azure),
            "gcp" | "gke" => Ok(CloudProvider::Gcp),
            other => Err(ConfigError::InvalidValue {
                key: "provider".into(),
                message: format!("unknown cloud provider '{}'", other),
            }),
        }
    }
}

/// Settings for one provider, tagged by `"provider"`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum AuthConfig {
    Aws(AwsConfig),
    Azure(AzureConfig),
    Gcp(GcpConfig),
}

impl AuthConfig {
    pub fn from_env(provider: CloudProvider) -> Self {
        match provider {
            CloudProvider::Aws => AuthConfig::Aws(AwsConfig::from_env()),
            CloudProvider::Azure => AuthConfig::Azure(AzureConfig::from_env()),
            CloudProvider::Gcp => AuthConfig::Gcp(GcpConfig::from_env()),
        }
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn provider(&self) -> CloudProvider {
        match self {
            AuthConfig::Aws(_) => CloudProvider::Aws,
            AuthConfig::Azure(_) => CloudProvider::Azure,
            AuthConfig::Gcp(_) => CloudProvider::Gcp,
        }
    }

    /// Shorthand for `AuthConfig::from_env(provider).build()`.
    pub async fn build_from_env(provider: CloudProvider) -> Result<Box<dyn AuthProvider>> {
        Self::from_env(provider).build().await
    }

    /// Resolve credentials and build the matching provider.
    pub async fn build(self) -> Result<Box<dyn AuthProvider>> {
        match self {
            #[cfg(feature = "aws")]
            AuthConfig::Aws(config) => Ok(Box::new(
                crate::auth::aws::AwsAuthProvider::builder()
                    .config(config)
                    .build()
                    .await?,
            )),
            #[cfg(feature = "azure")]
            AuthConfig::Azure(config) => Ok(Box::new(
                crate::auth::azure::AzureAuthProvider::builder()
                    .config(config)
                    .build()
                    .await?,
            )),
            #[cfg(feature = "gcp")]
            AuthConfig::Gcp(config) => Ok(Box::new(
                crate::auth::gcp::GcpAuthProvider::builder()
                    .config(config)
                    .build()
                    .await?,
            )),
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::Unsupported {
                provider: other.provider(),
            }
            .into()),
        }
    }
}

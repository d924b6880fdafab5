//! # kube-cloud-auth
//!
//! Short-lived bearer tokens for Kubernetes API servers hosted on AWS EKS,
//! Azure AKS and Google GKE.
//!
//! Every provider is exposed through the same [`AuthProvider`] trait. Tokens are
//! cached and re-minted once they come within [`REFRESH_THRESHOLD`] of expiry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kube_cloud_auth::{AuthProvider, AwsAuthProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kube_cloud_auth::Error> {
//!     let provider = AwsAuthProvider::builder()
//!         .cluster_name("prod-cluster")
//!         .region("eu-west-1")
//!         .build()
//!         .await?;
//!
//!     let header = provider.auth_header().await?;
//!     assert!(header.starts_with("Bearer k8s-aws-v1."));
//!     Ok(())
//! }
//! ```
//!
//! ## From configuration
//!
//! ```rust,no_run
//! use kube_cloud_auth::{AuthConfig, AuthProvider};
//!
//! # async fn run() -> kube_cloud_auth::Result<()> {
//! let config = AuthConfig::from_json(r#"{"provider": "gcp"}"#)?;
//! let provider = config.build().await?;
//! let token = provider.token().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod config;

pub use auth::{
    AuthProvider, CachedAuthProvider, CandidateChain, REFRESH_THRESHOLD, Resolved, Token,
    TokenSource,
};
pub use config::{AuthConfig, CloudProvider, ConfigError};

#[cfg(feature = "aws")]
pub use auth::aws::{AwsAuthBuilder, AwsAuthProvider, EksTokenSource, SigningIdentity};
#[cfg(feature = "azure")]
pub use auth::azure::{AzureAuthBuilder, AzureAuthProvider, AzureTokenSource};
#[cfg(feature = "gcp")]
pub use auth::gcp::{GcpAuthBuilder, GcpAuthProvider, GcpTokenSource};

/// Boxed error used as the source of wrapped SDK failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Authentication error.
///
/// Every externally observable failure of this crate is one of these variants:
/// invalid configuration at build time, a failed token mint, or use of a
/// provider after [`AuthProvider::close`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A token could not be obtained.
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The provider was closed and can no longer mint tokens.
    #[error("Authentication provider '{provider}' is closed")]
    Closed { provider: &'static str },
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
            source: None,
        }
    }

    pub fn auth_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Auth {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed { .. })
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Config(e.to_string()),
            config::ConfigError::Io(e) => Error::Config(e.to_string()),
            config::ConfigError::Unsupported { provider } => Error::Config(format!(
                "Provider '{}' is not enabled in this build",
                provider
            )),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = Error::auth("token endpoint unreachable");
        assert!(err.to_string().contains("token endpoint unreachable"));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_auth_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = Error::auth_with("mint failed", io);
        assert!(err.source().is_some());
        assert!(err.source().unwrap().to_string().contains("timed out"));
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = "openstack".parse::<config::CloudProvider>().unwrap_err();
        let err: Error = config_err.into();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("openstack"));
    }

    #[test]
    fn test_closed_error() {
        let err = Error::Closed { provider: "aws" };
        assert!(err.is_closed());
        assert!(err.to_string().contains("aws"));
    }
}

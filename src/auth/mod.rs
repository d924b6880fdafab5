//! Authentication providers for managed Kubernetes clusters.
//!
//! Provides one bearer-token strategy per cloud:
//! - **AWS**: EKS tokens built from a presigned STS `GetCallerIdentity` request
//! - **Azure**: Entra ID access tokens for the AKS server application
//! - **GCP**: OAuth2 access tokens with the `cloud-platform` scope
//!
//! All three are [`TokenSource`]s wrapped by the shared [`CachedAuthProvider`].

mod cache;
mod chain;
mod provider;
mod token;

#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "azure")]
pub mod azure;
#[cfg(feature = "gcp")]
pub mod gcp;

pub use cache::{CachedAuthProvider, REFRESH_THRESHOLD, TokenSource};
pub use chain::{CandidateChain, Resolved};
pub use provider::AuthProvider;
pub use token::Token;

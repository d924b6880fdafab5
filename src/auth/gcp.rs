//! Google GKE authentication with OAuth2 access tokens.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::RwLock;

use crate::auth::{CachedAuthProvider, CandidateChain, Token, TokenSource};
use crate::config::GcpConfig;
use crate::{Error, Result};

/// OAuth2 scope requested for GKE tokens.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// GKE [`AuthProvider`](crate::AuthProvider).
pub type GcpAuthProvider = CachedAuthProvider<GcpTokenSource>;

impl GcpAuthProvider {
    pub fn builder() -> GcpAuthBuilder {
        GcpAuthBuilder::default()
    }
}

pub struct GcpTokenSource {
    strategy: &'static str,
    provider: RwLock<Option<Arc<dyn TokenProvider>>>,
}

impl fmt::Debug for GcpTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpTokenSource")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl GcpTokenSource {
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }
}

#[async_trait]
impl TokenSource for GcpTokenSource {
    fn name(&self) -> &'static str {
        "gcp"
    }

    async fn mint(&self) -> Result<Token> {
        let provider = self
            .provider
            .read()
            .await
            .clone()
            .ok_or(Error::Closed { provider: "gcp" })?;

        let token = provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| Error::auth_with("Failed to get GCP access token", e))?;

        Ok(Token::new(token.as_str(), Some(token.expires_at())))
    }

    async fn close(&self) {
        self.provider.write().await.take();
    }
}

/// Application default credentials are the last candidate, so failing to find
/// them means no credential source is configured at all.
fn missing_adc(err: impl fmt::Display) -> Error {
    Error::config(format!(
        "No GCP credential source configured and application default credentials unavailable: {}",
        err
    ))
}

/// Builder for [`GcpAuthProvider`].
#[derive(Default)]
pub struct GcpAuthBuilder {
    credential: Option<Arc<dyn TokenProvider>>,
    service_account_key_path: Option<PathBuf>,
}

impl fmt::Debug for GcpAuthBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpAuthBuilder")
            .field("credential", &self.credential.as_ref().map(|_| "<provider>"))
            .field("service_account_key_path", &self.service_account_key_path)
            .finish()
    }
}

impl GcpAuthBuilder {
    pub fn config(mut self, config: GcpConfig) -> Self {
        if let Some(path) = config.service_account_key_path {
            self.service_account_key_path = Some(path);
        }
        self
    }

    /// Use this token provider as-is.
    pub fn credential(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.credential = Some(provider);
        self
    }

    /// Service account JSON key file.
    pub fn service_account_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.service_account_key_path = Some(path.into());
        self
    }

    pub async fn build(self) -> Result<GcpAuthProvider> {
        let Self {
            credential,
            service_account_key_path,
        } = self;

        let resolved = CandidateChain::new("gcp")
            .candidate("explicit", || async move { Ok(credential) })
            .candidate("service_account", || async move {
                let Some(path) = service_account_key_path else {
                    return Ok(None);
                };
                let account = CustomServiceAccount::from_file(&path).map_err(|e| {
                    Error::config(format!(
                        "Invalid service account key {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(Some(Arc::new(account) as Arc<dyn TokenProvider>))
            })
            .candidate("application_default", || async move {
                let provider = gcp_auth::provider().await.map_err(missing_adc)?;
                Ok(Some(provider))
            })
            .resolve()
            .await?;

        Ok(CachedAuthProvider::new(GcpTokenSource {
            strategy: resolved.strategy,
            provider: RwLock::new(Some(resolved.value)),
        }))
    }
}

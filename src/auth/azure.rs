//! Azure AKS authentication with Entra ID.
//!
//! Tokens are requested for the AKS AAD server application. Credential
//! precedence: explicit credential, service principal secret, user-assigned
//! managed identity, then an ambient chain (environment, developer tools,
//! system-assigned managed identity).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential};
use azure_identity::{
    ClientSecretCredential, DeveloperToolsCredential, ManagedIdentityCredential,
    ManagedIdentityCredentialOptions, UserAssignedId,
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::auth::{CachedAuthProvider, CandidateChain, Token, TokenSource};
use crate::config::{AzureConfig, EnvLookup};
use crate::{Error, Result};

/// Scope of the AKS AAD server application.
pub const AKS_SCOPE: &str = "6dae42f8-4368-4678-94ff-3960e28e3630/.default";

/// AKS [`AuthProvider`](crate::AuthProvider).
pub type AzureAuthProvider = CachedAuthProvider<AzureTokenSource>;

impl AzureAuthProvider {
    pub fn builder() -> AzureAuthBuilder {
        AzureAuthBuilder::default()
    }
}

/// Fetches an access token for one scope.
#[async_trait]
trait ScopedCredential: Send + Sync {
    async fn fetch(&self, scope: &str) -> Result<Token>;
}

#[async_trait]
impl ScopedCredential for Arc<dyn TokenCredential> {
    async fn fetch(&self, scope: &str) -> Result<Token> {
        let access_token = self
            .get_token(&[scope], None)
            .await
            .map_err(|e| Error::auth_with("Failed to get Azure token", e))?;
        Ok(Token::new(
            access_token.token.secret(),
            access_token_expiry(&access_token),
        ))
    }
}

type AmbientLink = (&'static str, Box<dyn ScopedCredential>);

/// Ambient credential links, tried in order until one yields a token.
/// The link that last succeeded is tried first on later calls.
struct AmbientChain {
    links: Vec<AmbientLink>,
    preferred: AtomicUsize,
}

impl AmbientChain {
    fn new(links: Vec<AmbientLink>) -> Self {
        Self {
            links,
            preferred: AtomicUsize::new(0),
        }
    }

    fn from_env() -> Self {
        let env = AzureConfig::from_lookup(&EnvLookup::process());
        let mut links: Vec<AmbientLink> = Vec::new();

        if let (Some(tenant_id), Some(client_id), Some(secret)) =
            (env.tenant_id, env.client_id, env.client_secret)
        {
            match client_secret_credential(&tenant_id, client_id, &secret) {
                Ok(credential) => links.push(("environment", Box::new(credential))),
                Err(e) => tracing::debug!("Skipping environment credential: {}", e),
            }
        }
        match DeveloperToolsCredential::new(None) {
            Ok(credential) => {
                let credential: Arc<dyn TokenCredential> = credential;
                links.push(("developer_tools", Box::new(credential)));
            }
            Err(e) => tracing::debug!("Skipping developer tools credential: {}", e),
        }
        match ManagedIdentityCredential::new(None) {
            Ok(credential) => {
                let credential: Arc<dyn TokenCredential> = credential;
                links.push(("managed_identity", Box::new(credential)));
            }
            Err(e) => tracing::debug!("Skipping managed identity credential: {}", e),
        }

        Self::new(links)
    }

    fn link_names(&self) -> Vec<&'static str> {
        self.links.iter().map(|(name, _)| *name).collect()
    }
}

#[async_trait]
impl ScopedCredential for AmbientChain {
    async fn fetch(&self, scope: &str) -> Result<Token> {
        let preferred = self.preferred.load(Ordering::Acquire);
        let mut failures = Vec::new();

        for index in attempt_order(preferred, self.links.len()) {
            let (name, credential) = &self.links[index];
            match credential.fetch(scope).await {
                Ok(token) => {
                    if index != preferred {
                        tracing::info!("Azure ambient credential resolved via {}", name);
                        self.preferred.store(index, Ordering::Release);
                    }
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!("Azure ambient credential {} failed: {}", name, e);
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::auth("No Azure ambient credentials available"));
        }
        Err(Error::auth(format!(
            "All Azure ambient credentials failed ({})",
            failures.join("; ")
        )))
    }
}

/// Indices starting at `preferred`, then the rest in declaration order.
fn attempt_order(preferred: usize, len: usize) -> impl Iterator<Item = usize> {
    let first = (preferred < len).then_some(preferred);
    first
        .into_iter()
        .chain((0..len).filter(move |&i| Some(i) != first))
}

fn client_secret_credential(
    tenant_id: &str,
    client_id: String,
    secret: &SecretString,
) -> Result<Arc<dyn TokenCredential>> {
    let credential = ClientSecretCredential::new(
        tenant_id,
        client_id,
        Secret::new(secret.expose_secret().to_string()),
        None,
    )
    .map_err(|e| Error::config(format!("Invalid Azure client secret credential: {}", e)))?;
    Ok(credential as Arc<dyn TokenCredential>)
}

fn access_token_expiry(token: &AccessToken) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(token.expires_on.unix_timestamp(), 0)
}

/// Mints Entra ID access tokens for [`AKS_SCOPE`].
pub struct AzureTokenSource {
    strategy: &'static str,
    credential: RwLock<Option<Arc<dyn ScopedCredential>>>,
}

impl fmt::Debug for AzureTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureTokenSource")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl AzureTokenSource {
    /// Credential strategy chosen at build time.
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }
}

#[async_trait]
impl TokenSource for AzureTokenSource {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn mint(&self) -> Result<Token> {
        let credential = self
            .credential
            .read()
            .await
            .clone()
            .ok_or(Error::Closed { provider: "azure" })?;

        credential.fetch(AKS_SCOPE).await
    }

    async fn close(&self) {
        self.credential.write().await.take();
    }
}

/// Builder for [`AzureAuthProvider`].
#[derive(Default)]
pub struct AzureAuthBuilder {
    credential: Option<Arc<dyn TokenCredential>>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    managed_identity_client_id: Option<String>,
}

impl fmt::Debug for AzureAuthBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureAuthBuilder")
            .field("credential", &self.credential.as_ref().map(|_| "<credential>"))
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("managed_identity_client_id", &self.managed_identity_client_id)
            .finish()
    }
}

impl AzureAuthBuilder {
    pub fn config(mut self, config: AzureConfig) -> Self {
        if let Some(tenant_id) = config.tenant_id {
            self.tenant_id = Some(tenant_id);
        }
        if let Some(client_id) = config.client_id {
            self.client_id = Some(client_id);
        }
        if let Some(secret) = config.client_secret {
            self.client_secret = Some(secret);
        }
        if let Some(id) = config.managed_identity_client_id {
            self.managed_identity_client_id = Some(id);
        }
        self
    }

    /// Use this credential as-is, skipping every other strategy.
    pub fn credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Client id of a user-assigned managed identity.
    pub fn managed_identity_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.managed_identity_client_id = Some(client_id.into());
        self
    }

    pub async fn build(self) -> Result<AzureAuthProvider> {
        let Self {
            credential,
            tenant_id,
            client_id,
            client_secret,
            managed_identity_client_id,
        } = self;

        let resolved = CandidateChain::new("azure")
            .candidate("explicit", || async move {
                Ok(credential.map(|c| Arc::new(c) as Arc<dyn ScopedCredential>))
            })
            .candidate("client_secret", || async move {
                let Some(secret) = client_secret else {
                    return Ok(None);
                };
                let (Some(tenant_id), Some(client_id)) = (tenant_id, client_id) else {
                    return Err(Error::config(
                        "Azure client secret requires both tenant id and client id",
                    ));
                };
                let credential = client_secret_credential(&tenant_id, client_id, &secret)?;
                Ok(Some(Arc::new(credential) as Arc<dyn ScopedCredential>))
            })
            .candidate("managed_identity", || async move {
                let Some(client_id) = managed_identity_client_id else {
                    return Ok(None);
                };
                let options = ManagedIdentityCredentialOptions {
                    user_assigned_id: Some(UserAssignedId::ClientId(client_id)),
                    ..Default::default()
                };
                let credential = ManagedIdentityCredential::new(Some(options)).map_err(|e| {
                    Error::config(format!("Invalid Azure managed identity: {}", e))
                })?;
                let credential: Arc<dyn TokenCredential> = credential;
                Ok(Some(Arc::new(credential) as Arc<dyn ScopedCredential>))
            })
            .candidate("default_chain", || async move {
                let chain = AmbientChain::from_env();
                tracing::debug!("Azure ambient chain links: {:?}", chain.link_names());
                Ok(Some(Arc::new(chain) as Arc<dyn ScopedCredential>))
            })
            .resolve()
            .await?;

        Ok(CachedAuthProvider::new(AzureTokenSource {
            strategy: resolved.strategy,
            credential: RwLock::new(Some(resolved.value)),
        }))
    }
}

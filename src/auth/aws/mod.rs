//! AWS EKS authentication.
//!
//! EKS does not issue OAuth tokens. The client proves its IAM identity by handing
//! the API server a presigned STS `GetCallerIdentity` URL, encoded as
//! `k8s-aws-v1.<base64url>`. The presigned URL is only valid for 60 seconds, the
//! same as the refresh threshold, so every [`AuthProvider::token`] call re-signs.
//! Signing is local; the credential providers underneath cache their own
//! temporary credentials.
//!
//! [`AuthProvider::token`]: crate::AuthProvider::token

mod credentials;
mod presign;
mod token;

pub use credentials::{SigningIdentity, generated_session_name};
pub use presign::{
    CLUSTER_ID_HEADER, PRESIGN_EXPIRY, PresignedRequest, presign_caller_identity, sts_endpoint,
};
pub use token::{TOKEN_PREFIX, decode_token, encode_token};

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::Region;
use aws_config::meta::region::{ProvideRegion, RegionProviderChain};
use aws_credential_types::Credentials;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use tokio::sync::RwLock;

use self::credentials::{RolePlan, resolve_region, resolve_signing};
use self::presign::caller_identity_url;
use crate::auth::{CachedAuthProvider, Token, TokenSource};
use crate::config::AwsConfig;
use crate::{Error, Result};

const STATIC_CREDENTIALS_SOURCE: &str = "kube-cloud-auth-static";

/// EKS [`AuthProvider`](crate::AuthProvider).
pub type AwsAuthProvider = CachedAuthProvider<EksTokenSource>;

impl AwsAuthProvider {
    pub fn builder() -> AwsAuthBuilder {
        AwsAuthBuilder::default()
    }
}

/// Mints EKS tokens by presigning STS requests with the resolved credential.
pub struct EksTokenSource {
    cluster_name: String,
    region: Region,
    identity: SigningIdentity,
    credentials: RwLock<Option<SharedCredentialsProvider>>,
}

impl fmt::Debug for EksTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EksTokenSource")
            .field("cluster_name", &self.cluster_name)
            .field("region", &self.region)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl EksTokenSource {
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn region(&self) -> &str {
        self.region.as_ref()
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }
}

#[async_trait]
impl TokenSource for EksTokenSource {
    fn name(&self) -> &'static str {
        "aws"
    }

    async fn mint(&self) -> Result<Token> {
        let provider = self
            .credentials
            .read()
            .await
            .clone()
            .ok_or(Error::Closed { provider: "aws" })?;

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| Error::auth_with("Failed to resolve AWS credentials", e))?;

        let request = presign_caller_identity(
            &credentials,
            self.region.as_ref(),
            &self.cluster_name,
            SystemTime::now(),
        )?;

        let expires_at = DateTime::<Utc>::from(request.expires_at());
        Ok(Token::new(encode_token(&request.url), Some(expires_at)))
    }

    async fn close(&self) {
        self.credentials.write().await.take();
    }
}

/// Builder for [`AwsAuthProvider`].
#[derive(Debug, Default)]
pub struct AwsAuthBuilder {
    cluster_name: Option<String>,
    region: Option<String>,
    region_provider: Option<Box<dyn ProvideRegion>>,
    role_arn: Option<String>,
    session_name: Option<String>,
    use_oidc_auth: bool,
    oidc_role_arn: Option<String>,
    oidc_web_identity_token_file: Option<PathBuf>,
    oidc_role_session_name: Option<String>,
    static_credentials: Option<Credentials>,
    credentials_provider: Option<SharedCredentialsProvider>,
}

impl AwsAuthBuilder {
    /// Apply every field set in `config`.
    pub fn config(mut self, config: AwsConfig) -> Self {
        if let Some(cluster_name) = config.cluster_name {
            self.cluster_name = Some(cluster_name);
        }
        if let Some(region) = config.region {
            self.region = Some(region);
        }
        if let Some(role_arn) = config.role_arn {
            self.role_arn = Some(role_arn);
        }
        if let Some(session_name) = config.session_name {
            self.session_name = Some(session_name);
        }
        self.use_oidc_auth |= config.use_oidc_auth;
        if let Some(arn) = config.oidc_role_arn {
            self.oidc_role_arn = Some(arn);
        }
        if let Some(path) = config.oidc_web_identity_token_file {
            self.oidc_web_identity_token_file = Some(path);
        }
        if let Some(name) = config.oidc_role_session_name {
            self.oidc_role_session_name = Some(name);
        }
        if let (Some(access_key_id), Some(secret)) =
            (config.access_key_id, config.secret_access_key)
        {
            self.static_credentials = Some(Credentials::new(
                access_key_id,
                secret.expose_secret(),
                config
                    .session_token
                    .map(|t| t.expose_secret().to_string()),
                None,
                STATIC_CREDENTIALS_SOURCE,
            ));
        }
        self
    }

    /// Target cluster name (required).
    pub fn cluster_name(mut self, cluster_name: impl Into<String>) -> Self {
        self.cluster_name = Some(cluster_name.into());
        self
    }

    /// Signing region. Resolved from the region provider chain when unset.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Replace the default region provider chain used when no region is set.
    pub fn region_provider(mut self, provider: impl ProvideRegion + 'static) -> Self {
        self.region_provider = Some(Box::new(provider));
        self
    }

    /// Role to assume from the base credential.
    pub fn role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    pub fn session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// Exchange an OIDC web identity token for role credentials instead of
    /// assuming [`role_arn`](Self::role_arn).
    pub fn use_oidc_auth(mut self, enable: bool) -> Self {
        self.use_oidc_auth = enable;
        self
    }

    pub fn oidc_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.oidc_role_arn = Some(role_arn.into());
        self
    }

    pub fn oidc_web_identity_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.oidc_web_identity_token_file = Some(path.into());
        self
    }

    pub fn oidc_role_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.oidc_role_session_name = Some(session_name.into());
        self
    }

    /// Static access keys used as the base credential.
    pub fn static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        self.static_credentials = Some(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_CREDENTIALS_SOURCE,
        ));
        self
    }

    /// Base credentials provider, taking precedence over static keys and the default chain.
    pub fn credentials_provider(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.credentials_provider = Some(SharedCredentialsProvider::new(provider));
        self
    }

    fn role_plan(&mut self) -> Result<RolePlan> {
        if self.use_oidc_auth {
            let role_arn = self
                .oidc_role_arn
                .take()
                .filter(|arn| !arn.trim().is_empty())
                .ok_or_else(|| Error::config("OIDC authentication requires an OIDC role ARN"))?;
            let token_file = self.oidc_web_identity_token_file.take().ok_or_else(|| {
                Error::config("OIDC authentication requires a web identity token file")
            })?;
            if !token_file.is_file() {
                return Err(Error::config(format!(
                    "Web identity token file not found: {}",
                    token_file.display()
                )));
            }
            if self.role_arn.is_some() {
                tracing::warn!("Both OIDC and role ARN configured; ignoring role ARN");
            }

            return Ok(RolePlan::WebIdentity {
                role_arn,
                session_name: self
                    .oidc_role_session_name
                    .take()
                    .unwrap_or_else(generated_session_name),
                token_file,
            });
        }

        match self.role_arn.take().filter(|arn| !arn.trim().is_empty()) {
            Some(role_arn) => Ok(RolePlan::AssumeRole {
                role_arn,
                session_name: self
                    .session_name
                    .take()
                    .unwrap_or_else(generated_session_name),
            }),
            None => Ok(RolePlan::None),
        }
    }

    /// Validate configuration and resolve the signing credential.
    pub async fn build(mut self) -> Result<AwsAuthProvider> {
        let cluster_name = self
            .cluster_name
            .take()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::config("EKS cluster name is required"))?;

        let plan = self.role_plan()?;

        let region_provider = self
            .region_provider
            .take()
            .unwrap_or_else(|| Box::new(RegionProviderChain::default_provider()));
        let region = resolve_region(self.region.take(), region_provider).await?;
        caller_identity_url(region.as_ref())?;

        let (credentials, identity) = resolve_signing(
            self.credentials_provider.take(),
            self.static_credentials.take(),
            plan,
            region.clone(),
        )
        .await?;

        tracing::info!(
            cluster = %cluster_name,
            region = %region,
            "EKS auth provider ready"
        );

        Ok(CachedAuthProvider::new(EksTokenSource {
            cluster_name,
            region,
            identity,
            credentials: RwLock::new(Some(credentials)),
        }))
    }
}

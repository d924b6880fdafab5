//! Signing credential resolution for EKS tokens.
//!
//! web identity exchange -> signing credential
//! base credential -> (optional role assumption) -> signing credential

use std::path::PathBuf;

use aws_config::meta::region::ProvideRegion;
use aws_config::provider_config::ProviderConfig;
use aws_config::sts::AssumeRoleProvider;
use aws_config::web_identity_token::{StaticConfiguration, WebIdentityTokenCredentialsProvider};
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use uuid::Uuid;

use crate::auth::{CandidateChain, Resolved};
use crate::{Error, Result};

const SESSION_NAME_PREFIX: &str = "kube-cloud-auth";

/// Role session name used when an ARN is configured without one.
pub fn generated_session_name() -> String {
    format!("{}-{}", SESSION_NAME_PREFIX, Uuid::new_v4().simple())
}

/// How the credential used for signing was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SigningIdentity {
    /// The base credential, signing directly.
    Base { source: &'static str },
    /// Temporary credentials from an OIDC web identity token exchange.
    WebIdentity {
        role_arn: String,
        session_name: String,
        token_file: PathBuf,
    },
    /// Temporary credentials from assuming a role with the base credential.
    AssumedRole {
        role_arn: String,
        session_name: String,
    },
}

/// Role step applied on top of the base credential. At most one is active.
#[derive(Clone, Debug)]
pub(crate) enum RolePlan {
    None,
    WebIdentity {
        role_arn: String,
        session_name: String,
        token_file: PathBuf,
    },
    AssumeRole {
        role_arn: String,
        session_name: String,
    },
}

pub(crate) async fn resolve_region(
    explicit: Option<String>,
    provider: Box<dyn ProvideRegion>,
) -> Result<Region> {
    if let Some(region) = explicit.filter(|r| !r.trim().is_empty()) {
        return Ok(Region::new(region));
    }

    let region = provider.region().await.ok_or_else(|| {
        Error::config("AWS region is required and could not be resolved from the environment")
    })?;
    tracing::debug!("AWS region resolved from provider chain: {}", region);
    Ok(region)
}

async fn resolve_base(
    explicit: Option<SharedCredentialsProvider>,
    static_keys: Option<Credentials>,
    region: Region,
) -> Result<Resolved<SharedCredentialsProvider>> {
    CandidateChain::new("aws")
        .candidate("explicit", || async move { Ok(explicit) })
        .candidate("static_keys", || async move {
            Ok(static_keys.map(SharedCredentialsProvider::new))
        })
        .candidate("default_chain", || async move {
            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            Ok(config.credentials_provider())
        })
        .resolve()
        .await
}

/// Resolve the credential used for signing according to `plan`.
///
/// A web identity exchange is unsigned, so no base credential is resolved for it.
pub(crate) async fn resolve_signing(
    explicit: Option<SharedCredentialsProvider>,
    static_keys: Option<Credentials>,
    plan: RolePlan,
    region: Region,
) -> Result<(SharedCredentialsProvider, SigningIdentity)> {
    match plan {
        RolePlan::WebIdentity {
            role_arn,
            session_name,
            token_file,
        } => {
            if explicit.is_some() || static_keys.is_some() {
                tracing::debug!("Base AWS credential unused by web identity exchange");
            }
            Ok(web_identity(role_arn, session_name, token_file, region))
        }
        RolePlan::AssumeRole {
            role_arn,
            session_name,
        } => {
            let base = resolve_base(explicit, static_keys, region.clone()).await?;
            Ok(assume_role(base, role_arn, session_name, region).await)
        }
        RolePlan::None => {
            let base = resolve_base(explicit, static_keys, region).await?;
            Ok((
                base.value,
                SigningIdentity::Base {
                    source: base.strategy,
                },
            ))
        }
    }
}

fn web_identity(
    role_arn: String,
    session_name: String,
    token_file: PathBuf,
    region: Region,
) -> (SharedCredentialsProvider, SigningIdentity) {
    let provider_config = ProviderConfig::default().with_region(Some(region));
    let provider = WebIdentityTokenCredentialsProvider::builder()
        .static_configuration(StaticConfiguration {
            web_identity_token_file: token_file.clone(),
            role_arn: role_arn.clone(),
            session_name: session_name.clone(),
        })
        .configure(&provider_config)
        .build();

    tracing::info!("Using web identity for role {}", role_arn);
    (
        SharedCredentialsProvider::new(provider),
        SigningIdentity::WebIdentity {
            role_arn,
            session_name,
            token_file,
        },
    )
}

async fn assume_role(
    base: Resolved<SharedCredentialsProvider>,
    role_arn: String,
    session_name: String,
    region: Region,
) -> (SharedCredentialsProvider, SigningIdentity) {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(base.value.clone())
        .load()
        .await;
    let provider = AssumeRoleProvider::builder(role_arn.clone())
        .session_name(session_name.clone())
        .region(region)
        .configure(&sdk_config)
        .build_from_provider(base.value)
        .await;

    tracing::info!(
        "Assuming role {} from {} credentials",
        role_arn,
        base.strategy
    );
    (
        SharedCredentialsProvider::new(provider),
        SigningIdentity::AssumedRole {
            role_arn,
            session_name,
        },
    )
}

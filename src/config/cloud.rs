//! Cloud provider credential configuration.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use super::env::EnvLookup;

/// EKS token settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AwsConfig {
    pub cluster_name: Option<String>,
    /// Falls back to the AWS region provider chain when unset.
    pub region: Option<String>,
    /// Role assumed from the base credential (non-OIDC path).
    pub role_arn: Option<String>,
    pub session_name: Option<String>,
    pub use_oidc_auth: bool,
    pub oidc_role_arn: Option<String>,
    pub oidc_web_identity_token_file: Option<PathBuf>,
    pub oidc_role_session_name: Option<String>,
    pub access_key_id: Option<String>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret_access_key: Option<SecretString>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub session_token: Option<SecretString>,
}

/// AKS token settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AzureConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_secret: Option<SecretString>,
    pub managed_identity_client_id: Option<String>,
}

/// GKE token settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GcpConfig {
    pub service_account_key_path: Option<PathBuf>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl AwsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&EnvLookup::process())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(env: &EnvLookup<F>) -> Self {
        Self {
            cluster_name: env.opt("EKS_CLUSTER_NAME"),
            region: env.with_fallbacks(&["AWS_REGION", "AWS_DEFAULT_REGION"]),
            role_arn: env.opt("EKS_ASSUME_ROLE_ARN"),
            session_name: env.opt("EKS_ROLE_SESSION_NAME"),
            use_oidc_auth: env.flag("EKS_USE_OIDC_AUTH"),
            oidc_role_arn: env.opt("AWS_ROLE_ARN"),
            oidc_web_identity_token_file: env.opt("AWS_WEB_IDENTITY_TOKEN_FILE").map(PathBuf::from),
            oidc_role_session_name: env.opt("AWS_ROLE_SESSION_NAME"),
            access_key_id: None, // Static keys from the environment are read by the default chain
            secret_access_key: None,
            session_token: None,
        }
    }

    /// Builder method to set the cluster name.
    pub fn with_cluster_name(mut self, cluster_name: impl Into<String>) -> Self {
        self.cluster_name = Some(cluster_name.into());
        self
    }

    /// Builder method to set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl AzureConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&EnvLookup::process())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(env: &EnvLookup<F>) -> Self {
        Self {
            tenant_id: env.opt("AZURE_TENANT_ID"),
            client_id: env.opt("AZURE_CLIENT_ID"),
            client_secret: env.opt("AZURE_CLIENT_SECRET").map(SecretString::from),
            managed_identity_client_id: env.opt("AZURE_MANAGED_IDENTITY_CLIENT_ID"),
        }
    }

    pub fn has_client_secret(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl GcpConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&EnvLookup::process())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(env: &EnvLookup<F>) -> Self {
        Self {
            service_account_key_path: env
                .opt("GOOGLE_SERVICE_ACCOUNT_KEY_PATH")
                .map(PathBuf::from),
        }
    }
}

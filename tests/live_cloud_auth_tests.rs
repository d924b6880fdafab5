//! Live Cloud Authentication Tests
//!
//! These tests require real cloud credentials and contact the identity platforms.
//! Run with: cargo test --test live_cloud_auth_tests -- --ignored
//!
//! Configuration is read from the environment:
//!   AWS:   EKS_CLUSTER_NAME plus any AWS credential source
//!   Azure: AZURE_TENANT_ID / AZURE_CLIENT_ID / AZURE_CLIENT_SECRET, or ambient login
//!   GCP:   GOOGLE_SERVICE_ACCOUNT_KEY_PATH, or application default credentials

use kube_cloud_auth::{AuthConfig, AuthProvider, CloudProvider};

async fn mint_from_env(provider: CloudProvider) {
    let auth = AuthConfig::build_from_env(provider)
        .await
        .expect("Failed to build provider from environment");

    let first = auth.token().await.expect("First mint failed");
    assert!(!first.is_empty());
    println!("{} token: {} chars", auth.name(), first.len());

    let header = auth.auth_header().await.expect("Header failed");
    assert!(header.starts_with("Bearer "));

    auth.close().await;
}

// =============================================================================
// AWS EKS
// =============================================================================

#[cfg(feature = "aws")]
#[tokio::test]
#[ignore = "Requires AWS credentials and EKS_CLUSTER_NAME"]
async fn test_live_eks_token() {
    mint_from_env(CloudProvider::Aws).await;
}

// =============================================================================
// Azure AKS
// =============================================================================

#[cfg(feature = "azure")]
#[tokio::test]
#[ignore = "Requires Azure credentials"]
async fn test_live_aks_token() {
    mint_from_env(CloudProvider::Azure).await;
}

#[cfg(feature = "azure")]
#[tokio::test]
#[ignore = "Requires Azure credentials"]
async fn test_live_aks_token_is_cached() {
    let auth = AuthConfig::build_from_env(CloudProvider::Azure)
        .await
        .expect("Failed to build provider");

    let first = auth.token().await.expect("First mint failed");
    assert!(!auth.needs_refresh().await);
    let second = auth.token().await.expect("Cached read failed");
    assert_eq!(first, second);
}

// =============================================================================
// Google GKE
// =============================================================================

#[cfg(feature = "gcp")]
#[tokio::test]
#[ignore = "Requires GCP credentials"]
async fn test_live_gke_token() {
    mint_from_env(CloudProvider::Gcp).await;
}

//! Authentication provider trait.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::Result;

/// Uniform bearer-token interface consumed by Kubernetes API clients.
#[async_trait]
pub trait AuthProvider: Send + Sync + Debug {
    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;

    /// Current token, minting a new one first if the cache is empty or stale.
    async fn token(&self) -> Result<String>;

    /// Whether the next [`token`](Self::token) call would mint.
    async fn needs_refresh(&self) -> bool;

    /// Mint a new token and replace the cached one.
    async fn refresh(&self) -> Result<()>;

    /// Drop the cached token so the next call mints.
    async fn invalidate(&self);

    /// Release the underlying credential handle. Idempotent.
    async fn close(&self);

    /// Authorization scheme.
    fn auth_type(&self) -> &'static str {
        "Bearer"
    }

    /// Value for the `Authorization` header.
    async fn auth_header(&self) -> Result<String> {
        Ok(format!("{} {}", self.auth_type(), self.token().await?))
    }
}

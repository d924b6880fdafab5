//! Token caching and refresh policy shared by every provider.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuthProvider, Token};
use crate::{Error, Result};

/// Safety margin before expiry at which a cached token is treated as stale.
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(60);

/// Provider-specific token minting.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Source name for logging/debugging.
    fn name(&self) -> &'static str;

    /// Obtain a fresh token from the identity platform.
    async fn mint(&self) -> Result<Token>;

    /// Release held credential handles.
    async fn close(&self) {}
}

/// A caching [`AuthProvider`] around any [`TokenSource`].
///
/// The cache lock is only held to read or swap the `Arc<Token>`; minting runs
/// without it, so concurrent stale readers may each mint and the last store wins.
pub struct CachedAuthProvider<S> {
    source: S,
    cache: RwLock<Option<Arc<Token>>>,
    threshold: Duration,
    closed: AtomicBool,
}

impl<S: TokenSource> fmt::Debug for CachedAuthProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedAuthProvider")
            .field("source", &self.source)
            .field("threshold", &self.threshold)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S: TokenSource> CachedAuthProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
            threshold: REFRESH_THRESHOLD,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The currently cached token, if any.
    pub async fn cached(&self) -> Option<Arc<Token>> {
        self.cache.read().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.threshold).unwrap_or(chrono::Duration::MAX)
    }

    async fn mint_and_store(&self) -> Result<Arc<Token>> {
        if self.is_closed() {
            return Err(Error::Closed {
                provider: self.source.name(),
            });
        }

        let token = Arc::new(self.source.mint().await?);
        tracing::debug!(
            provider = self.source.name(),
            expires_at = ?token.expires_at(),
            "Minted new token"
        );

        *self.cache.write().await = Some(Arc::clone(&token));
        Ok(token)
    }
}

#[async_trait]
impl<S: TokenSource> AuthProvider for CachedAuthProvider<S> {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    async fn token(&self) -> Result<String> {
        let cached = self.cached().await;
        if let Some(ref token) = cached
            && !token.needs_refresh(self.threshold())
        {
            return Ok(token.value().to_string());
        }

        match self.mint_and_store().await {
            Ok(token) => Ok(token.value().to_string()),
            Err(e) if e.is_closed() => Err(e),
            Err(e) => match cached {
                Some(token) if token.expires_at().is_some() && !token.is_expired() => {
                    tracing::warn!(
                        provider = self.source.name(),
                        error = %e,
                        "Token refresh failed, serving cached token until it expires"
                    );
                    Ok(token.value().to_string())
                }
                _ => Err(e),
            },
        }
    }

    async fn needs_refresh(&self) -> bool {
        match *self.cache.read().await {
            Some(ref token) => token.needs_refresh(self.threshold()),
            None => true,
        }
    }

    async fn refresh(&self) -> Result<()> {
        self.mint_and_store().await.map(|_| ())
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.source.close().await;
        tracing::debug!(provider = self.source.name(), "Closed auth provider");
    }
}

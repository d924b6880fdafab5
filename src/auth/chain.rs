//! Ordered credential resolution.

use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::{Error, Result};

type Candidate<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<Option<T>>> + Send + 'a>;

/// A credential resolved by a [`CandidateChain`], tagged with the strategy that produced it.
#[derive(Debug)]
pub struct Resolved<T> {
    pub strategy: &'static str,
    pub value: T,
}

/// Tries credential candidates in order until one yields a value.
///
/// A candidate returns `Ok(None)` when it is not configured, which moves on to the
/// next one. An error means the candidate was configured but unusable and stops
/// resolution.
pub struct CandidateChain<'a, T> {
    provider: &'static str,
    candidates: Vec<(&'static str, Candidate<'a, T>)>,
}

impl<'a, T: Send + 'a> CandidateChain<'a, T> {
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            candidates: Vec::new(),
        }
    }

    /// Add a candidate to the end of the chain.
    pub fn candidate<F, Fut>(mut self, strategy: &'static str, candidate: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<Option<T>>> + Send + 'a,
    {
        self.candidates
            .push((strategy, Box::new(move || candidate().boxed())));
        self
    }

    pub async fn resolve(self) -> Result<Resolved<T>> {
        let mut tried = Vec::with_capacity(self.candidates.len());

        for (strategy, candidate) in self.candidates {
            match candidate().await {
                Ok(Some(value)) => {
                    tracing::info!("{} credential resolved from: {}", self.provider, strategy);
                    return Ok(Resolved { strategy, value });
                }
                Ok(None) => {
                    tracing::debug!(
                        "{} credential source {} not configured",
                        self.provider,
                        strategy
                    );
                    tried.push(strategy);
                }
                Err(e) => {
                    tracing::debug!(
                        "{} credential source {} failed: {}",
                        self.provider,
                        strategy,
                        e
                    );
                    return Err(e);
                }
            }
        }

        Err(Error::Config(format!(
            "No {} credential source available. Tried: {}",
            self.provider,
            tried.join(", ")
        )))
    }
}

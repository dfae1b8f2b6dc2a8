use crate::{ClaimStore, Result};
use oumodules_protocol::MessageId;
use std::future::Future;
use std::sync::Arc;

/// Runs work at most once per source message across all bot instances.
#[derive(Clone)]
pub struct ClaimCoordinator {
    store: Arc<dyn ClaimStore>,
}

impl ClaimCoordinator {
    pub fn new(store: Arc<dyn ClaimStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    /// Claim `id` and run `work` under it.
    ///
    /// Returns `Ok(None)` without running anything if another worker holds
    /// the claim. If `work` fails the claim is marked retryable before the
    /// error is returned, so a redelivery can take over.
    pub async fn run_claimed<T, E, F, Fut>(
        &self,
        id: &MessageId,
        work: F,
    ) -> std::result::Result<Option<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<crate::ClaimError>,
    {
        if !self.store.claim(id).await? {
            log::info!("message {id} already claimed, skipping");
            return Ok(None);
        }
        match work().await {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                if let Err(mark_err) = self.store.mark_retryable(id).await {
                    log::error!("could not release claim on {id}: {mark_err}");
                }
                Err(err)
            }
        }
    }

    pub async fn is_claimed(&self, id: &MessageId) -> Result<bool> {
        self.store.is_claimed(id).await
    }
}

use crate::{ClaimError, ClaimRecord, ClaimState, Result};
use async_trait::async_trait;
use oumodules_protocol::MessageId;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Persistent gate keyed by source message id.
///
/// `claim` must be an atomic check-and-create: of any number of concurrent
/// callers for an unclaimed id, exactly one is granted.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Grant the id if it has no record or its record is retryable; the
    /// winner's fresh record is written before returning.
    async fn claim(&self, id: &MessageId) -> Result<bool>;

    /// Let a later delivery of `id` claim it again.
    async fn mark_retryable(&self, id: &MessageId) -> Result<()>;

    /// Whether `id` is held (pending or done) rather than free or retryable.
    async fn is_claimed(&self, id: &MessageId) -> Result<bool>;
}

/// Single-process store, for tests and one-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    records: Mutex<HashMap<MessageId, ClaimRecord>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, id: &MessageId) -> Option<ClaimRecord> {
        self.records.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn claim(&self, id: &MessageId) -> Result<bool> {
        let mut records = self.records.lock().await;
        if !ClaimState::of(records.get(id)).can_be_claimed() {
            return Ok(false);
        }
        records.insert(id.clone(), ClaimRecord::fresh());
        Ok(true)
    }

    async fn mark_retryable(&self, id: &MessageId) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| ClaimError::NotFound(id.to_string()))?;
        record.can_retry = true;
        Ok(())
    }

    async fn is_claimed(&self, id: &MessageId) -> Result<bool> {
        let records = self.records.lock().await;
        Ok(ClaimState::of(records.get(id)) == ClaimState::Claimed)
    }
}

/// Grants everything and remembers nothing. Used when no shared store is
/// configured; duplicate deliveries will produce duplicate replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClaimStore;

#[async_trait]
impl ClaimStore for NoopClaimStore {
    async fn claim(&self, _id: &MessageId) -> Result<bool> {
        Ok(true)
    }

    async fn mark_retryable(&self, _id: &MessageId) -> Result<()> {
        Ok(())
    }

    async fn is_claimed(&self, _id: &MessageId) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn only_one_concurrent_claim_wins() {
        let store = Arc::new(MemoryClaimStore::new());
        let id = MessageId::from(1234u64);
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move { store.claim(&id).await.unwrap() }));
        }
        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }

    #[tokio::test]
    async fn retryable_claim_can_be_taken_again() {
        let store = MemoryClaimStore::new();
        let id = MessageId::from("m1");
        assert!(store.claim(&id).await.unwrap());
        assert!(store.is_claimed(&id).await.unwrap());
        assert!(!store.claim(&id).await.unwrap());

        store.mark_retryable(&id).await.unwrap();
        assert!(!store.is_claimed(&id).await.unwrap());
        assert!(store.claim(&id).await.unwrap());
        assert_eq!(store.record(&id).await.map(|r| r.can_retry), Some(false));
        assert!(!store.claim(&id).await.unwrap());
    }

    #[tokio::test]
    async fn mark_retryable_requires_record() {
        let store = MemoryClaimStore::new();
        let err = store.mark_retryable(&MessageId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, ClaimError::NotFound(_)));
    }

    #[tokio::test]
    async fn noop_store_always_grants() {
        let store = NoopClaimStore;
        let id = MessageId::from("m1");
        assert!(store.claim(&id).await.unwrap());
        assert!(store.claim(&id).await.unwrap());
        assert!(!store.is_claimed(&id).await.unwrap());
        store.mark_retryable(&id).await.unwrap();
    }
}

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persisted per source message. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claimed_at_unix_ms: u64,
    pub can_retry: bool,
}

impl ClaimRecord {
    pub fn fresh() -> Self {
        Self {
            claimed_at_unix_ms: current_unix_ms(),
            can_retry: false,
        }
    }

    pub fn retryable(mut self) -> Self {
        self.can_retry = true;
        self
    }
}

/// What a store knows about one message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Unclaimed,
    /// Held by a worker that is processing it or has finished it.
    Claimed,
    /// The holder failed before replying; the next delivery may take over.
    Retryable,
}

impl ClaimState {
    pub fn of(record: Option<&ClaimRecord>) -> Self {
        match record {
            None => Self::Unclaimed,
            Some(record) if record.can_retry => Self::Retryable,
            Some(_) => Self::Claimed,
        }
    }

    pub fn can_be_claimed(self) -> bool {
        !matches!(self, Self::Claimed)
    }
}

pub(crate) fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

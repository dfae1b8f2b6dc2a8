use lru::LruCache;
use oumodules_protocol::MessageId;
use std::num::NonZeroUsize;
use std::sync::Mutex;

pub const REPLY_CACHE_CAPACITY: usize = 1000;

/// Remembers which reply the bot posted for each recent source message, so
/// an edited source updates that reply instead of posting a second one.
pub struct ReplyTracker<H> {
    replies: Mutex<LruCache<MessageId, H>>,
}

impl<H: Clone> ReplyTracker<H> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            replies: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn record_reply(&self, id: MessageId, handle: H) {
        self.lock().put(id, handle);
    }

    /// Handle of the tracked reply; counts as a use for eviction order.
    pub fn lookup(&self, id: &MessageId) -> Option<H> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<MessageId, H>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<H: Clone> Default for ReplyTracker<H> {
    fn default() -> Self {
        Self::new(REPLY_CACHE_CAPACITY)
    }
}

use crate::format::reply_payload;
use crate::{BotError, ReplyTracker, Result};
use async_trait::async_trait;
use oumodules_claims::ClaimCoordinator;
use oumodules_protocol::{Code, Lookup, MessageId, ReplyPayload};
use oumodules_resolver::{dedup_codes, CodeMatcher, ResolutionEngine};

/// A chat message as far as the bot cares: where it came from and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: Option<String>,
    pub content: String,
}

impl IncomingMessage {
    pub fn new(id: impl Into<MessageId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel_id: None,
            content: content.into(),
        }
    }

    pub fn in_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }
}

/// Where replies go. `Handle` identifies a posted reply for later edits.
#[async_trait]
pub trait ReplySink: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    async fn reply(&self, source: &IncomingMessage, payload: &ReplyPayload)
        -> Result<Self::Handle>;

    async fn edit(&self, handle: &Self::Handle, payload: &ReplyPayload) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No `!CODE` mentions in the text.
    NoMentions,
    /// Another worker holds the claim for this message.
    AlreadyClaimed,
    /// Mentions were looked up but none resolved, so nothing was posted.
    NothingFound,
    Replied,
    Edited,
}

pub struct MessageProcessor<S: ReplySink> {
    matcher: CodeMatcher,
    engine: ResolutionEngine,
    claims: ClaimCoordinator,
    tracker: ReplyTracker<S::Handle>,
    sink: S,
}

impl<S: ReplySink> MessageProcessor<S> {
    pub fn new(engine: ResolutionEngine, claims: ClaimCoordinator, sink: S) -> Self {
        Self {
            matcher: CodeMatcher::mentions(),
            engine,
            claims,
            tracker: ReplyTracker::default(),
            sink,
        }
    }

    pub fn with_tracker(mut self, tracker: ReplyTracker<S::Handle>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &ReplyTracker<S::Handle> {
        &self.tracker
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handle a new or edited message.
    ///
    /// An edit of a message we already answered is reprocessed without a
    /// fresh claim and updates the earlier reply. Everything else goes
    /// through the claim gate; a failure after claiming leaves the claim
    /// retryable.
    pub async fn process(&self, message: &IncomingMessage) -> Result<Outcome> {
        let codes = self.matcher.find(&message.content);
        if codes.is_empty() {
            return Ok(Outcome::NoMentions);
        }
        let codes = dedup_codes(codes);

        if self.tracker.contains(&message.id) && self.claims.is_claimed(&message.id).await? {
            log::debug!("message {} was edited, updating reply", message.id);
            return self.resolve_and_post(message, &codes).await;
        }

        let outcome = self
            .claims
            .run_claimed(&message.id, || self.resolve_and_post(message, &codes))
            .await?;
        Ok(outcome.unwrap_or(Outcome::AlreadyClaimed))
    }

    async fn resolve_and_post(&self, message: &IncomingMessage, codes: &[Code]) -> Result<Outcome> {
        let lookups = self.engine.resolve_all(codes).await;
        if !lookups.iter().any(Lookup::is_found) {
            log::info!("no results for {} code(s) in message {}", codes.len(), message.id);
            return Ok(Outcome::NothingFound);
        }
        let results: Vec<_> = lookups.iter().map(Lookup::to_display).collect();
        let payload = reply_payload(&results)
            .ok_or_else(|| BotError::Reply("no results to post".to_string()))?;

        if let Some(handle) = self.tracker.lookup(&message.id) {
            self.sink.edit(&handle, &payload).await?;
            return Ok(Outcome::Edited);
        }
        let handle = self.sink.reply(message, &payload).await?;
        self.tracker.record_reply(message.id.clone(), handle);
        Ok(Outcome::Replied)
    }
}

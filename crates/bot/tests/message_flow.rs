use async_trait::async_trait;
use oumodules_bot::{BotError, IncomingMessage, MessageProcessor, Outcome, ReplySink, Result};
use oumodules_claims::{ClaimCoordinator, ClaimStore, MemoryClaimStore};
use oumodules_protocol::{CacheEntry, Code, EmbedField, MessageId, ReplyPayload};
use oumodules_resolver::{MemoryCache, ResolutionEngine, ResolverConfig};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

#[derive(Default)]
struct RecordingSink {
    replies: Mutex<Vec<(MessageId, ReplyPayload)>>,
    edits: Mutex<Vec<(usize, ReplyPayload)>>,
    fail_next: AtomicBool,
}

impl RecordingSink {
    fn replies(&self) -> Vec<(MessageId, ReplyPayload)> {
        self.replies.lock().unwrap().clone()
    }

    fn edits(&self) -> Vec<(usize, ReplyPayload)> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    type Handle = usize;

    async fn reply(&self, source: &IncomingMessage, payload: &ReplyPayload) -> Result<usize> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BotError::Reply("channel unavailable".into()));
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((source.id.clone(), payload.clone()));
        Ok(replies.len() - 1)
    }

    async fn edit(&self, handle: &usize, payload: &ReplyPayload) -> Result<()> {
        self.edits.lock().unwrap().push((*handle, payload.clone()));
        Ok(())
    }
}

fn code(raw: &str) -> Code {
    Code::parse(raw).unwrap()
}

/// Engine whose cache knows a few codes; everything else hits a mock server
/// that answers 404, so unknown codes resolve to nothing.
async fn engine(server: &MockServer) -> ResolutionEngine {
    let cache = Arc::new(MemoryCache::from_entries([
        (code("A123"), CacheEntry::new("Mocked active module", Some("url1".into()))),
        (
            code("M269"),
            CacheEntry::new(
                "Algorithms, data structures and computability",
                Some("url2".into()),
            ),
        ),
        (code("TM111"), CacheEntry::new("Introduction to computing", Some("url3".into()))),
    ]));
    let config = ResolverConfig {
        probe_timeout_ms: 500,
        fetch_timeout_ms: 1_000,
        strategy_timeout_ms: 2_000,
        probe_retries: 0,
        ..ResolverConfig::with_base_url(&server.uri())
    };
    ResolutionEngine::from_config(&config, cache).unwrap()
}

async fn processor(
    server: &MockServer,
    store: Arc<dyn ClaimStore>,
) -> MessageProcessor<RecordingSink> {
    MessageProcessor::new(
        engine(server).await,
        ClaimCoordinator::new(store),
        RecordingSink::default(),
    )
}

#[tokio::test]
async fn single_mention_gets_plain_reply() {
    let server = MockServer::start().await;
    let processor = processor(&server, Arc::new(MemoryClaimStore::new())).await;

    let outcome = processor
        .process(&IncomingMessage::new(1u64, "anyone done !a123 yet?"))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Replied);
    assert_eq!(
        processor.sink().replies(),
        vec![(
            MessageId::from(1u64),
            ReplyPayload::text("A123: Mocked active module (url1)")
        )]
    );
}

#[tokio::test]
async fn several_mentions_become_embed_fields() {
    let server = MockServer::start().await;
    let processor = processor(&server, Arc::new(MemoryClaimStore::new())).await;

    let outcome = processor
        .process(&IncomingMessage::new("2", "!M269 then !ZZ999, or !m269 again"))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Replied);

    let replies = processor.sink().replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(
        replies[0].1.embed_fields,
        vec![
            EmbedField {
                name: "M269".into(),
                value: "* [Algorithms, data structures and computability](<url2>)".into(),
                inline: true,
            },
            EmbedField {
                name: "ZZ999".into(),
                value: "* not found".into(),
                inline: true,
            },
        ]
    );
    assert!(replies[0].1.content.is_empty());
}

#[tokio::test]
async fn nothing_is_posted_without_mentions_or_results() {
    let server = MockServer::start().await;
    let processor = processor(&server, Arc::new(MemoryClaimStore::new())).await;

    let quiet = processor
        .process(&IncomingMessage::new("3", "M269 without the marker"))
        .await
        .unwrap();
    assert_eq!(quiet, Outcome::NoMentions);

    let unknown = processor
        .process(&IncomingMessage::new("4", "what is !ZZ999?"))
        .await
        .unwrap();
    assert_eq!(unknown, Outcome::NothingFound);
    assert!(processor.sink().replies().is_empty());
}

#[tokio::test]
async fn edited_message_updates_tracked_reply() {
    let server = MockServer::start().await;
    let processor = processor(&server, Arc::new(MemoryClaimStore::new())).await;

    let first = processor
        .process(&IncomingMessage::new("5", "!A123"))
        .await
        .unwrap();
    assert_eq!(first, Outcome::Replied);

    let edited = processor
        .process(&IncomingMessage::new("5", "sorry, I meant !TM111"))
        .await
        .unwrap();
    assert_eq!(edited, Outcome::Edited);

    assert_eq!(processor.sink().replies().len(), 1);
    assert_eq!(
        processor.sink().edits(),
        vec![(0, ReplyPayload::text("TM111: Introduction to computing (url3)"))]
    );
}

#[tokio::test]
async fn second_instance_does_not_reply_twice() {
    let server = MockServer::start().await;
    let store: Arc<dyn ClaimStore> = Arc::new(MemoryClaimStore::new());
    let first = processor(&server, Arc::clone(&store)).await;
    let second = processor(&server, Arc::clone(&store)).await;
    let message = IncomingMessage::new("6", "!A123");

    assert_eq!(first.process(&message).await.unwrap(), Outcome::Replied);
    assert_eq!(second.process(&message).await.unwrap(), Outcome::AlreadyClaimed);
    assert!(second.sink().replies().is_empty());
}

#[tokio::test]
async fn failed_reply_can_be_retried() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryClaimStore::new());
    let processor = processor(&server, store.clone()).await;
    let message = IncomingMessage::new("7", "!A123");

    processor.sink().fail_next.store(true, Ordering::SeqCst);
    let err = processor.process(&message).await.unwrap_err();
    assert!(matches!(err, BotError::Reply(_)));
    assert_eq!(store.record(&message.id).await.map(|r| r.can_retry), Some(true));

    assert_eq!(processor.process(&message).await.unwrap(), Outcome::Replied);
    assert_eq!(processor.sink().replies().len(), 1);
}

#[tokio::test]
async fn mentions_beyond_limit_are_ignored() {
    let server = MockServer::start().await;
    let processor = processor(&server, Arc::new(MemoryClaimStore::new())).await;

    let outcome = processor
        .process(&IncomingMessage::new(
            "8",
            "!ZZ991 !ZZ992 !ZZ993 !ZZ994 !ZZ995 !A123",
        ))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NothingFound);
}

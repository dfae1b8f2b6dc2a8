//! # OU Modules Bot
//!
//! Turns chat messages into replies:
//!
//! ```text
//! IncomingMessage ─> CodeMatcher ─> ClaimCoordinator ─> ResolutionEngine
//!                                                          │
//!                    ReplySink <─ ReplyTracker <─ format ──┘
//!                (reply or edit)  (create vs edit)
//! ```
//!
//! Message commands take a separate path through [`InteractionHandler`],
//! answering from the cache when possible and deferring otherwise.

mod config;
mod discord;
mod error;
mod format;
mod interaction;
mod processor;
mod tracker;

pub use config::{
    BotConfig, ClaimBackend, CACHE_ENV, CLAIMS_DIR_ENV, CONFIG_FILE, DEFAULT_APPLICATION_ID,
    DEFAULT_CLAIMS_DIR, DISABLE_CLAIMS_ENV, TOKEN_ENV,
};
pub use discord::{DiscordClient, InteractionWebhook, PostedMessage, DEFAULT_API_URL};
pub use error::{BotError, Result};
pub use format::{embed_fields, format_result, reply_payload};
pub use interaction::{
    message_body, ActionRow, Button, CommandData, Embed, FollowUpSink, Interaction,
    InteractionHandler, InteractionResponse, MessageBody, Resolved, TargetMessage,
    CHANNEL_MESSAGE_WITH_SOURCE, DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE, EPHEMERAL,
};
pub use processor::{IncomingMessage, MessageProcessor, Outcome, ReplySink};
pub use tracker::{ReplyTracker, REPLY_CACHE_CAPACITY};

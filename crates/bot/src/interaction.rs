//! Responses to the "find modules" message command.
//!
//! A command invoked on a message must be answered quickly. When every code
//! in the target message is already cached the answer is sent straight away;
//! otherwise a deferred acknowledgement is returned and [`InteractionHandler::follow_up`]
//! builds the body that replaces it once resolution finishes, then hands it to
//! a [`FollowUpSink`] while the claim is still held.

use crate::format::format_result;
use crate::{BotError, Result};
use async_trait::async_trait;
use oumodules_claims::ClaimCoordinator;
use oumodules_protocol::{Code, EmbedField, Lookup, MessageId, ModuleResult};
use oumodules_resolver::{CodeMatcher, ResolutionEngine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
pub const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;
pub const EPHEMERAL: u32 = 1 << 6;

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
const LINK_STYLE: u8 = 5;
const JUMP_LABEL: &str = "Jump to referenced message";
const NO_MODULES: &str = "No modules found.";
const MULTIPLE_RESULTS: &str = "Multiple results found.";
const DIRECT_MESSAGES: &str = "@me";

/// The subset of an application-command interaction we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub data: CommandData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub target_id: String,
    #[serde(default)]
    pub resolved: Resolved,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub messages: HashMap<String, TargetMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetMessage {
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
}

impl Interaction {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn target_message(&self) -> Result<&TargetMessage> {
        self.data
            .resolved
            .messages
            .get(&self.data.target_id)
            .ok_or_else(|| {
                BotError::InvalidInteraction(format!(
                    "target message {} is not in resolved data",
                    self.data.target_id
                ))
            })
    }

    /// Claim key for the follow-up. The same message may be the target of
    /// several interactions, each of which deserves its own answer.
    pub fn claim_key(&self) -> MessageId {
        MessageId::new(format!("{}_{}", self.data.target_id, self.id))
    }

    pub fn jump_url(&self) -> Result<String> {
        let channel_id = &self.target_message()?.channel_id;
        let guild_id = self.guild_id.as_deref().unwrap_or(DIRECT_MESSAGES);
        Ok(format!(
            "https://discord.com/channels/{guild_id}/{channel_id}/{}",
            self.data.target_id
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageBody>,
}

impl InteractionResponse {
    pub fn is_deferred(&self) -> bool {
        self.kind == DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageBody {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub url: String,
}

fn jump_button_row(url: String) -> ActionRow {
    ActionRow {
        kind: ACTION_ROW,
        components: vec![Button {
            kind: BUTTON,
            style: LINK_STYLE,
            label: JUMP_LABEL.to_string(),
            url,
        }],
    }
}

/// Message body for a set of results, with a link back to the target.
pub fn message_body(results: &[ModuleResult], jump_url: String) -> MessageBody {
    let components = vec![jump_button_row(jump_url)];
    match results {
        [] => MessageBody {
            content: NO_MODULES.to_string(),
            embeds: Vec::new(),
            flags: Some(EPHEMERAL),
            components,
        },
        [single] => MessageBody {
            content: format_result(single, false),
            embeds: Vec::new(),
            flags: None,
            components,
        },
        many => MessageBody {
            content: MULTIPLE_RESULTS.to_string(),
            embeds: vec![Embed {
                fields: many
                    .iter()
                    .map(|result| EmbedField {
                        name: result.code.to_string(),
                        value: format_result(result, true),
                        inline: false,
                    })
                    .collect(),
            }],
            flags: None,
            components,
        },
    }
}

/// Delivers the body that replaces a deferred acknowledgement.
#[async_trait]
pub trait FollowUpSink: Send + Sync {
    async fn send_follow_up(&self, interaction: &Interaction, body: &MessageBody) -> Result<()>;
}

/// Answers message-command interactions. Codes in the target message are
/// matched without the `!` marker.
pub struct InteractionHandler {
    matcher: CodeMatcher,
    engine: ResolutionEngine,
    claims: ClaimCoordinator,
}

impl InteractionHandler {
    pub fn new(engine: ResolutionEngine, claims: ClaimCoordinator) -> Self {
        Self {
            matcher: CodeMatcher::bare(),
            engine,
            claims,
        }
    }

    fn codes(&self, interaction: &Interaction) -> Result<Vec<Code>> {
        let message = interaction.target_message()?;
        Ok(self.matcher.find_unique(&message.content))
    }

    /// Immediate response: the full answer if the cache covers every code,
    /// a deferred acknowledgement otherwise.
    pub fn respond(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let codes = self.codes(interaction)?;
        let cache = self.engine.cache();
        let mut results = Vec::with_capacity(codes.len());
        for code in codes {
            match cache.get(&code) {
                Some(entry) => results.push(entry.into_result(code)),
                None => {
                    log::info!("{code} not cached, deferring interaction {}", interaction.id);
                    return Ok(InteractionResponse {
                        kind: DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
                        data: None,
                    });
                }
            }
        }
        Ok(InteractionResponse {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(message_body(&results, interaction.jump_url()?)),
        })
    }

    /// Resolve the target's codes and send the body that replaces a deferred
    /// acknowledgement. Returns the body sent, or `None` when another instance
    /// already claimed this interaction. A failed send leaves the claim
    /// retryable.
    pub async fn follow_up<S>(
        &self,
        interaction: &Interaction,
        sink: &S,
    ) -> Result<Option<MessageBody>>
    where
        S: FollowUpSink + ?Sized,
    {
        let codes = self.codes(interaction)?;
        let jump_url = interaction.jump_url()?;
        let key = interaction.claim_key();
        self.claims
            .run_claimed(&key, || async {
                let lookups = self.engine.resolve_all(&codes).await;
                let results: Vec<_> = lookups.iter().map(Lookup::to_display).collect();
                let body = message_body(&results, jump_url);
                sink.send_follow_up(interaction, &body).await?;
                Ok::<_, BotError>(body)
            })
            .await
    }
}

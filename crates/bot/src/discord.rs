//! Discord REST calls for posting and editing replies.

use crate::interaction::{FollowUpSink, Interaction, MessageBody};
use crate::processor::{IncomingMessage, ReplySink};
use crate::{BotError, Result};
use async_trait::async_trait;
use oumodules_protocol::{EmbedField, ReplyPayload};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// A reply the bot posted, addressable for edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel_id: String,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
struct MessageReference<'a> {
    message_id: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedBody<'a> {
    fields: &'a [EmbedField],
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    content: &'a str,
    embeds: Vec<EmbedBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_reference: Option<MessageReference<'a>>,
}

impl<'a> MessageRequest<'a> {
    fn new(payload: &'a ReplyPayload) -> Self {
        // An empty embed list on edit clears the embed of an earlier
        // multi-result reply.
        let embeds = if payload.has_embed() {
            vec![EmbedBody {
                fields: &payload.embed_fields,
            }]
        } else {
            Vec::new()
        };
        Self {
            content: &payload.content,
            embeds,
            message_reference: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
    channel_id: String,
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

impl DiscordClient {
    pub fn new(base_url: &str, bot_token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("ou-modules-bot/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let bot_token = bot_token.strip_prefix("Bot ").unwrap_or(bot_token).to_string();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token,
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Replace the deferred acknowledgement of an interaction. Interaction
    /// webhooks authenticate with the interaction token, not the bot token.
    pub async fn edit_original_interaction(
        &self,
        application_id: u64,
        interaction_token: &str,
        body: &MessageBody,
    ) -> Result<()> {
        let url = format!(
            "{}/webhooks/{application_id}/{interaction_token}/messages/@original",
            self.base_url
        );
        log::debug!("editing original response of interaction via {url}");
        let response = self.client.patch(&url).json(body).send().await?;
        check(response).await.map(drop)
    }
}

/// Sends interaction follow-ups through the application's webhook.
#[derive(Debug, Clone)]
pub struct InteractionWebhook {
    client: DiscordClient,
    application_id: u64,
}

impl InteractionWebhook {
    pub fn new(client: DiscordClient, application_id: u64) -> Self {
        Self {
            client,
            application_id,
        }
    }
}

#[async_trait]
impl FollowUpSink for InteractionWebhook {
    async fn send_follow_up(&self, interaction: &Interaction, body: &MessageBody) -> Result<()> {
        self.client
            .edit_original_interaction(self.application_id, &interaction.token, body)
            .await?;
        log::info!("follow-up sent for interaction {}", interaction.id);
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    #[derive(Deserialize)]
    struct ApiError {
        message: Option<String>,
    }
    let bytes = response.bytes().await?;
    let message = serde_json::from_slice::<ApiError>(&bytes)
        .ok()
        .and_then(|err| err.message)
        .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
    Err(BotError::Discord {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ReplySink for DiscordClient {
    type Handle = PostedMessage;

    async fn reply(
        &self,
        source: &IncomingMessage,
        payload: &ReplyPayload,
    ) -> Result<PostedMessage> {
        let channel_id = source.channel_id.as_deref().ok_or_else(|| {
            BotError::Reply(format!("message {} has no channel to reply in", source.id))
        })?;
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let mut request = MessageRequest::new(payload);
        request.message_reference = Some(MessageReference {
            message_id: source.id.as_str(),
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&request)
            .send()
            .await?;
        let created: CreatedMessage = check(response).await?.json().await?;
        log::info!("replied to {} with message {}", source.id, created.id);
        Ok(PostedMessage {
            channel_id: created.channel_id,
            message_id: created.id,
        })
    }

    async fn edit(&self, handle: &PostedMessage, payload: &ReplyPayload) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, handle.channel_id, handle.message_id
        );
        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.auth())
            .json(&MessageRequest::new(payload))
            .send()
            .await?;
        check(response).await?;
        log::info!("edited reply {}", handle.message_id);
        Ok(())
    }
}

use async_trait::async_trait;
use oumodules_bot::{
    BotError, FollowUpSink, IncomingMessage, Interaction, MessageBody, ReplySink, Result,
};
use oumodules_protocol::{serialize_json_pretty, ReplyPayload};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prints replies instead of posting them. Handles are sequence numbers.
#[derive(Debug, Default)]
pub struct StdoutSink {
    next: AtomicU64,
}

pub(crate) fn render_payload(payload: &ReplyPayload) -> String {
    if !payload.has_embed() {
        return payload.content.clone();
    }
    payload
        .embed_fields
        .iter()
        .map(|field| format!("{}\t{}", field.name, field.value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ReplySink for StdoutSink {
    type Handle = u64;

    async fn reply(&self, source: &IncomingMessage, payload: &ReplyPayload) -> Result<u64> {
        let handle = self.next.fetch_add(1, Ordering::Relaxed);
        log::debug!("reply #{handle} to message {}", source.id);
        crate::print_stdout(&render_payload(payload))?;
        Ok(handle)
    }

    async fn edit(&self, handle: &u64, payload: &ReplyPayload) -> Result<()> {
        log::debug!("editing reply #{handle}");
        crate::print_stdout(&render_payload(payload))?;
        Ok(())
    }
}

#[async_trait]
impl FollowUpSink for StdoutSink {
    async fn send_follow_up(&self, interaction: &Interaction, body: &MessageBody) -> Result<()> {
        log::debug!("follow-up for interaction {}", interaction.id);
        let json = serialize_json_pretty(body).map_err(|err| BotError::Reply(err.to_string()))?;
        crate::print_stdout(&json)?;
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the chat message that triggered a lookup. Interaction
/// follow-ups use a composite `{target}_{interaction}` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Body of a reply to post or edit. Several results go to `embed_fields`
/// and leave `content` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embed_fields: Vec<EmbedField>,
}

impl ReplyPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embed_fields: Vec::new(),
        }
    }

    pub fn fields(embed_fields: Vec<EmbedField>) -> Self {
        Self {
            content: String::new(),
            embed_fields,
        }
    }

    pub fn has_embed(&self) -> bool {
        !self.embed_fields.is_empty()
    }
}

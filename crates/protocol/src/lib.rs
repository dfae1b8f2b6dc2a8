//! # OU Modules Protocol
//!
//! Types shared by the resolver, the claim stores and the bot: validated
//! course codes, lookup results, cache entries and reply payloads.

use anyhow::Result;
use serde::Serialize;

mod code;
mod reply;
mod result;

pub use code::{
    Code, CodeKind, InvalidCode, CODE_PATTERN, MODULE_CODE_PATTERN, QUALIFICATION_CODE_PATTERN,
};
pub use reply::{EmbedField, MessageId, ReplyPayload};
pub use result::{CacheEntry, Lookup, ModuleResult, NOT_FOUND_TITLE};

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

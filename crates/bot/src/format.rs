use oumodules_protocol::{EmbedField, ModuleResult, ReplyPayload};
use oumodules_resolver::MENTION_MARKER;

/// Render one result for posting.
///
/// Plain: `CODE: title (url)` or `CODE: title`. Embed field value:
/// `* [title](<url>)` or `* title`. The mention marker is always removed so
/// the reply cannot trigger this or another bot instance again.
pub fn format_result(result: &ModuleResult, for_embed: bool) -> String {
    let text = match (for_embed, &result.url) {
        (false, Some(url)) => format!("{}: {} ({url})", result.code, result.title),
        (false, None) => format!("{}: {}", result.code, result.title),
        (true, Some(url)) => format!("* [{}](<{url}>)", result.title),
        (true, None) => format!("* {}", result.title),
    };
    text.replace(MENTION_MARKER, "")
}

/// One inline field per result, named by code.
pub fn embed_fields(results: &[ModuleResult]) -> Vec<EmbedField> {
    results
        .iter()
        .map(|result| EmbedField {
            name: result.code.to_string(),
            value: format_result(result, true),
            inline: true,
        })
        .collect()
}

/// A single result goes in the message text, several go in embed fields.
/// `None` when there is nothing to post.
pub fn reply_payload(results: &[ModuleResult]) -> Option<ReplyPayload> {
    match results {
        [] => None,
        [single] => Some(ReplyPayload::text(format_result(single, false))),
        many => Some(ReplyPayload::fields(embed_fields(many))),
    }
}

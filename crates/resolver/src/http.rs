use crate::{ResolverConfig, Result};
use reqwest::Client;

/// Shared client for probes and fetches. Redirects are followed with the
/// reqwest default policy; per-request timeouts are set by the callers.
pub fn build_client(config: &ResolverConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

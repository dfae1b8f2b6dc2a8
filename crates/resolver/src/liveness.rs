use crate::UrlTemplates;
use oumodules_protocol::Code;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Decides whether a constructed URL is the live page for a code.
///
/// The site answers unknown codes with a redirect to a generic listing, so a
/// 200 alone is not enough: the final URL must still mention the code.
#[derive(Debug, Clone)]
pub struct LivenessChecker {
    client: Client,
    templates: UrlTemplates,
    timeout: Duration,
    retries: u32,
}

impl LivenessChecker {
    pub fn new(client: Client, templates: UrlTemplates, timeout: Duration, retries: u32) -> Self {
        Self {
            client,
            templates,
            timeout,
            retries,
        }
    }

    pub fn templates(&self) -> &UrlTemplates {
        &self.templates
    }

    pub async fn is_active(&self, url: &str, code: &Code) -> bool {
        let slug = code.slug();
        let mut attempt = 0u32;
        loop {
            let sent = self.client.head(url).timeout(self.timeout).send().await;
            match sent {
                Ok(response) => {
                    let final_url = response.url();
                    let correct_redirect = final_url.path().to_ascii_lowercase().contains(&slug);
                    let active = correct_redirect && response.status() == StatusCode::OK;
                    log::debug!(
                        "probe {url} -> {} {} (active={active})",
                        final_url,
                        response.status()
                    );
                    return active;
                }
                Err(err) if err.is_timeout() => {
                    log::warn!("probe {url} timed out");
                    return false;
                }
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    log::debug!(
                        "probe {url} failed ({err}), retrying ({attempt}/{})",
                        self.retries
                    );
                }
                Err(err) => {
                    log::warn!("probe {url} failed: {err}");
                    return false;
                }
            }
        }
    }

    /// First live candidate URL for `code`, probing in template order.
    pub async fn first_active_candidate(&self, code: &Code) -> Option<String> {
        let candidates = match self.templates.candidates(code) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::error!("cannot build candidate URLs for {code}: {err}");
                return None;
            }
        };
        for url in candidates {
            if self.is_active(&url, code).await {
                return Some(url);
            }
        }
        None
    }
}

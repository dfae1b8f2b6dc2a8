use crate::html::{find_archive_title, find_title_in_html};
use crate::{LivenessChecker, ModuleCache, SparqlClient};
use async_trait::async_trait;
use oumodules_protocol::{Code, ModuleResult};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// One external source of titles. Failures are absorbed and reported as
/// `None`; a strategy must be safe to abort at any await point.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, code: &Code) -> Option<ModuleResult>;
}

/// Exact-match query against the current and legacy catalogues.
pub struct SparqlStrategy {
    client: SparqlClient,
}

impl SparqlStrategy {
    pub fn new(client: SparqlClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupStrategy for SparqlStrategy {
    fn name(&self) -> &'static str {
        "sparql"
    }

    async fn lookup(&self, code: &Code) -> Option<ModuleResult> {
        match self.client.find_module_or_qualification(code).await {
            Ok(found) => found,
            Err(err) => {
                log::warn!("SPARQL lookup for {code} failed: {err}");
                None
            }
        }
    }
}

/// Confirms a course page is live, then reads the name from its `<title>`.
/// Some codes were missing from the catalogues but still have pages.
pub struct ScrapeStrategy {
    client: Client,
    liveness: Arc<LivenessChecker>,
    cache: Arc<dyn ModuleCache>,
    timeout: Duration,
}

impl ScrapeStrategy {
    pub fn new(
        client: Client,
        liveness: Arc<LivenessChecker>,
        cache: Arc<dyn ModuleCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            liveness,
            cache,
            timeout,
        }
    }

    /// Cached url if there is one, otherwise the first live candidate.
    async fn active_url_for(&self, code: &Code) -> Option<String> {
        if let Some(url) = self.cache.get(code).and_then(|entry| entry.url) {
            return Some(url);
        }
        self.liveness.first_active_candidate(code).await
    }

    async fn fetch(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .text()
            .await
    }
}

#[async_trait]
impl LookupStrategy for ScrapeStrategy {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn lookup(&self, code: &Code) -> Option<ModuleResult> {
        let Some(url) = self.active_url_for(code).await else {
            log::info!("{code} can't be found via module URL");
            return None;
        };
        let html = match self.fetch(&url).await {
            Ok(html) => html,
            Err(err) if err.is_timeout() => {
                log::warn!("{url} timed out");
                return None;
            }
            Err(err) => {
                log::warn!("failed fetching {url}: {err}");
                return None;
            }
        };
        match find_title_in_html(&html) {
            Some(title) => {
                log::info!("{code} found via {url}");
                Some(ModuleResult::new(code.clone(), title, Some(url)))
            }
            None => {
                log::info!("{url} is live but its title has no recognisable name");
                None
            }
        }
    }
}

/// Last resort for discontinued modules. Archive pages are not course pages,
/// so results carry no url.
pub struct ArchiveStrategy {
    client: Client,
    url_template: String,
    timeout: Duration,
}

impl ArchiveStrategy {
    pub fn new(client: Client, url_template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url_template: url_template.into(),
            timeout,
        }
    }

    fn url_for(&self, code: &Code) -> String {
        self.url_template.replace("{}", code.as_str())
    }
}

#[async_trait]
impl LookupStrategy for ArchiveStrategy {
    fn name(&self) -> &'static str {
        "archive"
    }

    async fn lookup(&self, code: &Code) -> Option<ModuleResult> {
        let url = self.url_for(code);
        log::debug!("trying {url}");
        let sent = self.client.get(&url).timeout(self.timeout).send().await;
        let body = match sent {
            Ok(response) => response.bytes().await,
            Err(err) => Err(err),
        };
        let bytes = match body {
            Ok(bytes) => bytes,
            Err(err) if err.is_timeout() => {
                log::warn!("archive timeout for {code}");
                return None;
            }
            Err(err) => {
                log::warn!("failed fetching {url}: {err}");
                return None;
            }
        };
        let html = match std::str::from_utf8(&bytes) {
            Ok(html) => html,
            Err(err) => {
                log::warn!("archive page for {code} is not UTF-8: {err}");
                return None;
            }
        };
        match find_archive_title(html) {
            Some(title) => {
                log::info!("{code} found via archive");
                Some(ModuleResult::new(code.clone(), title, None))
            }
            None => {
                log::info!("{code} can't be found via {url}");
                None
            }
        }
    }
}

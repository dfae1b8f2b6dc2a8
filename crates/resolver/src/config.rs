use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the external strategies are combined once the cache misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// Run every strategy at once and take the first hit.
    #[default]
    Race,
    /// Query, scrape, archive; one after the other.
    Sequential,
}

/// Endpoints and budgets for the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Root of the public course pages, without trailing slash
    pub site_base_url: String,

    /// SPARQL endpoint of the open data service
    pub sparql_endpoint: String,

    /// Digital archive page, `{}` is replaced with the code
    pub archive_url_template: String,

    /// Budget for a single liveness probe
    pub probe_timeout_ms: u64,

    /// Extra attempts after a connection failure (timeouts are not retried)
    pub probe_retries: u32,

    /// Budget for page, query and archive fetches
    pub fetch_timeout_ms: u64,

    /// Upper bound for one strategy, probes included
    pub strategy_timeout_ms: u64,

    pub lookup_mode: LookupMode,

    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            site_base_url: "http://www.open.ac.uk".to_string(),
            sparql_endpoint: "http://data.open.ac.uk/sparql".to_string(),
            archive_url_template: "http://www.open.ac.uk/library/digital-archive/module/xcri:{}"
                .to_string(),
            probe_timeout_ms: 3_000,
            probe_retries: 1,
            fetch_timeout_ms: 10_000,
            strategy_timeout_ms: 20_000,
            lookup_mode: LookupMode::Race,
            user_agent: format!(
                "ou-modules-bot / {} (https://modules-bot.ou-stem.club/)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl ResolverConfig {
    /// Point every endpoint at one host, keeping the default paths.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            site_base_url: base.to_string(),
            sparql_endpoint: format!("{base}/sparql"),
            archive_url_template: format!("{base}/library/digital-archive/module/xcri:{{}}"),
            ..Default::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.archive_url_template.contains("{}") {
            return Err(format!(
                "archive_url_template ({}) must contain a {{}} placeholder",
                self.archive_url_template
            ));
        }
        if self.probe_timeout_ms == 0 || self.fetch_timeout_ms == 0 {
            return Err("probe and fetch timeouts must be > 0".to_string());
        }
        if self.strategy_timeout_ms < self.probe_timeout_ms {
            return Err(format!(
                "strategy_timeout_ms ({}) cannot be below probe_timeout_ms ({})",
                self.strategy_timeout_ms, self.probe_timeout_ms
            ));
        }
        Ok(())
    }
}

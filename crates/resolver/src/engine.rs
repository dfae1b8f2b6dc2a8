use crate::http::build_client;
use crate::{
    ArchiveStrategy, LivenessChecker, LookupMode, LookupStrategy, ModuleCache, ResolverConfig,
    ResolverError, Result, ScrapeStrategy, SparqlClient, SparqlStrategy, UrlTemplates,
};
use oumodules_protocol::{CacheEntry, Code, Lookup, ModuleResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Resolves codes: cache first, then the external strategies.
///
/// Cheap to clone; all state lives behind `Arc`s.
#[derive(Clone)]
pub struct ResolutionEngine {
    cache: Arc<dyn ModuleCache>,
    liveness: Arc<LivenessChecker>,
    strategies: Vec<Arc<dyn LookupStrategy>>,
    strategy_timeout: Duration,
    mode: LookupMode,
}

impl ResolutionEngine {
    /// Strategies are listed in precedence order; in [`LookupMode::Sequential`]
    /// they run in that order.
    pub fn new(
        cache: Arc<dyn ModuleCache>,
        liveness: Arc<LivenessChecker>,
        strategies: Vec<Arc<dyn LookupStrategy>>,
        strategy_timeout: Duration,
        mode: LookupMode,
    ) -> Self {
        Self {
            cache,
            liveness,
            strategies,
            strategy_timeout,
            mode,
        }
    }

    /// Engine with the SPARQL, scrape and archive strategies wired to the
    /// endpoints in `config`.
    pub fn from_config(config: &ResolverConfig, cache: Arc<dyn ModuleCache>) -> Result<Self> {
        config.validate().map_err(ResolverError::Other)?;
        let client = build_client(config)?;
        let liveness = Arc::new(LivenessChecker::new(
            client.clone(),
            UrlTemplates::new(config.site_base_url.clone()),
            config.probe_timeout(),
            config.probe_retries,
        ));
        let sparql = SparqlClient::new(
            client.clone(),
            config.sparql_endpoint.clone(),
            config.fetch_timeout(),
        );
        let strategies: Vec<Arc<dyn LookupStrategy>> = vec![
            Arc::new(SparqlStrategy::new(sparql)),
            Arc::new(ScrapeStrategy::new(
                client.clone(),
                Arc::clone(&liveness),
                Arc::clone(&cache),
                config.fetch_timeout(),
            )),
            Arc::new(ArchiveStrategy::new(
                client,
                config.archive_url_template.clone(),
                config.fetch_timeout(),
            )),
        ];
        Ok(Self::new(
            cache,
            liveness,
            strategies,
            config.strategy_timeout(),
            config.lookup_mode,
        ))
    }

    pub fn cache(&self) -> &Arc<dyn ModuleCache> {
        &self.cache
    }

    /// Title and url for `code`, or `None` when no source knows it.
    /// The winning result is written back to the cache.
    pub async fn resolve(&self, code: &Code) -> Option<ModuleResult> {
        if let Some(cached) = self.try_cache(code).await {
            return Some(cached);
        }
        log::info!("{code} not in cache");

        let found = match self.mode {
            LookupMode::Race => self.race(code).await,
            LookupMode::Sequential => self.in_order(code).await,
        }?;
        self.cache.merge(code, found.cache_entry());
        Some(found)
    }

    pub async fn lookup(&self, code: &Code) -> Lookup {
        Lookup::from((code.clone(), self.resolve(code).await))
    }

    /// Resolve a batch concurrently; results keep the input order.
    pub async fn resolve_all(&self, codes: &[Code]) -> Vec<Lookup> {
        let mut set = JoinSet::new();
        for (idx, code) in codes.iter().enumerate() {
            let engine = self.clone();
            let code = code.clone();
            set.spawn(async move { (idx, engine.lookup(&code).await) });
        }

        let mut slots: Vec<Option<Lookup>> = vec![None; codes.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, lookup)) => slots[idx] = Some(lookup),
                Err(err) => log::error!("lookup task failed: {err}"),
            }
        }
        slots
            .into_iter()
            .zip(codes)
            .map(|(slot, code)| slot.unwrap_or_else(|| Lookup::NotFound(code.clone())))
            .collect()
    }

    async fn try_cache(&self, code: &Code) -> Option<ModuleResult> {
        let entry = self.cache.get(code)?;
        if entry.url.is_some() {
            return Some(entry.into_result(code.clone()));
        }
        // The snapshot may predate the page going live.
        if let Some(url) = self.liveness.first_active_candidate(code).await {
            log::info!("{code} has no url in cache, but {url} is reachable");
            let upgraded = CacheEntry::new(entry.title, Some(url));
            self.cache.merge(code, upgraded.clone());
            return Some(upgraded.into_result(code.clone()));
        }
        Some(entry.into_result(code.clone()))
    }

    async fn race(&self, code: &Code) -> Option<ModuleResult> {
        let mut set = JoinSet::new();
        for strategy in &self.strategies {
            let strategy = Arc::clone(strategy);
            let code = code.clone();
            let budget = self.strategy_timeout;
            set.spawn(async move { run_bounded(strategy.as_ref(), &code, budget).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(found)) => {
                    set.abort_all();
                    return Some(found);
                }
                Ok(None) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => log::error!("strategy task for {code} panicked: {err}"),
            }
        }
        None
    }

    async fn in_order(&self, code: &Code) -> Option<ModuleResult> {
        for strategy in &self.strategies {
            if let Some(found) = run_bounded(strategy.as_ref(), code, self.strategy_timeout).await {
                return Some(found);
            }
        }
        None
    }
}

async fn run_bounded(
    strategy: &dyn LookupStrategy,
    code: &Code,
    budget: Duration,
) -> Option<ModuleResult> {
    match tokio::time::timeout(budget, strategy.lookup(code)).await {
        Ok(found) => found,
        Err(_) => {
            log::warn!("{} lookup for {code} exceeded {budget:?}", strategy.name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        delay: Duration,
        answer: Option<&'static str>,
        calls: AtomicUsize,
        completed: AtomicBool,
    }

    impl Fixed {
        fn new(name: &'static str, delay_ms: u64, answer: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                delay: Duration::from_millis(delay_ms),
                answer,
                calls: AtomicUsize::new(0),
                completed: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl LookupStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn lookup(&self, code: &Code) -> Option<ModuleResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.completed.store(true, Ordering::SeqCst);
            self.answer
                .map(|title| ModuleResult::new(code.clone(), title, None))
        }
    }

    fn engine(
        cache: Arc<MemoryCache>,
        strategies: Vec<Arc<dyn LookupStrategy>>,
        mode: LookupMode,
    ) -> ResolutionEngine {
        let client = reqwest::Client::new();
        // Port 9 (discard) is never probed in these tests: every cached entry has a url.
        let liveness = Arc::new(LivenessChecker::new(
            client,
            UrlTemplates::new("http://127.0.0.1:9"),
            Duration::from_millis(100),
            0,
        ));
        ResolutionEngine::new(cache, liveness, strategies, Duration::from_secs(5), mode)
    }

    fn code(raw: &str) -> Code {
        Code::parse(raw).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn race_takes_first_hit() {
        let slow = Fixed::new("slow", 500, Some("Slow title"));
        let miss = Fixed::new("miss", 1, None);
        let fast = Fixed::new("fast", 50, Some("Fast title"));
        let cache = Arc::new(MemoryCache::new());
        let engine = engine(
            cache.clone(),
            vec![slow.clone(), miss.clone(), fast.clone()],
            LookupMode::Race,
        );

        let found = engine.resolve(&code("X100")).await.unwrap();
        assert_eq!(found.title, "Fast title");
        assert_eq!(cache.get(&code("X100")).unwrap().title, "Fast title");
        assert!(miss.completed.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert!(!slow.completed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_respects_precedence() {
        let first = Fixed::new("first", 500, Some("First title"));
        let second = Fixed::new("second", 1, Some("Second title"));
        let engine = engine(
            Arc::new(MemoryCache::new()),
            vec![first.clone(), second.clone()],
            LookupMode::Sequential,
        );

        let found = engine.resolve(&code("X100")).await.unwrap();
        assert_eq!(found.title, "First title");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_strategies_yield_none() {
        let engine = engine(
            Arc::new(MemoryCache::new()),
            vec![Fixed::new("a", 1, None), Fixed::new("b", 2, None)],
            LookupMode::Race,
        );
        assert_eq!(engine.resolve(&code("X100")).await, None);
        assert_eq!(engine.lookup(&code("X100")).await, Lookup::NotFound(code("X100")));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_strategy_is_bounded() {
        let stuck = Fixed::new("stuck", 60_000, Some("Too late"));
        let engine = engine(Arc::new(MemoryCache::new()), vec![stuck], LookupMode::Race);
        assert_eq!(engine.resolve(&code("X100")).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_hit_skips_strategies() {
        let strategy = Fixed::new("never", 1, Some("Nope"));
        let cache = Arc::new(MemoryCache::from_entries([(
            code("A123"),
            CacheEntry::new("Mocked active module", Some("url1".into())),
        )]));
        let engine = engine(cache, vec![strategy.clone()], LookupMode::Race);

        for _ in 0..2 {
            let found = engine.resolve(&code("a123")).await.unwrap();
            assert_eq!(found.url.as_deref(), Some("url1"));
        }
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_keeps_input_order() {
        let slow_for_everyone = Fixed::new("s", 10, Some("Title"));
        let cache = Arc::new(MemoryCache::from_entries([(
            code("A1"),
            CacheEntry::new("Cached", Some("u".into())),
        )]));
        let engine = engine(cache, vec![slow_for_everyone], LookupMode::Race);

        let codes = [code("B2"), code("A1"), code("C3")];
        let lookups = engine.resolve_all(&codes).await;
        let order: Vec<&str> = lookups.iter().map(|l| l.code().as_str()).collect();
        assert_eq!(order, ["B2", "A1", "C3"]);
        assert_eq!(lookups[1].to_display().title, "Cached");
    }
}

use oumodules_protocol::{CacheEntry, Code, Lookup, ModuleResult};
use oumodules_resolver::{
    build_client, LivenessChecker, LookupMode, MemoryCache, ModuleCache, ResolutionEngine,
    ResolverConfig, UrlTemplates,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn code(raw: &str) -> Code {
    Code::parse(raw).expect("valid code")
}

fn config_for(server: &MockServer) -> ResolverConfig {
    ResolverConfig {
        probe_timeout_ms: 1_000,
        fetch_timeout_ms: 2_000,
        strategy_timeout_ms: 5_000,
        probe_retries: 0,
        ..ResolverConfig::with_base_url(&server.uri())
    }
}

fn empty_sparql() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "head": {"vars": ["id", "title"]},
        "results": {"bindings": []}
    }))
}

async fn mount_empty_sparql(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(empty_sparql())
        .mount(server)
        .await;
}

#[tokio::test]
async fn cached_url_needs_no_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::from_entries([(
        code("A123"),
        CacheEntry::new("Mocked active module", Some("url1".into())),
    )]));
    let engine = ResolutionEngine::from_config(&config_for(&server), cache).expect("engine");

    let expected = ModuleResult::new(code("A123"), "Mocked active module", Some("url1".into()));
    assert_eq!(engine.resolve(&code("a123")).await, Some(expected.clone()));
    assert_eq!(engine.resolve(&code("A123")).await, Some(expected));
}

#[tokio::test]
async fn url_less_cache_entry_is_upgraded_when_page_is_live() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/courses/modules/b321"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::from_entries([(
        code("B321"),
        CacheEntry::new("Mocked inactive module", None),
    )]));
    let engine =
        ResolutionEngine::from_config(&config_for(&server), cache.clone()).expect("engine");

    let live_url = format!("{}/courses/modules/b321", server.uri());
    let found = engine.resolve(&code("B321")).await.expect("cached");
    assert_eq!(found.title, "Mocked inactive module");
    assert_eq!(found.url.as_deref(), Some(live_url.as_str()));
    assert_eq!(cache.get(&code("B321")).and_then(|e| e.url), Some(live_url));
}

#[tokio::test]
async fn url_less_cache_entry_is_returned_when_no_page_is_live() {
    let server = MockServer::start().await;
    let cache = Arc::new(MemoryCache::from_entries([(
        code("B321"),
        CacheEntry::new("Mocked inactive module", None),
    )]));
    let engine =
        ResolutionEngine::from_config(&config_for(&server), cache.clone()).expect("engine");

    let found = engine.resolve(&code("B321")).await.expect("cached");
    assert_eq!(found, ModuleResult::new(code("B321"), "Mocked inactive module", None));
    assert_eq!(cache.get(&code("B321")).and_then(|e| e.url), None);
}

#[tokio::test]
async fn archive_fallback_yields_title_without_url() {
    let server = MockServer::start().await;
    mount_empty_sparql(&server).await;
    Mock::given(method("GET"))
        .and(path("/library/digital-archive/module/xcri:XYZ999"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>XYZ999 Some Random Module - Open University Digital Archive</title></head></html>",
        ))
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let engine =
        ResolutionEngine::from_config(&config_for(&server), cache.clone()).expect("engine");

    let lookup = engine.lookup(&code("XYZ999")).await;
    assert_eq!(
        lookup,
        Lookup::Found(ModuleResult::new(code("XYZ999"), "Some Random Module", None))
    );
    assert_eq!(
        cache.get(&code("XYZ999")),
        Some(CacheEntry::new("Some Random Module", None))
    );
}

#[tokio::test]
async fn sparql_hit_is_cached_and_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "head": {"vars": ["id", "title", "url", "type"]},
            "results": {"bindings": [{
                "id": {"type": "literal", "value": "M999"},
                "title": {"type": "literal", "value": "Queried module"},
                "url": {"type": "uri", "value": "http://www.open.ac.uk/courses/modules/m999"},
                "type": {"type": "uri", "value": "http://data.open.ac.uk/ontology/Module"}
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ResolverConfig {
        lookup_mode: LookupMode::Sequential,
        ..config_for(&server)
    };
    let cache = Arc::new(MemoryCache::new());
    let engine = ResolutionEngine::from_config(&config, cache.clone()).expect("engine");

    let expected = ModuleResult::new(
        code("M999"),
        "Queried module",
        Some("http://www.open.ac.uk/courses/modules/m999".into()),
    );
    assert_eq!(engine.resolve(&code("M999")).await, Some(expected.clone()));
    assert_eq!(cache.get(&code("M999")), Some(expected.cache_entry()));

    assert_eq!(engine.resolve(&code("M999")).await, Some(expected));
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn scrape_reads_title_from_live_page() {
    let server = MockServer::start().await;
    mount_empty_sparql(&server).await;
    Mock::given(method("HEAD"))
        .and(path("/courses/modules/d241"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/courses/modules/d241"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><title>\nD241 - Exploring mental health and counselling - Open University Course\n</title></html>",
        ))
        .mount(&server)
        .await;

    let engine = ResolutionEngine::from_config(&config_for(&server), Arc::new(MemoryCache::new()))
        .expect("engine");

    let found = engine.resolve(&code("d241")).await.expect("scraped");
    assert_eq!(found.title, "Exploring mental health and counselling");
    assert_eq!(
        found.url,
        Some(format!("{}/courses/modules/d241", server.uri()))
    );
}

#[tokio::test]
async fn unknown_code_resolves_to_none() {
    let server = MockServer::start().await;
    mount_empty_sparql(&server).await;

    let engine = ResolutionEngine::from_config(&config_for(&server), Arc::new(MemoryCache::new()))
        .expect("engine");

    assert_eq!(engine.resolve(&code("ZZ999")).await, None);
    let lookups = engine.resolve_all(&[code("ZZ999"), code("ZZ998")]).await;
    assert!(lookups.iter().all(|lookup| !lookup.is_found()));
}

#[tokio::test]
async fn failing_sparql_does_not_block_other_strategies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/library/digital-archive/module/xcri:A100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<title>A100 Humanities foundation - Open University Digital Archive</title>",
        ))
        .mount(&server)
        .await;

    let engine = ResolutionEngine::from_config(&config_for(&server), Arc::new(MemoryCache::new()))
        .expect("engine");

    let found = engine.resolve(&code("A100")).await.expect("archive hit");
    assert_eq!(found.title, "Humanities foundation");
    assert_eq!(found.url, None);
}

fn checker(server: &MockServer, timeout: Duration) -> LivenessChecker {
    let client = build_client(&ResolverConfig::default()).expect("client");
    LivenessChecker::new(client, UrlTemplates::new(server.uri()), timeout, 0)
}

#[tokio::test]
async fn redirect_to_listing_is_not_live() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/courses/modules/x100"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/courses/", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/courses/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let checker = checker(&server, Duration::from_secs(1));
    let url = format!("{}/courses/modules/x100", server.uri());
    assert!(!checker.is_active(&url, &code("X100")).await);
}

#[tokio::test]
async fn redirect_to_same_code_is_live() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/courses/modules/x100"))
        .respond_with(ResponseTemplate::new(301).insert_header(
            "Location",
            format!("{}/courses/qualifications/details/x100", server.uri()),
        ))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/courses/qualifications/details/x100"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let checker = checker(&server, Duration::from_secs(1));
    let url = format!("{}/courses/modules/x100", server.uri());
    assert!(checker.is_active(&url, &code("x100")).await);
}

#[tokio::test]
async fn probe_timeout_counts_as_inactive() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
        .mount(&server)
        .await;

    let checker = checker(&server, Duration::from_millis(100));
    let url = format!("{}/courses/modules/x100", server.uri());
    assert!(!checker.is_active(&url, &code("X100")).await);
}

#[tokio::test]
async fn first_active_candidate_follows_template_order() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/courses/qualifications/details/m269"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/courses/modules/m269"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let checker = checker(&server, Duration::from_secs(1));
    assert_eq!(
        checker.first_active_candidate(&code("M269")).await,
        Some(format!("{}/courses/qualifications/details/m269", server.uri()))
    );
}

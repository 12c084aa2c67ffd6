use async_trait::async_trait;
use pinpoint_common::{DomError, DomProvider, NodeHandle, ReadyState};
use pinpoint_core::{CandidateMatch, MatchInfo, ResolutionContext, SelectorGroup, Strategy};
use pinpoint_engine::resolver::CACHE_LABEL;
use pinpoint_engine::{
    BuildError, CacheEntry, CandidateCache, ElementResolver, PinpointConfig, Resolution,
    ResolverBuilder,
};
use pinpoint_snapshot::{HtmlSnapshot, SnapshotSequence};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const LOGIN_URL: &str = "https://example.com/login";

const LOGIN_PAGE: &str = r#"
<html><body>
  <form>
    <input type="email" placeholder="Email">
    <input type="password" placeholder="Password">
    <button aria-label="Login">Sign In</button>
  </form>
</body></html>
"#;

fn config_in(dir: &Path) -> PinpointConfig {
    let mut config = PinpointConfig::default();
    config.cache.dir = dir.join("page_models");
    config.discovery.dir = dir.join(".page_models");
    config
}

fn uncached_config() -> PinpointConfig {
    let mut config = PinpointConfig::default();
    config.cache.enabled = false;
    config
}

async fn resolver_for<P: DomProvider>(page: P, config: PinpointConfig) -> ElementResolver<P> {
    ResolverBuilder::new()
        .provider(page)
        .config(config)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_email_field_resolves_to_form_field() {
    let dir = tempdir().unwrap();
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, config_in(dir.path())).await;

    let resolution = resolver.resolve("email field", 30_000, 5).await.unwrap();
    let found = resolution.found().expect("email field should resolve");
    let expected = resolver.page().query_one(r#"input[type="email"]"#).await.unwrap();

    assert_eq!(Some(found.node), expected);
    assert_eq!(found.strategy, "FormFieldStrategy");
    assert!(found.score >= 0.3);
    assert!(!found.from_cache);
}

#[tokio::test]
async fn test_login_button_matches_aria_label() {
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, uncached_config()).await;

    let resolution = resolver.resolve("Login button", 30_000, 5).await.unwrap();
    let found = resolution.found().expect("login button should resolve");
    let expected = resolver.page().query_one("button").await.unwrap();

    assert_eq!(Some(found.node), expected);
    assert_eq!(found.strategy, "ButtonStrategy");
    assert_eq!(found.matched_text, "Login");
}

#[tokio::test]
async fn test_warm_cache_skips_strategies() {
    let dir = tempdir().unwrap();
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, config_in(dir.path())).await;

    let first = resolver.resolve("email field", 30_000, 5).await.unwrap();
    let before = resolver.performance_stats();
    let form_attempts = before.strategy_usage["FormFieldStrategy"].attempts;

    let second = resolver.resolve("email field", 30_000, 5).await.unwrap();
    let cached = second.found().expect("second lookup should hit the cache");
    assert!(cached.from_cache);
    assert_eq!(Some(cached.node), first.node());

    let after = resolver.performance_stats();
    assert_eq!(after.strategy_usage["FormFieldStrategy"].attempts, form_attempts);
    assert_eq!(after.strategy_usage[CACHE_LABEL].attempts, 1);
    assert_eq!(after.cache_hits, 1);
    assert_eq!(after.total_searches, 2);
    assert_eq!(after.successful_searches, 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_element_exhausts_attempts() {
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, uncached_config()).await;

    let start = tokio::time::Instant::now();
    let resolution = resolver
        .resolve("nonexistent widget xyz", 30_000, 5)
        .await
        .unwrap();

    assert_eq!(
        resolution,
        Resolution::NotFound {
            description: "nonexistent widget xyz".into(),
            attempts: 5
        }
    );
    // Backoff of 1 + 2 + 4 + 5 seconds between the five attempts
    assert!(start.elapsed() >= Duration::from_secs(12));

    let stats = resolver.performance_stats();
    assert_eq!(stats.successful_searches, 0);
    assert_eq!(stats.strategy_usage["GenericStrategy"].attempts, 5);
    assert_eq!(
        resolver.strategy_confidence("nonexistent widget xyz", "GenericStrategy"),
        0.0
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_retries() {
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, uncached_config()).await;

    let resolution = resolver
        .resolve("nonexistent widget xyz", 2_500, 5)
        .await
        .unwrap();
    // Attempt 1 at t=0, attempt 2 at t=1s, deadline passed by t=3s
    assert!(matches!(resolution, Resolution::NotFound { attempts: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_late_element_found_after_backoff() {
    let page = SnapshotSequence::new(
        LOGIN_URL,
        &[
            r#"<html><body><div class="spinner">Loading</div></body></html>"#,
            r#"<html><body><button id="save">Save</button></body></html>"#,
        ],
    );
    let mut resolver = resolver_for(page, uncached_config()).await;

    let resolution = resolver.resolve("save button", 30_000, 3).await.unwrap();
    let found = resolution.found().expect("button appears on the second frame");
    assert_eq!(found.selector, "#save");
    assert_eq!(resolver.page().frame_index(), 1);
}

#[tokio::test]
async fn test_repeated_resolution_is_deterministic() {
    let html = r#"
        <html><body>
          <div class="toolbar">
            <button class="btn">Export</button>
            <a href="/export" class="btn">Export</a>
            <span tabindex="0">Export</span>
          </div>
        </body></html>
    "#;

    let mut winners = Vec::new();
    for _ in 0..3 {
        let page = HtmlSnapshot::parse("https://example.com/reports", html);
        let mut resolver = resolver_for(page, uncached_config()).await;
        let resolution = resolver.resolve("export", 30_000, 1).await.unwrap();
        winners.push(resolution.node());
    }
    assert!(winners[0].is_some());
    assert!(winners.iter().all(|w| *w == winners[0]));
}

#[tokio::test]
async fn test_exclusion_skips_matching_candidates() {
    let dir = tempdir().unwrap();
    let html = r#"
        <html><body>
          <button>Submit draft</button>
          <button>Submit order</button>
        </body></html>
    "#;
    let page = HtmlSnapshot::parse("https://shop.example.com/checkout", html);
    let mut resolver = resolver_for(page, config_in(dir.path())).await;

    let plain = resolver.resolve("submit", 30_000, 1).await.unwrap();
    assert_eq!(plain.found().unwrap().matched_text, "Submit draft");

    // The cached "Submit draft" record must not be served either
    let excluded = resolver
        .resolve_excluding("submit", "DRAFT", 30_000, 1)
        .await
        .unwrap();
    let found = excluded.found().expect("the order button remains");
    assert_eq!(found.matched_text, "Submit order");
    assert!(!found.from_cache);
}

/// Always proposes the first node matching `selector` with a fixed score.
struct FixedStrategy {
    name: &'static str,
    priority: u8,
    selector: &'static str,
    score: f64,
}

#[async_trait(?Send)]
impl Strategy for FixedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    async fn can_handle(&self, _ctx: &ResolutionContext<'_>) -> bool {
        true
    }

    fn selector_groups(&self) -> &'static [SelectorGroup] {
        &[]
    }

    async fn find_elements(&self, ctx: &ResolutionContext<'_>) -> Vec<CandidateMatch> {
        match ctx.page.query_one(self.selector).await {
            Ok(Some(node)) => vec![CandidateMatch::new(
                node,
                self.score,
                "fixed",
                self.selector,
                self.name,
                MatchInfo::default(),
            )],
            _ => Vec::new(),
        }
    }
}

async fn winner_between(high_score: f64, low_score: f64) -> String {
    let html = r#"<html><body><button id="a">A</button><button id="b">B</button></body></html>"#;
    let page = HtmlSnapshot::parse("https://example.com/", html);
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(FixedStrategy {
            name: "Low",
            priority: 20,
            selector: "#b",
            score: low_score,
        }),
        Box::new(FixedStrategy {
            name: "High",
            priority: 70,
            selector: "#a",
            score: high_score,
        }),
    ];
    let mut resolver = ResolverBuilder::new()
        .provider(page)
        .config(uncached_config())
        .strategies(strategies)
        .build()
        .await
        .unwrap();

    let names: Vec<&str> = resolver.strategies().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["High", "Low"]);

    let resolution = resolver.resolve("anything", 30_000, 1).await.unwrap();
    resolution.found().unwrap().strategy.clone()
}

#[tokio::test]
async fn test_higher_score_wins_across_strategies() {
    assert_eq!(winner_between(0.7, 0.8).await, "Low");
}

#[tokio::test]
async fn test_equal_scores_favor_higher_priority() {
    assert_eq!(winner_between(0.7, 0.7).await, "High");
}

#[tokio::test]
async fn test_flush_and_clear_cache() {
    let dir = tempdir().unwrap();
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, config_in(dir.path())).await;

    resolver.resolve("email field", 30_000, 5).await.unwrap();
    resolver.flush_cache_to_disk().await.unwrap();
    let document = dir.path().join("page_models").join("example_com.json");
    assert!(document.exists());

    let stats = serde_json::to_value(resolver.performance_stats()).unwrap();
    assert_eq!(stats["cache"]["records"], 1);
    assert_eq!(
        resolver.strategy_confidence("email field", "FormFieldStrategy"),
        1.0
    );

    resolver.clear_cache().await.unwrap();
    assert!(resolver.cache().is_empty());
    assert!(!document.exists());

    resolver.reset_stats();
    assert_eq!(resolver.performance_stats().total_searches, 0);
}

#[tokio::test]
async fn test_cache_survives_new_resolver() {
    let dir = tempdir().unwrap();
    let page = HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE);
    let mut resolver = resolver_for(page, config_in(dir.path())).await;
    resolver.resolve("email field", 30_000, 5).await.unwrap();

    let page = HtmlSnapshot::parse("https://example.com/login?next=/home", LOGIN_PAGE);
    let mut resolver = resolver_for(page, config_in(dir.path())).await;
    let resolution = resolver.resolve("Email field", 30_000, 5).await.unwrap();
    assert!(resolution.found().unwrap().from_cache);
}

#[tokio::test]
async fn test_build_without_provider_fails() {
    let result = ResolverBuilder::<HtmlSnapshot>::new().build().await;
    assert!(matches!(result, Err(BuildError::MissingProvider)));
}

#[tokio::test]
async fn test_stale_cached_record_is_checked_once() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let url = "https://example.com/editor";

    let mut cache = CandidateCache::new(&config.cache);
    cache
        .put(CacheEntry::new(
            "save button",
            url,
            "#save",
            "Save",
            "ButtonStrategy",
            0.7,
            BTreeMap::new(),
        ))
        .await;

    // The cached button is now hidden; another one took its place
    let html = r#"<html><body>
        <button id="save" hidden>Save</button>
        <button id="keep">Save</button>
    </body></html>"#;
    let mut resolver = ResolverBuilder::new()
        .provider(HtmlSnapshot::parse(url, html))
        .config(config)
        .cache(cache)
        .build()
        .await
        .unwrap();

    let resolution = resolver.resolve("save button", 30_000, 1).await.unwrap();
    let found = resolution.found().unwrap();
    assert_eq!(found.selector, "#keep");
    assert!(!found.from_cache);

    let stats = resolver.cache().stats();
    assert_eq!((stats.hits, stats.misses), (0, 1));
    assert_eq!(resolver.performance_stats().cache_hits, 0);
}

/// Serves a snapshot but never reports the page as ready.
struct StalledPage(HtmlSnapshot);

#[async_trait(?Send)]
impl DomProvider for StalledPage {
    async fn current_url(&self) -> Result<String, DomError> {
        self.0.current_url().await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeHandle>, DomError> {
        self.0.query_all(selector).await
    }

    async fn query_within(
        &self,
        node: NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError> {
        self.0.query_within(node, selector).await
    }

    async fn is_visible(&self, node: NodeHandle) -> Result<bool, DomError> {
        self.0.is_visible(node).await
    }

    async fn attribute(&self, node: NodeHandle, name: &str) -> Result<Option<String>, DomError> {
        self.0.attribute(node, name).await
    }

    async fn text(&self, node: NodeHandle) -> Result<String, DomError> {
        self.0.text(node).await
    }

    async fn tag_name(&self, node: NodeHandle) -> Result<String, DomError> {
        self.0.tag_name(node).await
    }

    async fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>, DomError> {
        self.0.parent(node).await
    }

    async fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, DomError> {
        self.0.children(node).await
    }

    async fn wait_for_ready(&self, _state: ReadyState, _timeout: Duration) -> Result<(), DomError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_readiness_waits_are_bounded() {
    let page = StalledPage(HtmlSnapshot::parse(LOGIN_URL, LOGIN_PAGE));
    let mut resolver = resolver_for(page, uncached_config()).await;

    let start = tokio::time::Instant::now();
    let resolution = resolver.resolve("email field", 30_000, 1).await.unwrap();
    assert!(resolution.is_found());

    // Content-parsed wait only: a two-word description skips network idle
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
}

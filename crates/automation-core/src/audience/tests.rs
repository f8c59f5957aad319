use super::*;
use crate::cache::ResultCache;
use crate::clock::TestClock;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use automation_types::{AdditionalAudienceCheckConfig, AudienceCheckOverrides};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY: &str = "https://test.config:\"default context\":existing-contact-id:channel-id";

#[derive(Debug)]
struct MockApi {
    status: Mutex<u16>,
    result: Mutex<Option<AudienceCheckResult>>,
    requests: Mutex<Vec<AudienceCheckRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockApi {
    fn responding(status: u16, result: Option<AudienceCheckResult>) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            result: Mutex::new(result),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn matched(is_matched: bool, ttl: Duration) -> Arc<Self> {
        Self::responding(200, Some(AudienceCheckResult { is_matched, cache_ttl: ttl }))
    }

    fn requests(&self) -> Vec<AudienceCheckRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AudienceCheckApi for MockApi {
    async fn resolve(
        &self,
        request: &AudienceCheckRequest,
    ) -> AppResult<RequestResult<AudienceCheckResult>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;

        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(RequestResult { status: *self.status.lock(), value: self.result.lock().clone() })
    }
}

fn default_config() -> AdditionalAudienceCheckConfig {
    AdditionalAudienceCheckConfig {
        is_enabled: true,
        context: Some(json!("remote config context")),
        url: Some("https://test.config".to_string()),
    }
}

fn overrides(context: Option<Value>, url: Option<&str>) -> AudienceCheckOverrides {
    AudienceCheckOverrides { bypass: false, context, url: url.map(ToString::to_string) }
}

fn default_overrides() -> AudienceCheckOverrides {
    overrides(Some(json!("default context")), None)
}

fn device() -> StaticDeviceInfo {
    StaticDeviceInfo::new("channel-id", "existing-contact-id").with_named_user("some user id")
}

struct Fixture {
    clock: Arc<TestClock>,
    cache: ResultCache,
}

impl Fixture {
    fn new() -> Self {
        let clock = Arc::new(TestClock::new(1));
        let cache = ResultCache::open_in_memory(clock.clone(), "app version", "sdk version").unwrap();
        Self { clock, cache }
    }

    fn resolver(
        &self,
        api: &Arc<MockApi>,
        config: Option<AdditionalAudienceCheckConfig>,
    ) -> AdditionalAudienceCheckerResolver {
        AdditionalAudienceCheckerResolver::new(
            self.cache.clone(),
            Arc::clone(api) as Arc<dyn AudienceCheckApi>,
            config,
        )
    }
}

#[tokio::test]
async fn test_happy_path_caches_result() {
    let fixture = Fixture::new();
    let api = MockApi::matched(true, Duration::from_secs(10));
    let resolver = fixture.resolver(&api, Some(default_config()));

    assert!(fixture.cache.get_cached::<AudienceCheckResult>(CACHE_KEY).await.unwrap().is_none());

    let result = resolver.resolve(&device(), Some(&default_overrides())).await.unwrap();
    assert!(result);

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://test.config");
    assert_eq!(requests[0].channel_id, "channel-id");
    assert_eq!(requests[0].contact_id, "existing-contact-id");
    assert_eq!(requests[0].named_user_id.as_deref(), Some("some user id"));
    assert_eq!(requests[0].context, Some(json!("default context")));

    let cached = fixture.cache.get_cached::<AudienceCheckResult>(CACHE_KEY).await.unwrap().unwrap();
    assert!(cached.is_matched);
    assert_eq!(cached.cache_ttl, Duration::from_secs(10));
}

#[tokio::test]
async fn test_no_config_or_disabled_is_match() {
    let fixture = Fixture::new();
    let api = MockApi::responding(400, None);

    let resolver = fixture.resolver(&api, None);
    assert!(resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());

    resolver.set_config(Some(AdditionalAudienceCheckConfig {
        is_enabled: false,
        context: None,
        url: Some("https://test.url".to_string()),
    }));
    assert!(resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_missing_url_is_error() {
    let fixture = Fixture::new();
    let api = MockApi::matched(true, Duration::from_secs(1));
    let resolver = fixture.resolver(
        &api,
        Some(AdditionalAudienceCheckConfig { is_enabled: true, context: None, url: None }),
    );

    let with_url = overrides(Some(json!("default context")), Some("https://test.url"));
    assert!(resolver.resolve(&device(), Some(&with_url)).await.unwrap());
    assert_eq!(api.requests()[0].url, "https://test.url");

    fixture.clock.advance(2);
    let result = resolver.resolve(&device(), Some(&default_overrides())).await;
    match result {
        Err(e @ AppError::Typed(_)) => assert!(!e.is_retryable()),
        other => panic!("expected config error, got {other:?}"),
    }
    assert_eq!(api.requests().len(), 1);
}

#[tokio::test]
async fn test_bypass_skips_network() {
    let fixture = Fixture::new();
    let api = MockApi::responding(400, None);
    let resolver = fixture.resolver(&api, Some(default_config()));

    let bypass = AudienceCheckOverrides { bypass: true, context: Some(Value::Null), url: None };
    assert!(resolver.resolve(&device(), Some(&bypass)).await.unwrap());
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_context_defaults_to_config() {
    let fixture = Fixture::new();
    let api = MockApi::matched(true, Duration::from_secs(1));
    let resolver = fixture.resolver(&api, Some(default_config()));

    assert!(resolver.resolve(&device(), Some(&overrides(None, None))).await.unwrap());
    assert_eq!(api.requests()[0].context, Some(json!("remote config context")));

    assert!(resolver.resolve(&device(), None).await.unwrap());
    assert_eq!(api.requests().len(), 1, "second call served from cache");
}

#[tokio::test]
async fn test_returns_cached_without_request() {
    let fixture = Fixture::new();
    let api = MockApi::responding(400, None);
    let resolver = fixture.resolver(&api, Some(default_config()));

    fixture
        .cache
        .store(
            &AudienceCheckResult { is_matched: true, cache_ttl: Duration::from_millis(10) },
            CACHE_KEY,
            Duration::from_millis(10),
        )
        .await
        .unwrap();

    assert!(resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert!(api.requests().is_empty());

    // Once the entry expires the endpoint is asked again.
    fixture.clock.advance(10);
    assert!(!resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert_eq!(api.requests().len(), 1);
}

#[tokio::test]
async fn test_app_version_change_requests_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audience_cache.db");
    let clock = Arc::new(TestClock::new(1));
    let api = MockApi::matched(true, Duration::from_secs(600));

    let resolver_for = |app_version: &str| {
        let cache = ResultCache::open(&path, clock.clone(), app_version, "sdk version").unwrap();
        AdditionalAudienceCheckerResolver::new(
            cache,
            Arc::clone(&api) as Arc<dyn AudienceCheckApi>,
            Some(default_config()),
        )
    };

    let resolver = resolver_for("1.0");
    assert!(resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert!(resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert_eq!(api.requests().len(), 1);

    let upgraded = resolver_for("2.0");
    assert!(upgraded.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert_eq!(api.requests().len(), 2);

    assert!(upgraded.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert_eq!(api.requests().len(), 2);
}

#[tokio::test]
async fn test_rejection_is_not_cached() {
    let fixture = Fixture::new();
    let api = MockApi::responding(400, None);
    let resolver = fixture.resolver(&api, Some(default_config()));

    assert!(!resolver.resolve(&device(), Some(&default_overrides())).await.unwrap());
    assert_eq!(api.requests().len(), 1);
    assert!(fixture.cache.get_cached::<AudienceCheckResult>(CACHE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_retryable_failure() {
    let fixture = Fixture::new();
    let api = MockApi::responding(500, None);
    let resolver = fixture.resolver(&api, Some(default_config()));

    let err = resolver.resolve(&device(), Some(&default_overrides())).await.unwrap_err();
    assert!(matches!(err, AppError::ServerError { status: 500 }));
    assert!(err.is_retryable());
    assert!(fixture.cache.get_cached::<AudienceCheckResult>(CACHE_KEY).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolves_are_serialized() {
    let fixture = Fixture::new();
    let api = MockApi::matched(true, Duration::from_secs(60));
    let resolver = fixture.resolver(&api, Some(default_config()));
    let device = device();

    let same_key = (0..4).map(|_| resolver.resolve(&device, None));
    let results = futures::future::join_all(same_key).await;
    assert!(results.into_iter().all(|r| r.unwrap()));
    assert_eq!(api.requests().len(), 1);

    let other_contacts = ["a", "b", "c"].map(|contact| StaticDeviceInfo::new("channel-id", contact));
    let different_keys = other_contacts.iter().map(|device| resolver.resolve(device, None));
    let results = futures::future::join_all(different_keys).await;
    assert!(results.into_iter().all(|r| r.unwrap()));

    assert_eq!(api.requests().len(), 4);
    assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 1);
}

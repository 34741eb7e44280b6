//! Blockers worker
//!
//! One object per browser profile tying the three subsystems together. Engines
//! load lazily on first query; every query fails open.
//!
//! # Example
//!
//! ```ignore
//! let worker: BlockersWorker<MyAdEngine, MyTrackerEngine> =
//!     BlockersWorker::from_config(config, Arc::new(settings));
//!
//! match worker.evaluate(&request) {
//!     RequestDecision::Block(reason) => cancel(reason),
//!     RequestDecision::Upgrade(url) => redirect(url),
//!     RequestDecision::Allow => {}
//! }
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use log::{debug, info};

use crate::adblock::AdBlocker;
use crate::config::BlockersConfig;
use crate::dataset::{DataDir, DatasetResolver};
use crate::engine::{AdBlockEngine, JsonRuleDatabase, RuleDatabase, TrackerEngine};
use crate::https::HttpsUpgrader;
use crate::shields::ShieldsSettings;
use crate::tracker::TrackerBlocker;
use crate::types::{BlockReason, RequestDecision, RequestInfo, RequestType};

pub struct BlockersWorker<A, T, R = JsonRuleDatabase> {
    config: BlockersConfig,
    settings: Arc<dyn ShieldsSettings>,
    ads: AdBlocker<A>,
    trackers: TrackerBlocker<T>,
    https: HttpsUpgrader<R>,
}

impl<A, T, R> BlockersWorker<A, T, R>
where
    A: AdBlockEngine,
    T: TrackerEngine,
    R: RuleDatabase,
{
    pub fn new(
        config: BlockersConfig,
        resolver: Arc<dyn DatasetResolver>,
        settings: Arc<dyn ShieldsSettings>,
    ) -> Self {
        let config = config.validated();
        Self {
            ads: AdBlocker::new(resolver.clone()),
            trackers: TrackerBlocker::new(resolver.clone(), config.third_party_cache_capacity),
            https: HttpsUpgrader::new(resolver, &config),
            config,
            settings,
        }
    }

    /// Worker reading pointer files from `config.data_dir`.
    pub fn from_config(config: BlockersConfig, settings: Arc<dyn ShieldsSettings>) -> Self {
        let resolver = Arc::new(DataDir::new(config.data_dir.clone(), config.datasets.clone()));
        Self::new(config, resolver, settings)
    }

    pub fn config(&self) -> &BlockersConfig {
        &self.config
    }

    pub fn should_block_ad(
        &self,
        base_host: &str,
        url: &str,
        request_type: RequestType,
        regional_enabled: bool,
    ) -> bool {
        self.ads.should_block(base_host, url, request_type, regional_enabled)
    }

    pub fn should_block_tracker(&self, base_host: &str, host: &str) -> bool {
        self.trackers.should_block(base_host, host)
    }

    pub fn upgrade_to_https<'a>(&self, url: &'a str) -> Cow<'a, str> {
        self.https.upgrade(url)
    }

    /// Full decision for one request: ads, then trackers, then HTTPS.
    ///
    /// Regional lists apply when either the configuration or the host
    /// settings enable them.
    pub fn evaluate(&self, request: &RequestInfo<'_>) -> RequestDecision {
        if !self.settings.is_top_shields_enabled(request.base_host) {
            debug!("Shields down for {}", request.base_host);
            return RequestDecision::Allow;
        }

        let regional = self.config.regional_enabled || self.settings.regional_enabled();
        if self.should_block_ad(request.base_host, request.url, request.request_type, regional) {
            return RequestDecision::Block(BlockReason::Ad);
        }

        if self.should_block_tracker(request.base_host, request.host) {
            return RequestDecision::Block(BlockReason::Tracker);
        }

        match self.upgrade_to_https(request.url) {
            Cow::Owned(upgraded) => RequestDecision::Upgrade(upgraded),
            Cow::Borrowed(_) => RequestDecision::Allow,
        }
    }

    pub fn ads(&self) -> &AdBlocker<A> {
        &self.ads
    }

    pub fn trackers(&self) -> &TrackerBlocker<T> {
        &self.trackers
    }

    pub fn https(&self) -> &HttpsUpgrader<R> {
        &self.https
    }

    /// Drop cached decisions; loaded engines are kept.
    pub fn clear_caches(&self) {
        self.trackers.first_party_cache().clear();
        self.https.clear_caches();
    }

    /// Unload every engine. The next query reloads from the data files.
    pub fn reload(&mut self) {
        info!("Reloading blocker datasets");
        self.ads.unload();
        self.trackers.unload();
        self.https.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetNames;
    use crate::dataset::DatasetKind;
    use crate::shields::HostSettingsTable;
    use crate::testing::{FakeAdEngine, FakeTrackerEngine, MapResolver, TempDir};

    type TestWorker = BlockersWorker<FakeAdEngine, FakeTrackerEngine>;

    const HTTPS_RULES: &str =
        r#"{"cdn.com": [{"r": [{"f": "^http://(.*)$", "t": "https://$1"}]}]}"#;

    fn resolver(dir: &TempDir) -> Arc<MapResolver> {
        let ads = dir.write("ads.dat", b"/banner/");
        let regional = dir.write("region.dat", b"/reklama/");
        let trackers = dir.write(
            "tp.dat",
            b"tracker tracker.com\nfirst-party news.com tracker.com\n",
        );
        let https = dir.write("httpse.json", HTTPS_RULES.as_bytes());
        Arc::new(
            MapResolver::new()
                .with(DatasetKind::AdBlock, vec![ads])
                .with(DatasetKind::AdBlockRegional, vec![regional])
                .with(DatasetKind::TrackingProtection, vec![trackers])
                .with(DatasetKind::HttpsRules, vec![https]),
        )
    }

    fn worker(dir: &TempDir, settings: HostSettingsTable) -> TestWorker {
        BlockersWorker::new(BlockersConfig::default(), resolver(dir), Arc::new(settings))
    }

    fn request<'a>(base_host: &'a str, url: &'a str, host: &'a str) -> RequestInfo<'a> {
        RequestInfo {
            base_host,
            url,
            host,
            request_type: RequestType::IMAGE,
        }
    }

    #[test]
    fn test_evaluate_pipeline() {
        let dir = TempDir::new("worker-pipeline");
        let worker = worker(&dir, HostSettingsTable::default());

        assert_eq!(
            worker.evaluate(&request("shop.com", "http://ads.com/banner/1.png", "ads.com")),
            RequestDecision::Block(BlockReason::Ad)
        );
        assert_eq!(
            worker.evaluate(&request("shop.com", "http://tracker.com/p.gif", "tracker.com")),
            RequestDecision::Block(BlockReason::Tracker)
        );
        assert_eq!(
            worker.evaluate(&request("news.com", "http://tracker.com/p.gif", "tracker.com")),
            RequestDecision::Allow
        );
        assert_eq!(
            worker.evaluate(&request("shop.com", "http://cdn.com/a.png", "cdn.com")),
            RequestDecision::Upgrade("https://cdn.com/a.png".to_string())
        );
    }

    #[test]
    fn test_shields_down_skips_engines() {
        let dir = TempDir::new("worker-shields-down");
        let settings = HostSettingsTable::parse("shop.com,0");
        let resolver = resolver(&dir);
        let worker: TestWorker =
            BlockersWorker::new(BlockersConfig::default(), resolver.clone(), Arc::new(settings));

        assert_eq!(
            worker.evaluate(&request("www.shop.com", "http://ads.com/banner/1.png", "ads.com")),
            RequestDecision::Allow
        );
        assert_eq!(resolver.resolve_count(), 0);
        assert!(!worker.ads().is_loaded());
    }

    #[test]
    fn test_regional_flag_comes_from_settings() {
        let dir = TempDir::new("worker-regional");
        let url = "http://ads.ru/reklama/top.gif";

        let off = worker(&dir, HostSettingsTable::default());
        assert_eq!(off.evaluate(&request("news.ru", url, "ads.ru")), RequestDecision::Allow);

        let on = worker(&dir, HostSettingsTable::default().with_regional_enabled(true));
        assert_eq!(
            on.evaluate(&request("news.ru", url, "ads.ru")),
            RequestDecision::Block(BlockReason::Ad)
        );
    }

    #[test]
    fn test_regional_flag_from_config() {
        let dir = TempDir::new("worker-regional-config");
        let config = BlockersConfig {
            regional_enabled: true,
            ..BlockersConfig::default()
        };
        let worker: TestWorker = BlockersWorker::new(
            config,
            resolver(&dir),
            Arc::new(HostSettingsTable::default()),
        );

        assert_eq!(
            worker.evaluate(&request("news.ru", "http://ads.ru/reklama/top.gif", "ads.ru")),
            RequestDecision::Block(BlockReason::Ad)
        );
    }

    #[test]
    fn test_clear_caches_keeps_engines() {
        let dir = TempDir::new("worker-clear");
        let worker = worker(&dir, HostSettingsTable::default());

        worker.should_block_tracker("shop.com", "tracker.com");
        worker.upgrade_to_https("http://cdn.com/");
        assert_eq!(worker.trackers().first_party_cache().len(), 1);
        assert_eq!(worker.https().cached_results(), 1);

        worker.clear_caches();
        assert!(worker.trackers().first_party_cache().is_empty());
        assert_eq!(worker.https().cached_results(), 0);
        assert!(worker.trackers().is_loaded());
        assert!(worker.https().is_loaded());
    }

    #[test]
    fn test_reload_picks_up_new_data() {
        let dir = TempDir::new("worker-reload");
        let mut worker = worker(&dir, HostSettingsTable::default());
        let url = "http://ads.com/promo/1.png";

        assert!(!worker.should_block_ad("shop.com", url, RequestType::IMAGE, false));

        dir.write("ads.dat", b"/promo/");
        // Still serving the loaded engine
        assert!(!worker.should_block_ad("shop.com", url, RequestType::IMAGE, false));

        worker.reload();
        assert!(!worker.ads().is_loaded());
        assert!(worker.should_block_ad("shop.com", url, RequestType::IMAGE, false));
    }

    #[test]
    fn test_missing_data_dir_fails_open() {
        let dir = TempDir::new("worker-missing");
        let config = BlockersConfig {
            data_dir: dir.path().join("absent"),
            ..BlockersConfig::default()
        };
        let worker: TestWorker =
            BlockersWorker::from_config(config, Arc::new(HostSettingsTable::default()));

        assert_eq!(
            worker.evaluate(&request("shop.com", "http://ads.com/banner/1.png", "ads.com")),
            RequestDecision::Allow
        );
    }

    #[test]
    fn test_from_config_reads_pointer_files() {
        let dir = TempDir::new("worker-pointers");
        let names = DatasetNames::default();
        dir.write("ads-v1.dat", b"/banner/");
        dir.write(&names.adblock, b"ads-v1.dat\n");
        let config = BlockersConfig {
            data_dir: dir.path().to_path_buf(),
            ..BlockersConfig::default()
        };
        let worker: TestWorker =
            BlockersWorker::from_config(config, Arc::new(HostSettingsTable::default()));

        assert!(worker.should_block_ad(
            "shop.com",
            "http://x.com/banner/",
            RequestType::OTHER,
            false
        ));
    }

    #[test]
    fn test_concurrent_queries_load_once() {
        let dir = TempDir::new("worker-concurrent");
        let resolver = resolver(&dir);
        let worker: TestWorker = BlockersWorker::new(
            BlockersConfig::default(),
            resolver.clone(),
            Arc::new(HostSettingsTable::default()),
        );

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert!(worker.should_block_ad(
                        "a.com",
                        "http://b.com/banner/",
                        RequestType::OTHER,
                        false
                    ));
                    assert!(worker.should_block_tracker("a.com", "tracker.com"));
                });
            }
        });

        // One resolution per dataset
        assert_eq!(resolver.resolve_count(), 2);
    }
}

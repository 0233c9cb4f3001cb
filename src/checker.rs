//! VPN verdict engine.
//!
//! [`VpnChecker::is_vpn`] resolves one address through, in order:
//!
//! 1. validation (no I/O for malformed input)
//! 2. the range cache: a hit is final and returns the stored reason
//! 3. offline mode: a miss means "not banned"
//! 4. the short-term whitelist
//! 5. a concurrent fan-out to every provider, each bounded by a timeout
//! 6. a quorum over the valid answers
//! 7. caching: VPN verdicts go to the range cache for good, clean ones to
//!    the whitelist
//!
//! Storage errors in steps 2 and 4 fail the check. Provider errors only
//! shrink the quorum denominator. With no valid answer at all the check is
//! "not VPN" and nothing is cached.

use crate::error::{CheckError, ProviderError};
use crate::metrics;
use crate::providers::ReputationProvider;
use crate::security::{IpRange, parse_ipv4};
use crate::store::{RangeStore, WhitelistStore};
use crate::telemetry::CheckTimer;
use futures_util::future::join_all;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reason stored with addresses the providers voted VPN.
pub const ONLINE_REASON: &str = "VPN (online-detected)";

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Cache,
    Offline,
    Whitelist,
    Online,
    /// No provider gave a usable answer.
    Degraded,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Offline => "offline",
            Self::Whitelist => "whitelist",
            Self::Online => "online",
            Self::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ip: Ipv4Addr,
    pub is_vpn: bool,
    /// Stored reason for cache hits; empty otherwise, the caller supplies
    /// its default ban message.
    pub reason: String,
    pub source: VerdictSource,
}

impl Verdict {
    fn new(ip: Ipv4Addr, is_vpn: bool, reason: String, source: VerdictSource) -> Self {
        metrics::record_verdict(source.as_str());
        Self {
            ip,
            is_vpn,
            reason,
            source,
        }
    }
}

/// Decide from provider answers. `None` entries are excluded; returns
/// `None` when no valid answer remains.
pub fn quorum(votes: &[Option<bool>], threshold: f64) -> Option<bool> {
    let total = votes.iter().flatten().count();
    if total == 0 {
        return None;
    }
    let positive = votes.iter().flatten().filter(|v| **v).count();
    Some(positive as f64 / total as f64 >= threshold)
}

pub struct VpnChecker {
    ranges: Arc<dyn RangeStore>,
    whitelist: Arc<dyn WhitelistStore>,
    providers: Vec<Arc<dyn ReputationProvider>>,
    offline: bool,
    threshold: f64,
    lookup_timeout: Duration,
    shutdown: CancellationToken,
}

impl VpnChecker {
    pub fn new(
        ranges: Arc<dyn RangeStore>,
        whitelist: Arc<dyn WhitelistStore>,
        providers: Vec<Arc<dyn ReputationProvider>>,
    ) -> Self {
        Self {
            ranges,
            whitelist,
            providers,
            offline: false,
            threshold: 0.6,
            lookup_timeout: Duration::from_secs(10),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Resolve `raw` to a verdict.
    pub async fn is_vpn(&self, raw: &str) -> Result<Verdict, CheckError> {
        let _timer = CheckTimer::start();
        let ip = parse_ipv4(raw)?;

        if let Some(reason) = self.ranges.find(ip).await? {
            debug!(ip = %ip, reason = %reason, "range cache hit");
            return Ok(Verdict::new(ip, true, reason, VerdictSource::Cache));
        }

        if self.offline {
            debug!(ip = %ip, "not cached, skipping online check");
            return Ok(Verdict::new(ip, false, String::new(), VerdictSource::Offline));
        }

        if self.whitelist.exists(ip).await? {
            debug!(ip = %ip, "whitelist hit");
            return Ok(Verdict::new(ip, false, String::new(), VerdictSource::Whitelist));
        }

        let votes = self.poll_providers(ip).await?;
        let Some(is_vpn) = quorum(&votes, self.threshold) else {
            warn!(
                ip = %ip,
                providers = self.providers.len(),
                "all providers exhausted or unavailable, treating as clean without caching"
            );
            return Ok(Verdict::new(ip, false, String::new(), VerdictSource::Degraded));
        };

        if is_vpn {
            if let Err(e) = self.ranges.insert(IpRange::single(ip), ONLINE_REASON).await {
                warn!(ip = %ip, error = %e, "failed to cache online VPN verdict");
            }
        } else if let Err(e) = self.whitelist.whitelist(ip).await {
            warn!(ip = %ip, error = %e, "failed to whitelist clean address");
        }

        info!(
            ip = %ip,
            is_vpn,
            valid = votes.iter().flatten().count(),
            positive = votes.iter().flatten().filter(|v| **v).count(),
            "online verdict"
        );
        Ok(Verdict::new(ip, is_vpn, String::new(), VerdictSource::Online))
    }

    /// Ask every provider concurrently; `None` marks an excluded answer.
    async fn poll_providers(&self, ip: Ipv4Addr) -> Result<Vec<Option<bool>>, CheckError> {
        let lookups = self.providers.iter().map(|provider| async move {
            let name = provider.name();
            match tokio::time::timeout(self.lookup_timeout, provider.is_vpn(ip)).await {
                Ok(Ok(is_vpn)) => {
                    metrics::record_provider(name, if is_vpn { "vpn" } else { "clean" });
                    Some(is_vpn)
                }
                Ok(Err(ProviderError::RateLimitExceeded)) => {
                    debug!(provider = name, "rate limit reached");
                    metrics::record_provider(name, "rate_limited");
                    None
                }
                Ok(Err(e)) => {
                    warn!(provider = name, error = %e, "provider unavailable");
                    metrics::record_provider(name, e.error_code());
                    None
                }
                Err(_) => {
                    warn!(provider = name, timeout = ?self.lookup_timeout, "provider lookup timed out");
                    metrics::record_provider(name, "timeout");
                    None
                }
            }
        });

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(CheckError::Cancelled),
            votes = join_all(lookups) => Ok(votes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RedbRangeStore, RedbWhitelist, StoreError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockRanges {
        entries: Mutex<HashMap<Ipv4Addr, String>>,
        finds: AtomicUsize,
        inserts: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl RangeStore for MockRanges {
        async fn find(&self, ip: Ipv4Addr) -> Result<Option<String>, StoreError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(StoreError::Database("connection refused".into()));
            }
            Ok(self.entries.lock().get(&ip).cloned())
        }

        async fn insert(&self, range: IpRange, reason: &str) -> Result<(), StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            for ip in range.addresses() {
                self.entries.lock().insert(ip, reason.to_string());
            }
            Ok(())
        }

        async fn remove(&self, range: IpRange) -> Result<(), StoreError> {
            for ip in range.addresses() {
                self.entries.lock().remove(&ip);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockWhitelist {
        entries: Mutex<HashSet<Ipv4Addr>>,
        lookups: AtomicUsize,
        writes: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl WhitelistStore for MockWhitelist {
        async fn exists(&self, ip: Ipv4Addr) -> Result<bool, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(StoreError::Database("whitelist offline".into()));
            }
            Ok(self.entries.lock().contains(&ip))
        }

        async fn whitelist(&self, ip: Ipv4Addr) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().insert(ip);
            Ok(())
        }
    }

    struct MockProvider {
        answer: Result<bool, ProviderError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn answering(answer: Result<bool, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(true),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReputationProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn is_vpn(&self, _ip: Ipv4Addr) -> Result<bool, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone()
        }
    }

    struct Fixture {
        ranges: Arc<MockRanges>,
        whitelist: Arc<MockWhitelist>,
        providers: Vec<Arc<MockProvider>>,
    }

    impl Fixture {
        fn new(answers: Vec<Result<bool, ProviderError>>) -> Self {
            Self {
                ranges: Arc::new(MockRanges::default()),
                whitelist: Arc::new(MockWhitelist::default()),
                providers: answers.into_iter().map(MockProvider::answering).collect(),
            }
        }

        fn checker(&self) -> VpnChecker {
            VpnChecker::new(
                self.ranges.clone(),
                self.whitelist.clone(),
                self.providers
                    .iter()
                    .map(|p| p.clone() as Arc<dyn ReputationProvider>)
                    .collect(),
            )
        }

        fn provider_calls(&self) -> usize {
            self.providers.iter().map(|p| p.calls()).sum()
        }
    }

    fn unavailable() -> Result<bool, ProviderError> {
        Err(ProviderError::Unavailable("boom".into()))
    }

    #[test]
    fn test_quorum_math() {
        let votes = [Some(true), Some(true), Some(true), Some(false), Some(false)];
        assert_eq!(quorum(&votes, 0.6), Some(true));
        assert_eq!(quorum(&votes, 0.7), Some(false));
        assert_eq!(quorum(&[None, None], 0.6), None);
        assert_eq!(quorum(&[], 0.6), None);
        assert_eq!(quorum(&[None, Some(true), None], 1.0), Some(true));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_providers() {
        let fx = Fixture::new(vec![Ok(false), Ok(false)]);
        fx.ranges
            .entries
            .lock()
            .insert(Ipv4Addr::new(5, 5, 5, 5), "known hoster".into());

        let verdict = fx.checker().is_vpn("5.5.5.5").await.unwrap();
        assert!(verdict.is_vpn);
        assert_eq!(verdict.reason, "known hoster");
        assert_eq!(verdict.source, VerdictSource::Cache);
        assert_eq!(fx.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_address_before_any_io() {
        let fx = Fixture::new(vec![Ok(true)]);
        let checker = fx.checker();
        for raw in ["999.1.1.1", "not-an-ip"] {
            let err = checker.is_vpn(raw).await.unwrap_err();
            assert!(matches!(err, CheckError::InvalidAddress(_)));
        }
        assert_eq!(fx.ranges.finds.load(Ordering::SeqCst), 0);
        assert_eq!(fx.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_quorum_three_of_five() {
        let answers = || vec![Ok(true), Ok(true), Ok(true), Ok(false), Ok(false)];

        let fx = Fixture::new(answers());
        let verdict = fx.checker().threshold(0.6).is_vpn("9.9.9.9").await.unwrap();
        assert!(verdict.is_vpn);
        assert_eq!(verdict.reason, "");
        assert_eq!(verdict.source, VerdictSource::Online);
        assert_eq!(fx.provider_calls(), 5);

        let fx = Fixture::new(answers());
        let verdict = fx.checker().threshold(0.7).is_vpn("9.9.9.9").await.unwrap();
        assert!(!verdict.is_vpn);
    }

    #[tokio::test]
    async fn test_vpn_verdict_is_cached_permanently() {
        let fx = Fixture::new(vec![Ok(true), Ok(true)]);
        let checker = fx.checker();

        assert!(checker.is_vpn("7.7.7.7").await.unwrap().is_vpn);
        assert_eq!(fx.ranges.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(fx.whitelist.writes.load(Ordering::SeqCst), 0);

        let again = checker.is_vpn("7.7.7.7").await.unwrap();
        assert_eq!(again.source, VerdictSource::Cache);
        assert_eq!(again.reason, ONLINE_REASON);
        assert_eq!(fx.provider_calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_shrink_denominator() {
        let fx = Fixture::new(vec![
            Ok(true),
            Err(ProviderError::RateLimitExceeded),
            unavailable(),
            unavailable(),
        ]);
        let verdict = fx.checker().threshold(0.9).is_vpn("8.8.4.4").await.unwrap();
        assert!(verdict.is_vpn);
    }

    #[tokio::test]
    async fn test_degraded_mode_caches_nothing() {
        let fx = Fixture::new((0..5).map(|_| unavailable()).collect());
        let verdict = fx.checker().is_vpn("1.2.3.4").await.unwrap();

        assert!(!verdict.is_vpn);
        assert_eq!(verdict.reason, "");
        assert_eq!(verdict.source, VerdictSource::Degraded);
        assert_eq!(fx.ranges.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(fx.whitelist.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_providers_is_degraded() {
        let fx = Fixture::new(vec![]);
        let verdict = fx.checker().is_vpn("1.2.3.4").await.unwrap();
        assert_eq!(verdict.source, VerdictSource::Degraded);
    }

    #[tokio::test]
    async fn test_whitelist_short_circuit() {
        let fx = Fixture::new(vec![Ok(false), Ok(false), Ok(true)]);
        let checker = fx.checker();

        let first = checker.is_vpn("3.3.3.3").await.unwrap();
        assert!(!first.is_vpn);
        assert_eq!(fx.whitelist.writes.load(Ordering::SeqCst), 1);
        assert_eq!(fx.provider_calls(), 3);

        let second = checker.is_vpn("3.3.3.3").await.unwrap();
        assert!(!second.is_vpn);
        assert_eq!(second.reason, "");
        assert_eq!(second.source, VerdictSource::Whitelist);
        assert_eq!(fx.provider_calls(), 3);
        assert_eq!(fx.whitelist.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_offline_trusts_cache_only() {
        let fx = Fixture::new(vec![Ok(true)]);
        fx.whitelist.entries.lock().insert(Ipv4Addr::new(4, 4, 4, 4));
        let checker = fx.checker().offline(true);

        let verdict = checker.is_vpn("6.6.6.6").await.unwrap();
        assert!(!verdict.is_vpn);
        assert_eq!(verdict.source, VerdictSource::Offline);
        assert_eq!(fx.provider_calls(), 0);
        assert_eq!(fx.ranges.inserts.load(Ordering::SeqCst), 0);

        // Whitelisted or not, offline never reads the whitelist.
        let verdict = checker.is_vpn("4.4.4.4").await.unwrap();
        assert_eq!(verdict.source, VerdictSource::Offline);
        assert_eq!(fx.ranges.finds.load(Ordering::SeqCst), 2);
        assert_eq!(fx.whitelist.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(fx.whitelist.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_storage_errors_fail_the_check() {
        let fx = Fixture {
            ranges: Arc::new(MockRanges {
                broken: true,
                ..Default::default()
            }),
            whitelist: Arc::new(MockWhitelist::default()),
            providers: vec![MockProvider::answering(Ok(true))],
        };
        let err = fx.checker().is_vpn("1.1.1.1").await.unwrap_err();
        assert!(matches!(err, CheckError::Storage(_)));
        assert_eq!(fx.provider_calls(), 0);

        let fx = Fixture {
            ranges: Arc::new(MockRanges::default()),
            whitelist: Arc::new(MockWhitelist {
                broken: true,
                ..Default::default()
            }),
            providers: vec![MockProvider::answering(Ok(true))],
        };
        let err = fx.checker().is_vpn("1.1.1.1").await.unwrap_err();
        assert_eq!(err.error_code(), "storage_unavailable");
        assert_eq!(fx.provider_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_and_is_excluded() {
        let fast = MockProvider::answering(Ok(false));
        let slow = MockProvider::slow(Duration::from_secs(60));
        let ranges = Arc::new(MockRanges::default());
        let whitelist = Arc::new(MockWhitelist::default());
        let checker = VpnChecker::new(
            ranges.clone(),
            whitelist.clone(),
            vec![
                fast.clone() as Arc<dyn ReputationProvider>,
                slow.clone() as Arc<dyn ReputationProvider>,
            ],
        )
        .lookup_timeout(Duration::from_secs(1));

        let verdict = checker.is_vpn("2.2.2.2").await.unwrap();
        assert!(!verdict.is_vpn);
        assert_eq!(verdict.source, VerdictSource::Online);
        assert_eq!(slow.calls(), 1);
        assert_eq!(whitelist.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_are_polled_concurrently() {
        let delay = Duration::from_secs(5);
        let slow: Vec<Arc<MockProvider>> = (0..5).map(|_| MockProvider::slow(delay)).collect();
        let providers: Vec<Arc<dyn ReputationProvider>> = slow
            .iter()
            .map(|p| p.clone() as Arc<dyn ReputationProvider>)
            .collect();
        let ranges = Arc::new(MockRanges::default());
        let checker = VpnChecker::new(ranges.clone(), Arc::new(MockWhitelist::default()), providers)
            .lookup_timeout(Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let verdict = checker.is_vpn("2.2.2.2").await.unwrap();
        let elapsed = started.elapsed();

        // Every answer counted, in one provider delay rather than five.
        assert!(verdict.is_vpn);
        assert_eq!(verdict.source, VerdictSource::Online);
        assert!(slow.iter().all(|p| p.calls() == 1));
        assert!(elapsed >= delay, "{elapsed:?}");
        assert!(elapsed < delay * 2, "{elapsed:?}");
        assert_eq!(ranges.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_lookups_without_caching() {
        let slow = MockProvider::slow(Duration::from_secs(30));
        let ranges = Arc::new(MockRanges::default());
        let whitelist = Arc::new(MockWhitelist::default());
        let token = CancellationToken::new();
        let providers: Vec<Arc<dyn ReputationProvider>> = vec![slow.clone()];
        let checker = VpnChecker::new(ranges.clone(), whitelist.clone(), providers)
            .lookup_timeout(Duration::from_secs(60))
            .shutdown(token.clone());

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let err = checker.is_vpn("2.2.2.2").await.unwrap_err();
        cancel.await.unwrap();
        assert!(matches!(err, CheckError::Cancelled));
        assert_eq!(ranges.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(whitelist.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_redb_stores_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let ranges = Arc::new(RedbRangeStore::new(dir.path().join("r.redb")).unwrap());
        let whitelist = Arc::new(
            RedbWhitelist::new(dir.path().join("w.redb"), Duration::from_secs(3600)).unwrap(),
        );
        ranges
            .insert("10.8.0.0/24".parse().unwrap(), "corporate vpn")
            .await
            .unwrap();

        let vote = MockProvider::answering(Ok(false));
        let providers: Vec<Arc<dyn ReputationProvider>> = vec![vote.clone()];
        let checker = VpnChecker::new(ranges.clone(), whitelist, providers);

        let hit = checker.is_vpn("10.8.0.77").await.unwrap();
        assert_eq!(hit.reason, "corporate vpn");

        let clean = checker.is_vpn("192.0.2.1").await.unwrap();
        assert_eq!(clean.source, VerdictSource::Online);
        let again = checker.is_vpn("192.0.2.1").await.unwrap();
        assert_eq!(again.source, VerdictSource::Whitelist);
        assert_eq!(vote.calls(), 1);
    }
}

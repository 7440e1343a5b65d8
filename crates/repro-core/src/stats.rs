//! Operation timing statistics.
//!
//! Workers time every executor call into their own [`Stats`] without any
//! synchronization and merge it into the batch's [`SharedStats`] once, when
//! they finish.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Count, total and maximum duration of the timed operations.
///
/// Not meant to be shared: use one instance per worker and [`Stats::merge`]
/// them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    name: String,
    count: u64,
    total: Duration,
    max: Duration,
}

impl Stats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            total: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Average duration, truncated to whole milliseconds.
    pub fn average_millis(&self) -> Option<u128> {
        (self.count > 0).then(|| self.total.as_millis() / self.count as u128)
    }

    /// Record one sample.
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    /// Run `fut` to completion and record its wall-clock duration, whatever it returns.
    pub async fn time<F>(&mut self, fut: F) -> F::Output
    where
        F: Future,
    {
        let start = Instant::now();
        let output = fut.await;
        self.record(start.elapsed());
        output
    }

    /// Fold `other` into `self`. The name of `self` is kept.
    pub fn merge(&mut self, other: &Stats) {
        self.count += other.count;
        self.total += other.total;
        self.max = self.max.max(other.max);
    }
}

/// Renders `name: count=<c>, avg_time=<avg>ms, max_time=<max>ms`, or nothing
/// when no operation was recorded.
impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(avg) = self.average_millis() else {
            return Ok(());
        };
        write!(
            f,
            "{}: count={}, avg_time={}ms, max_time={}ms",
            self.name,
            self.count,
            avg,
            self.max.as_millis()
        )
    }
}

/// Per-batch aggregate that only ever changes through [`SharedStats::merge`].
#[derive(Debug, Clone)]
pub struct SharedStats {
    name: Arc<str>,
    inner: Arc<Mutex<Stats>>,
}

impl SharedStats {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            inner: Arc::new(Mutex::new(Stats::new(name.clone()))),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fresh worker-local accumulator carrying this aggregate's name.
    pub fn local(&self) -> Stats {
        Stats::new(self.name.as_ref())
    }

    /// Merge a finished worker's accumulator. The lock is held for the merge only.
    pub async fn merge(&self, local: &Stats) {
        self.inner.lock().await.merge(local);
    }

    pub async fn snapshot(&self) -> Stats {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(name: &str, samples_ms: &[u64]) -> Stats {
        let mut stats = Stats::new(name);
        for ms in samples_ms {
            stats.record(Duration::from_millis(*ms));
        }
        stats
    }

    #[test]
    fn test_empty_stats_render_nothing() {
        let stats = Stats::new("parent inserts");
        assert!(stats.is_empty());
        assert_eq!(stats.to_string(), "");
        assert_eq!(stats.average_millis(), None);
    }

    #[test]
    fn test_render_format() {
        let stats = stats("parent inserts", &[50, 100, 150]);
        assert_eq!(
            stats.to_string(),
            "parent inserts: count=3, avg_time=100ms, max_time=150ms"
        );
    }

    #[test]
    fn test_average_truncates() {
        let stats = stats("child inserts", &[1, 1, 0]);
        assert_eq!(stats.average_millis(), Some(0));

        let stats = stats_with_total(3, Duration::from_millis(302));
        assert_eq!(stats.average_millis(), Some(100));
    }

    fn stats_with_total(count: u64, total: Duration) -> Stats {
        Stats {
            name: "x".to_string(),
            count,
            total,
            max: total,
        }
    }

    #[test]
    fn test_merge_sums_and_takes_max() {
        let mut a = stats("p", &[10, 20]);
        let b = stats("other", &[5, 40, 1]);
        a.merge(&b);

        assert_eq!(a.name(), "p");
        assert_eq!(a.count(), 5);
        assert_eq!(a.total(), Duration::from_millis(76));
        assert_eq!(a.max(), Duration::from_millis(40));
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let mut a = stats("p", &[10, 20]);
        let before = a.clone();
        a.merge(&Stats::new("p"));
        assert_eq!(a, before);
    }

    #[test]
    fn test_time_records_regardless_of_result() {
        let mut stats = Stats::new("p");
        let ok: Result<(), &str> = tokio_test::block_on(stats.time(async { Ok(()) }));
        let err: Result<(), &str> = tokio_test::block_on(stats.time(async { Err("boom") }));

        assert!(ok.is_ok());
        assert!(err.is_err());
        assert_eq!(stats.count(), 2);
        assert!(stats.max() <= stats.total());
    }

    #[tokio::test]
    async fn test_time_measures_elapsed() {
        let mut stats = Stats::new("p");
        stats
            .time(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert_eq!(stats.count(), 1);
        assert!(stats.max() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_shared_stats_merge_and_snapshot() {
        let shared = SharedStats::new("parent inserts");
        let mut local = shared.local();
        assert_eq!(local.name(), "parent inserts");

        local.record(Duration::from_millis(7));
        shared.merge(&local).await;
        shared.merge(&local).await;

        let snapshot = shared.snapshot().await;
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.total(), Duration::from_millis(14));
        assert_eq!(snapshot.max(), Duration::from_millis(7));
    }
}

//! Typed cache layer for report values.
//!
//! Keys follow `<metric>_<ISO date>` for daily values and
//! `<metric>_<begin>_<end>` for whole-window aggregates. Values are stored
//! as JSON and recovered through serde typed by metric kind, so a corrupted
//! or foreign entry degrades to a miss instead of a wrongly-typed value.
//! Every failure here is swallowed with a warning: the report engine must
//! fall back to recomputing from the store, never error out.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::CacheBackend;

/// A fully-elapsed day's value is immutable; 24 hours is effectively
/// "forever" relative to report refresh cadence.
pub const DAILY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Window aggregates are keyed by a caller-chosen range; reuse is only
/// likely within a tight dashboard refresh loop.
pub const RANGE_TTL: Duration = Duration::from_secs(60);

/// The per-day metrics the report engine caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Turnover,
    TotalUsers,
    NewUsers,
    OrderCount,
    ValidOrderCount,
}

impl MetricKind {
    pub fn daily_key(self, date: NaiveDate) -> String {
        format!("{}_{}", self, date)
    }
}

pub fn range_key(metric: &str, begin: NaiveDate, end: NaiveDate) -> String {
    format!("{}_{}_{}", metric, begin, end)
}

#[derive(Clone)]
pub struct ReportCache {
    backend: Arc<dyn CacheBackend>,
}

impl ReportCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub async fn get_daily<T: DeserializeOwned>(&self, kind: MetricKind, date: NaiveDate) -> Option<T> {
        self.get_value(&kind.daily_key(date)).await
    }

    pub async fn put_daily<T: Serialize>(&self, kind: MetricKind, date: NaiveDate, value: &T) {
        self.put_value(&kind.daily_key(date), value, DAILY_TTL).await;
    }

    pub async fn get_range<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key).await
    }

    pub async fn put_range<T: Serialize>(&self, key: &str, value: &T) {
        self.put_value(key, value, RANGE_TTL).await;
    }

    async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "cache read failed; falling back to store");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cached value failed to deserialize; treating as miss");
                None
            }
        }
    }

    async fn put_value<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "report value failed to serialize; skipping cache write");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, &raw, Some(ttl)).await {
            warn!(key, error = %e, "cache write failed; continuing without caching");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn keys_follow_reference_scheme() {
        assert_eq!(
            MetricKind::Turnover.daily_key(date("2024-05-01")),
            "turnover_2024-05-01"
        );
        assert_eq!(
            MetricKind::ValidOrderCount.daily_key(date("2024-05-01")),
            "valid_order_count_2024-05-01"
        );
        assert_eq!(
            range_key("sales_top10", date("2024-05-01"), date("2024-05-07")),
            "sales_top10_2024-05-01_2024-05-07"
        );
    }

    #[tokio::test]
    async fn foreign_entry_is_a_miss_not_a_panic() {
        let backend = Arc::new(InMemoryCache::new());
        backend
            .set("turnover_2024-05-01", "not json at all", None)
            .await
            .unwrap();
        let cache = ReportCache::new(backend);
        let got: Option<i64> = cache.get_daily(MetricKind::Turnover, date("2024-05-01")).await;
        assert_eq!(got, None);
    }
}

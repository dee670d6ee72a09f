use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use takeout_api::cache::{CacheBackend, CacheError, InMemoryCache, MetricKind, ReportCache};
use takeout_api::entities::OrderStatus;
use takeout_api::errors::ServiceError;
use takeout_api::services::reports::{
    OperationalSnapshot, ReportRange, ReportService, SnapshotRenderer,
};
use takeout_api::services::stats::{ProductSales, StatsStore};

/// Store double returning canned values and counting every call.
#[derive(Default)]
struct CountingStore {
    turnover: Decimal,
    orders_per_day: i64,
    valid_per_day: i64,
    total_users: i64,
    new_users: i64,
    top: Vec<ProductSales>,
    turnover_calls: AtomicUsize,
    order_count_calls: AtomicUsize,
    users_before_calls: AtomicUsize,
    new_users_calls: AtomicUsize,
    top_calls: AtomicUsize,
}

#[async_trait]
impl StatsStore for CountingStore {
    async fn sum_turnover(
        &self,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
        _status: OrderStatus,
    ) -> Result<Decimal, ServiceError> {
        self.turnover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.turnover)
    }

    async fn count_orders(
        &self,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
        status: Option<OrderStatus>,
    ) -> Result<i64, ServiceError> {
        self.order_count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match status {
            None => self.orders_per_day,
            Some(_) => self.valid_per_day,
        })
    }

    async fn count_users_before(&self, _end: DateTime<Utc>) -> Result<i64, ServiceError> {
        self.users_before_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.total_users)
    }

    async fn count_new_users(
        &self,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<i64, ServiceError> {
        self.new_users_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.new_users)
    }

    async fn top_products_by_quantity(
        &self,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
        _status: OrderStatus,
        _limit: u64,
    ) -> Result<Vec<ProductSales>, ServiceError> {
        self.top_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.top.clone())
    }
}

/// Cache double counting reads and writes; `inner` allows seeding entries
/// without touching the counters.
#[derive(Default)]
struct CountingCache {
    inner: InMemoryCache,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

#[async_trait]
impl CacheBackend for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<std::time::Duration>,
    ) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }
}

fn service_with(
    store: CountingStore,
) -> (ReportService, Arc<CountingStore>, Arc<CountingCache>) {
    let store = Arc::new(store);
    let cache = Arc::new(CountingCache::default());
    let service = ReportService::new(store.clone(), ReportCache::new(cache.clone()));
    (service, store, cache)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::test]
async fn future_day_is_zero_without_store_or_cache_calls() {
    let (service, store, cache) = service_with(CountingStore {
        turnover: dec!(123.45),
        ..Default::default()
    });

    let value = service.daily_turnover(today() + Duration::days(3)).await.unwrap();

    assert_eq!(value, Decimal::ZERO);
    assert_eq!(store.turnover_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.gets.load(Ordering::SeqCst), 0);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn today_is_recomputed_and_never_touches_the_cache() {
    let (service, store, cache) = service_with(CountingStore {
        turnover: dec!(123.45),
        ..Default::default()
    });

    // A stale entry for today must be neither read nor refreshed.
    let key = MetricKind::Turnover.daily_key(today());
    let stale = serde_json::to_string(&dec!(999)).unwrap();
    cache.inner.set(&key, &stale, None).await.unwrap();

    let value = service.daily_turnover(today()).await.unwrap();

    assert_eq!(value, dec!(123.45));
    assert_eq!(store.turnover_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.gets.load(Ordering::SeqCst), 0);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 0);
    assert_eq!(cache.inner.get(&key).await.unwrap(), Some(stale));
}

#[tokio::test]
async fn past_day_is_computed_once_then_served_from_cache() {
    let (service, store, cache) = service_with(CountingStore {
        turnover: dec!(50),
        ..Default::default()
    });
    let day = today() - Duration::days(2);

    let first = service.daily_turnover(day).await.unwrap();
    assert_eq!(first, dec!(50));
    assert_eq!(store.turnover_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);

    let second = service.daily_turnover(day).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(
        store.turnover_calls.load(Ordering::SeqCst),
        1,
        "cache hit must not re-query the store"
    );
    assert_eq!(cache.gets.load(Ordering::SeqCst), 2);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn turnover_series_is_comma_joined_per_day() {
    let (service, _store, _cache) = service_with(CountingStore {
        turnover: dec!(5.5),
        ..Default::default()
    });
    let begin = today() - Duration::days(3);
    let end = today() - Duration::days(1);

    let report = service
        .turnover_statistics(ReportRange { begin, end })
        .await
        .unwrap();

    assert_eq!(report.turnover_list, "5.5,5.5,5.5");
    assert_eq!(
        report.date_list,
        format!("{},{},{}", begin, begin + Duration::days(1), end)
    );
}

#[tokio::test]
async fn user_series_carries_cumulative_and_new_counts() {
    let (service, _store, _cache) = service_with(CountingStore {
        total_users: 10,
        new_users: 2,
        ..Default::default()
    });
    let begin = today() - Duration::days(2);
    let end = today() - Duration::days(1);

    let report = service
        .user_statistics(ReportRange { begin, end })
        .await
        .unwrap();

    assert_eq!(report.total_user_list, "10,10");
    assert_eq!(report.new_user_list, "2,2");
}

#[tokio::test]
async fn order_statistics_sums_days_and_derives_rate() {
    let (service, _store, _cache) = service_with(CountingStore {
        orders_per_day: 4,
        valid_per_day: 3,
        ..Default::default()
    });
    let begin = today() - Duration::days(2);
    let end = today() - Duration::days(1);

    let report = service
        .order_statistics(ReportRange { begin, end })
        .await
        .unwrap();

    assert_eq!(report.order_count_list, "4,4");
    assert_eq!(report.valid_order_count_list, "3,3");
    assert_eq!(report.total_order_count, 8);
    assert_eq!(report.valid_order_count, 6);
    assert_eq!(report.order_completion_rate, 0.75);
}

#[tokio::test]
async fn quiet_day_completion_rate_is_one_not_a_division_by_zero() {
    let (service, _store, _cache) = service_with(CountingStore::default());
    let day = today() - Duration::days(1);

    let report = service
        .order_statistics(ReportRange { begin: day, end: day })
        .await
        .unwrap();

    assert_eq!(report.total_order_count, 0);
    assert_eq!(report.order_completion_rate, 1.0);
}

#[tokio::test]
async fn sales_top10_is_cached_by_the_whole_window() {
    let (service, store, _cache) = service_with(CountingStore {
        top: vec![
            ProductSales {
                name: "Braised Pork".to_string(),
                number: 30,
            },
            ProductSales {
                name: "Fried Rice".to_string(),
                number: 10,
            },
        ],
        ..Default::default()
    });
    let range = ReportRange {
        begin: today() - Duration::days(7),
        end: today() - Duration::days(1),
    };

    let first = service.sales_top10(range).await.unwrap();
    assert_eq!(first.name_list, "Braised Pork,Fried Rice");
    assert_eq!(first.number_list, "30,10");
    assert_eq!(store.top_calls.load(Ordering::SeqCst), 1);

    let second = service.sales_top10(range).await.unwrap();
    assert_eq!(second.name_list, first.name_list);
    assert_eq!(
        store.top_calls.load(Ordering::SeqCst),
        1,
        "window hit must be served from cache"
    );
}

#[tokio::test]
async fn sales_top10_clamps_a_future_end_to_today() {
    let (service, _store, cache) = service_with(CountingStore::default());
    let begin = today() - Duration::days(7);

    service
        .sales_top10(ReportRange {
            begin,
            end: today() + Duration::days(5),
        })
        .await
        .unwrap();

    let clamped_key = format!("sales_top10_{}_{}", begin, today());
    assert!(
        cache.inner.get(&clamped_key).await.unwrap().is_some(),
        "cache key must use the clamped window end"
    );
}

#[tokio::test]
async fn business_data_derives_unit_price_and_rate() {
    let (service, _store, _cache) = service_with(CountingStore {
        turnover: dec!(100),
        orders_per_day: 5,
        valid_per_day: 4,
        new_users: 7,
        ..Default::default()
    });
    let begin = Utc::now() - Duration::days(1);
    let end = Utc::now();

    let data = service.business_data(begin, end).await.unwrap();

    assert_eq!(data.turnover, dec!(100));
    assert_eq!(data.valid_order_count, 4);
    assert_eq!(data.unit_price, dec!(25));
    assert_eq!(data.order_completion_rate, 0.8);
    assert_eq!(data.new_users, 7);
}

#[tokio::test]
async fn business_data_with_no_valid_orders_avoids_division() {
    let (service, _store, _cache) = service_with(CountingStore::default());

    let data = service
        .business_data(Utc::now() - Duration::days(1), Utc::now())
        .await
        .unwrap();

    assert_eq!(data.unit_price, Decimal::ZERO);
    assert_eq!(data.order_completion_rate, 1.0);
}

#[derive(Default)]
struct RecordingRenderer {
    seen: Mutex<Option<OperationalSnapshot>>,
}

#[async_trait]
impl SnapshotRenderer for RecordingRenderer {
    async fn render(&self, snapshot: &OperationalSnapshot) -> Result<(), ServiceError> {
        *self.seen.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}

#[tokio::test]
async fn snapshot_export_composes_the_trailing_thirty_days() {
    let (service, store, _cache) = service_with(CountingStore {
        turnover: dec!(10),
        orders_per_day: 2,
        valid_per_day: 2,
        ..Default::default()
    });
    let renderer = RecordingRenderer::default();

    service.export_operational_snapshot(&renderer).await.unwrap();

    let snapshot = renderer.seen.lock().unwrap().clone().unwrap();
    assert_eq!(snapshot.end, today());
    assert_eq!(snapshot.begin, today() - Duration::days(30));
    assert_eq!(snapshot.daily.len(), 30);
    assert_eq!(snapshot.daily[0].date, today(), "most recent day first");
    assert_eq!(snapshot.overview.turnover, dec!(10));
    // One overview plus one call per daily row.
    assert_eq!(store.turnover_calls.load(Ordering::SeqCst), 31);
}

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

use crate::cache::{MetricKind, ReportCache};
use crate::cache::report::range_key;
use crate::entities::OrderStatus;
use crate::errors::ServiceError;
use crate::services::stats::{ProductSales, StatsStore};

const TOP_SALES_LIMIT: u64 = 10;

/// Inclusive date range for the range-report operations.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportRange {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    fn check(&self) -> Result<(), ServiceError> {
        if self.begin > self.end {
            return Err(ServiceError::ValidationError(format!(
                "Report range begins {} after it ends {}",
                self.begin, self.end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoverReport {
    pub date_list: String,
    pub turnover_list: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    pub date_list: String,
    pub total_user_list: String,
    pub new_user_list: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReport {
    pub date_list: String,
    pub order_count_list: String,
    pub valid_order_count_list: String,
    pub total_order_count: i64,
    pub valid_order_count: i64,
    pub order_completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesTop10Report {
    pub name_list: String,
    pub number_list: String,
}

/// Window overview used by the merchant workspace and the snapshot export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessData {
    pub turnover: Decimal,
    pub valid_order_count: i64,
    pub order_completion_rate: f64,
    pub unit_price: Decimal,
    pub new_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBusinessRow {
    pub date: NaiveDate,
    pub data: BusinessData,
}

/// A fixed trailing window of business data, handed to an external
/// document renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalSnapshot {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub overview: BusinessData,
    pub daily: Vec<DailyBusinessRow>,
}

/// External document-rendering collaborator for the operational snapshot.
/// The formatting itself is out of this core's hands.
#[async_trait]
pub trait SnapshotRenderer: Send + Sync {
    async fn render(&self, snapshot: &OperationalSnapshot) -> Result<(), ServiceError>;
}

/// Cache-aside statistics engine.
///
/// Per-day values follow one policy everywhere: a future day is zero
/// without touching store or cache, today is always recomputed because it
/// is still accumulating, and a fully-elapsed day is immutable: cached on
/// first computation and served from cache afterwards.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn StatsStore>,
    cache: ReportCache,
}

impl ReportService {
    pub fn new(store: Arc<dyn StatsStore>, cache: ReportCache) -> Self {
        Self { store, cache }
    }

    pub async fn daily_turnover(&self, date: NaiveDate) -> Result<Decimal, ServiceError> {
        let (begin, end) = day_bounds(date);
        self.daily_cached(MetricKind::Turnover, date, || async move {
            self.store
                .sum_turnover(begin, end, OrderStatus::Completed)
                .await
        })
        .await
    }

    pub async fn daily_total_users(&self, date: NaiveDate) -> Result<i64, ServiceError> {
        let (_, end) = day_bounds(date);
        self.daily_cached(MetricKind::TotalUsers, date, || async move {
            self.store.count_users_before(end).await
        })
        .await
    }

    pub async fn daily_new_users(&self, date: NaiveDate) -> Result<i64, ServiceError> {
        let (begin, end) = day_bounds(date);
        self.daily_cached(MetricKind::NewUsers, date, || async move {
            self.store.count_new_users(begin, end).await
        })
        .await
    }

    pub async fn daily_order_count(&self, date: NaiveDate) -> Result<i64, ServiceError> {
        let (begin, end) = day_bounds(date);
        self.daily_cached(MetricKind::OrderCount, date, || async move {
            self.store.count_orders(begin, end, None).await
        })
        .await
    }

    pub async fn daily_valid_order_count(&self, date: NaiveDate) -> Result<i64, ServiceError> {
        let (begin, end) = day_bounds(date);
        self.daily_cached(MetricKind::ValidOrderCount, date, || async move {
            self.store
                .count_orders(begin, end, Some(OrderStatus::Completed))
                .await
        })
        .await
    }

    /// Turnover per day across the range.
    #[instrument(skip(self))]
    pub async fn turnover_statistics(
        &self,
        range: ReportRange,
    ) -> Result<TurnoverReport, ServiceError> {
        range.check()?;
        let dates = date_sequence(range.begin, range.end);
        let mut turnover = Vec::with_capacity(dates.len());
        for date in &dates {
            turnover.push(self.daily_turnover(*date).await?);
        }
        Ok(TurnoverReport {
            date_list: join(&dates),
            turnover_list: join(&turnover),
        })
    }

    /// Cumulative and newly-registered users per day across the range.
    #[instrument(skip(self))]
    pub async fn user_statistics(&self, range: ReportRange) -> Result<UserReport, ServiceError> {
        range.check()?;
        let dates = date_sequence(range.begin, range.end);
        let mut total_users = Vec::with_capacity(dates.len());
        let mut new_users = Vec::with_capacity(dates.len());
        for date in &dates {
            total_users.push(self.daily_total_users(*date).await?);
            new_users.push(self.daily_new_users(*date).await?);
        }
        Ok(UserReport {
            date_list: join(&dates),
            total_user_list: join(&total_users),
            new_user_list: join(&new_users),
        })
    }

    /// Order volume and completion per day across the range.
    #[instrument(skip(self))]
    pub async fn order_statistics(&self, range: ReportRange) -> Result<OrderReport, ServiceError> {
        range.check()?;
        let dates = date_sequence(range.begin, range.end);
        let mut order_counts = Vec::with_capacity(dates.len());
        let mut valid_counts = Vec::with_capacity(dates.len());
        let mut total_order_count = 0i64;
        let mut valid_order_count = 0i64;
        for date in &dates {
            let orders = self.daily_order_count(*date).await?;
            let valid = self.daily_valid_order_count(*date).await?;
            total_order_count += orders;
            valid_order_count += valid;
            order_counts.push(orders);
            valid_counts.push(valid);
        }
        Ok(OrderReport {
            date_list: join(&dates),
            order_count_list: join(&order_counts),
            valid_order_count_list: join(&valid_counts),
            total_order_count,
            valid_order_count,
            order_completion_rate: completion_rate(valid_order_count, total_order_count),
        })
    }

    /// Top ten products by quantity over the window, completed orders only.
    ///
    /// The whole window is the cache key, so the TTL is short: reuse is
    /// only likely from a dashboard polling the same range.
    #[instrument(skip(self))]
    pub async fn sales_top10(&self, range: ReportRange) -> Result<SalesTop10Report, ServiceError> {
        range.check()?;
        // No orders exist past today; clamp so the key stays stable too.
        let end = range.end.min(Utc::now().date_naive());
        let key = range_key("sales_top10", range.begin, end);

        let ranked = match self.cache.get_range::<Vec<ProductSales>>(&key).await {
            Some(ranked) => ranked,
            None => {
                let begin = day_start(range.begin);
                let (_, window_end) = day_bounds(end);
                let ranked = self
                    .store
                    .top_products_by_quantity(
                        begin,
                        window_end,
                        OrderStatus::Completed,
                        TOP_SALES_LIMIT,
                    )
                    .await?;
                self.cache.put_range(&key, &ranked).await;
                ranked
            }
        };

        Ok(SalesTop10Report {
            name_list: join_with(&ranked, |p| p.name.clone()),
            number_list: join_with(&ranked, |p| p.number.to_string()),
        })
    }

    /// Overview aggregates for an arbitrary window. Uncached: the window is
    /// caller-chosen and usually includes today.
    pub async fn business_data(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BusinessData, ServiceError> {
        let turnover = self
            .store
            .sum_turnover(begin, end, OrderStatus::Completed)
            .await?;
        let total_orders = self.store.count_orders(begin, end, None).await?;
        let valid_orders = self
            .store
            .count_orders(begin, end, Some(OrderStatus::Completed))
            .await?;
        let unit_price = if valid_orders == 0 {
            Decimal::ZERO
        } else {
            turnover / Decimal::from(valid_orders)
        };
        let new_users = self.store.count_new_users(begin, end).await?;
        Ok(BusinessData {
            turnover,
            valid_order_count: valid_orders,
            order_completion_rate: completion_rate(valid_orders, total_orders),
            unit_price,
            new_users,
        })
    }

    /// Composes the trailing-30-day window (one overview plus a row per
    /// day, most recent first) and hands it to the renderer.
    #[instrument(skip(self, renderer))]
    pub async fn export_operational_snapshot(
        &self,
        renderer: &dyn SnapshotRenderer,
    ) -> Result<(), ServiceError> {
        let today = Utc::now().date_naive();
        let begin = today - ChronoDuration::days(30);

        let overview = self
            .business_data(day_start(begin), day_bounds(today).1)
            .await?;

        let mut daily = Vec::with_capacity(30);
        let mut date = today;
        for _ in 0..30 {
            let (day_begin, day_end) = day_bounds(date);
            let data = self.business_data(day_begin, day_end).await?;
            daily.push(DailyBusinessRow { date, data });
            date = date - ChronoDuration::days(1);
        }

        renderer
            .render(&OperationalSnapshot {
                begin,
                end: today,
                overview,
                daily,
            })
            .await
    }

    /// The shared cache-aside policy for every per-day metric.
    async fn daily_cached<T, F, Fut>(
        &self,
        kind: MetricKind,
        date: NaiveDate,
        compute: F,
    ) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let today = Utc::now().date_naive();
        if date > today {
            return Ok(T::default());
        }
        if date < today {
            if let Some(value) = self.cache.get_daily(kind, date).await {
                return Ok(value);
            }
        }
        let value = compute().await?;
        if date < today {
            self.cache.put_daily(kind, date, &value).await;
        }
        Ok(value)
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Half-open bounds of a calendar day: `[midnight, next midnight)`.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (day_start(date), day_start(date + ChronoDuration::days(1)))
}

fn date_sequence(begin: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = begin;
    while date <= end {
        dates.push(date);
        date = date + ChronoDuration::days(1);
    }
    dates
}

fn completion_rate(valid: i64, total: i64) -> f64 {
    // A day with no traffic counts as fully completed, not as a zero
    // division.
    if total == 0 {
        1.0
    } else {
        valid as f64 / total as f64
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn join_with<T, F: Fn(&T) -> String>(items: &[T], f: F) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(",")
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::DbPool;
use crate::entities::{order, order_detail, user, OrderStatus};
use crate::errors::ServiceError;

/// One row of the product leaderboard: snapshot name plus total quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub name: String,
    pub number: i64,
}

/// Aggregate queries the report engine runs against the store of record.
/// Time windows are half-open: `[begin, end)`.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn sum_turnover(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        status: OrderStatus,
    ) -> Result<Decimal, ServiceError>;

    async fn count_orders(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<OrderStatus>,
    ) -> Result<i64, ServiceError>;

    /// Users registered strictly before `end` (cumulative user count).
    async fn count_users_before(&self, end: DateTime<Utc>) -> Result<i64, ServiceError>;

    async fn count_new_users(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, ServiceError>;

    /// Order lines of orders in `status`, grouped by product-name snapshot,
    /// ranked by total quantity descending.
    async fn top_products_by_quantity(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        status: OrderStatus,
        limit: u64,
    ) -> Result<Vec<ProductSales>, ServiceError>;
}

/// Production store implementation; pushes the aggregation into SQL.
#[derive(Clone)]
pub struct SeaOrmStatsStore {
    db: Arc<DbPool>,
}

impl SeaOrmStatsStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct TurnoverRow {
    total: Option<Decimal>,
}

#[derive(Debug, FromQueryResult)]
struct SalesRow {
    name: String,
    total: Option<i64>,
}

#[async_trait]
impl StatsStore for SeaOrmStatsStore {
    async fn sum_turnover(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        status: OrderStatus,
    ) -> Result<Decimal, ServiceError> {
        let row = order::Entity::find()
            .select_only()
            .column_as(order::Column::Amount.sum(), "total")
            .filter(order::Column::Status.eq(status))
            .filter(order::Column::OrderTime.gte(begin))
            .filter(order::Column::OrderTime.lt(end))
            .into_model::<TurnoverRow>()
            .one(&*self.db)
            .await?;
        Ok(row.and_then(|r| r.total).unwrap_or(Decimal::ZERO))
    }

    async fn count_orders(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<OrderStatus>,
    ) -> Result<i64, ServiceError> {
        let mut query = order::Entity::find()
            .filter(order::Column::OrderTime.gte(begin))
            .filter(order::Column::OrderTime.lt(end));
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        Ok(query.count(&*self.db).await? as i64)
    }

    async fn count_users_before(&self, end: DateTime<Utc>) -> Result<i64, ServiceError> {
        let count = user::Entity::find()
            .filter(user::Column::CreatedAt.lt(end))
            .count(&*self.db)
            .await?;
        Ok(count as i64)
    }

    async fn count_new_users(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, ServiceError> {
        let count = user::Entity::find()
            .filter(user::Column::CreatedAt.gte(begin))
            .filter(user::Column::CreatedAt.lt(end))
            .count(&*self.db)
            .await?;
        Ok(count as i64)
    }

    async fn top_products_by_quantity(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        status: OrderStatus,
        limit: u64,
    ) -> Result<Vec<ProductSales>, ServiceError> {
        let rows = order_detail::Entity::find()
            .select_only()
            .column(order_detail::Column::Name)
            .column_as(order_detail::Column::Number.sum(), "total")
            .join(JoinType::InnerJoin, order_detail::Relation::Order.def())
            .filter(order::Column::Status.eq(status))
            .filter(order::Column::OrderTime.gte(begin))
            .filter(order::Column::OrderTime.lt(end))
            .group_by(order_detail::Column::Name)
            .order_by_desc(order_detail::Column::Number.sum())
            .limit(limit)
            .into_model::<SalesRow>()
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProductSales {
                name: r.name,
                number: r.total.unwrap_or(0),
            })
            .collect())
    }
}

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SweeperConfig;
use crate::db::DbPool;
use crate::entities::{order, OrderStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

const TIMEOUT_CANCEL_REASON: &str = "timed out, auto-cancelled";

/// Cadence and grace periods resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct SweeperSettings {
    pub unpaid_check_interval: Duration,
    pub unpaid_grace: ChronoDuration,
    pub undelivered_check_interval: Duration,
    pub undelivered_grace: ChronoDuration,
}

impl From<&SweeperConfig> for SweeperSettings {
    fn from(cfg: &SweeperConfig) -> Self {
        Self {
            unpaid_check_interval: Duration::from_secs(cfg.unpaid_check_interval_secs),
            unpaid_grace: ChronoDuration::minutes(cfg.unpaid_grace_minutes),
            undelivered_check_interval: Duration::from_secs(cfg.undelivered_check_interval_secs),
            undelivered_grace: ChronoDuration::hours(cfg.undelivered_grace_hours),
        }
    }
}

/// Forces deadline-based transitions independent of user action:
/// orders unpaid past the grace period are cancelled, deliveries in
/// progress past theirs are completed.
///
/// Every update is guarded by the targeted prior status, so an order a
/// user advances between select and update simply matches zero rows;
/// the sweeper never downgrades a state.
pub struct OrderSweeper {
    db: Arc<DbPool>,
    event_sender: EventSender,
    settings: SweeperSettings,
}

impl OrderSweeper {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, settings: SweeperSettings) -> Self {
        Self {
            db,
            event_sender,
            settings,
        }
    }

    /// Starts both periodic passes. Pass failures are logged; the loops
    /// never exit on error.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let unpaid = {
            let sweeper = Arc::clone(&self);
            tokio::spawn(async move {
                let mut ticker = interval(sweeper.settings.unpaid_check_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(e) = sweeper.sweep_unpaid_once(Utc::now()).await {
                        error!("Unpaid-timeout pass failed: {}", e);
                    }
                }
            })
        };

        let undelivered = {
            let sweeper = Arc::clone(&self);
            tokio::spawn(async move {
                let mut ticker = interval(sweeper.settings.undelivered_check_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(e) = sweeper.sweep_undelivered_once(Utc::now()).await {
                        error!("Undelivered-timeout pass failed: {}", e);
                    }
                }
            })
        };

        info!(
            unpaid_interval_secs = self.settings.unpaid_check_interval.as_secs(),
            undelivered_interval_secs = self.settings.undelivered_check_interval.as_secs(),
            "Timeout sweeper started"
        );
        vec![unpaid, undelivered]
    }

    /// Cancels orders that sat unpaid past the grace period. Each row is
    /// handled independently; one failure never blocks the rest.
    #[instrument(skip(self))]
    pub async fn sweep_unpaid_once(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let deadline = now - self.settings.unpaid_grace;
        let stale = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::PendingPayment))
            .filter(order::Column::OrderTime.lt(deadline))
            .all(&*self.db)
            .await?;

        let mut swept = 0;
        for stale_order in stale {
            let result = order::Entity::update_many()
                .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled))
                .col_expr(
                    order::Column::CancelReason,
                    Expr::value(TIMEOUT_CANCEL_REASON),
                )
                .col_expr(order::Column::CancelTime, Expr::value(now))
                .filter(order::Column::Id.eq(stale_order.id))
                .filter(order::Column::Status.eq(OrderStatus::PendingPayment))
                .exec(&*self.db)
                .await;

            match result {
                Ok(update) if update.rows_affected > 0 => {
                    swept += 1;
                    self.event_sender
                        .emit(Event::OrderCancelled {
                            order_id: stale_order.id,
                            reason: TIMEOUT_CANCEL_REASON.to_string(),
                        })
                        .await;
                }
                Ok(_) => {
                    debug!(order_id = stale_order.id, "order advanced before cancellation; skipped");
                }
                Err(e) => {
                    warn!(order_id = stale_order.id, error = %e, "failed to cancel timed-out order; continuing");
                }
            }
        }

        if swept > 0 {
            info!(swept, "cancelled timed-out unpaid orders");
        }
        Ok(swept)
    }

    /// Completes deliveries stuck in progress past the grace period.
    #[instrument(skip(self))]
    pub async fn sweep_undelivered_once(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let deadline = now - self.settings.undelivered_grace;
        let stale = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::DeliveryInProgress))
            .filter(order::Column::OrderTime.lt(deadline))
            .all(&*self.db)
            .await?;

        let mut swept = 0;
        for stale_order in stale {
            let result = order::Entity::update_many()
                .col_expr(order::Column::Status, Expr::value(OrderStatus::Completed))
                .col_expr(order::Column::DeliveryTime, Expr::value(now))
                .filter(order::Column::Id.eq(stale_order.id))
                .filter(order::Column::Status.eq(OrderStatus::DeliveryInProgress))
                .exec(&*self.db)
                .await;

            match result {
                Ok(update) if update.rows_affected > 0 => {
                    swept += 1;
                    self.event_sender
                        .emit(Event::OrderCompleted {
                            order_id: stale_order.id,
                        })
                        .await;
                }
                Ok(_) => {
                    debug!(order_id = stale_order.id, "order advanced before completion; skipped");
                }
                Err(e) => {
                    warn!(order_id = stale_order.id, error = %e, "failed to complete overdue delivery; continuing");
                }
            }
        }

        if swept > 0 {
            info!(swept, "completed overdue deliveries");
        }
        Ok(swept)
    }
}

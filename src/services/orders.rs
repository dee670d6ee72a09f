use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{address_book, order, order_detail, shopping_cart, user, OrderStatus, PayStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::payments::{PaymentHandle, PaymentProvider};

/// Per-process discriminant folded into every business number so two nodes
/// (or two submissions in the same millisecond) cannot collide.
static NODE_DISCRIMINANT: Lazy<u16> = Lazy::new(|| rand::thread_rng().gen_range(0..1000));
static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Builds a display-facing order number: millisecond timestamp, node
/// discriminant, then a wrapping in-process counter. Digits only.
fn next_order_number(now: DateTime<Utc>) -> String {
    let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!("{}{:03}{:06}", now.timestamp_millis(), *NODE_DISCRIMINANT, seq)
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitOrderRequest {
    pub address_book_id: i64,
    #[validate(length(max = 200, message = "Remark is limited to 200 characters"))]
    pub remark: Option<String>,
}

/// What the storefront shows right after checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    pub order_id: i64,
    pub number: String,
    pub amount: Decimal,
    pub order_time: DateTime<Utc>,
}

/// Outcome of a settlement callback. Everything short of a store failure
/// is an acknowledged outcome, not an error, since the provider retries until
/// acknowledged, so the operation has to be idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentApplication {
    Applied,
    AlreadyApplied,
    UnknownOrder,
    /// The order left `PendingPayment` without being paid (cancelled by
    /// the customer or the sweeper); settlement no longer applies.
    NotPayable,
}

/// Owns order creation, payment application and the authoritative state
/// machine. All writes go through the store of record; identity is always
/// an explicit argument.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            db,
            event_sender,
            payment_provider,
        }
    }

    /// Materializes the user's cart into an order.
    ///
    /// One transaction covers the order insert, the detail-line inserts and
    /// the cart deletion; a failure partway leaves none of the three
    /// effects visible.
    #[instrument(skip(self, request), fields(address_book_id = request.address_book_id))]
    pub async fn submit(
        &self,
        user_id: i64,
        request: SubmitOrderRequest,
    ) -> Result<OrderReceipt, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let address = address_book::Entity::find_by_id(request.address_book_id)
            .filter(address_book::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                warn!(user_id, address_book_id = request.address_book_id, "submit with unknown address");
                ServiceError::ValidationError("Delivery address does not exist".to_string())
            })?;

        let cart_lines = shopping_cart::Entity::find()
            .filter(shopping_cart::Column::UserId.eq(user_id))
            .all(&*self.db)
            .await?;
        if cart_lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Shopping cart is empty".to_string(),
            ));
        }

        let customer = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let now = Utc::now();
        let number = next_order_number(now);
        let amount: Decimal = cart_lines
            .iter()
            .map(|line| line.amount * Decimal::from(line.number))
            .sum();

        let txn = self.db.begin().await?;

        let inserted = order::ActiveModel {
            id: NotSet,
            number: Set(number.clone()),
            status: Set(OrderStatus::PendingPayment),
            pay_status: Set(PayStatus::Unpaid),
            user_id: Set(user_id),
            address_book_id: Set(address.id),
            amount: Set(amount),
            order_time: Set(now),
            checkout_time: Set(None),
            cancel_reason: Set(None),
            cancel_time: Set(None),
            delivery_time: Set(None),
            remark: Set(request.remark),
            consignee: Set(address.consignee.clone()),
            phone: Set(address.phone.clone()),
            address: Set(address.detail.clone()),
            user_name: Set(customer.name.clone()),
        }
        .insert(&txn)
        .await?;

        let details: Vec<order_detail::ActiveModel> = cart_lines
            .iter()
            .map(|line| order_detail::ActiveModel {
                id: NotSet,
                order_id: Set(inserted.id),
                name: Set(line.name.clone()),
                image: Set(line.image.clone()),
                dish_id: Set(line.dish_id),
                setmeal_id: Set(line.setmeal_id),
                dish_flavor: Set(line.dish_flavor.clone()),
                number: Set(line.number),
                amount: Set(line.amount),
            })
            .collect();
        order_detail::Entity::insert_many(details).exec(&txn).await?;

        shopping_cart::Entity::delete_many()
            .filter(shopping_cart::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(order_id = inserted.id, number = %number, amount = %amount, "order submitted");
        self.event_sender
            .emit(Event::OrderSubmitted {
                order_id: inserted.id,
                number: number.clone(),
                amount,
            })
            .await;

        Ok(OrderReceipt {
            order_id: inserted.id,
            number,
            amount,
            order_time: now,
        })
    }

    /// Asks the payment provider for a payable transaction covering the
    /// order. Double-payment attempts surface as `Conflict`.
    #[instrument(skip(self))]
    pub async fn request_payment(
        &self,
        user_id: i64,
        order_number: &str,
    ) -> Result<PaymentHandle, ServiceError> {
        let order = order::Entity::find()
            .filter(order::Column::Number.eq(order_number))
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))?;

        if order.pay_status == PayStatus::Paid {
            return Err(ServiceError::Conflict(format!(
                "Order {} is already paid",
                order_number
            )));
        }

        let payer = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let intent = self
            .payment_provider
            .create_payment(&order.number, order.amount, "takeout order", &payer.openid)
            .await?;
        if intent.already_settled {
            return Err(ServiceError::Conflict(format!(
                "Order {} is already settled with the payment provider",
                order_number
            )));
        }

        Ok(PaymentHandle {
            order_number: order.number,
            transaction_token: intent.transaction_token,
        })
    }

    /// Applies an out-of-band settlement confirmation.
    ///
    /// Idempotent: a duplicate callback is a no-op, and an unknown
    /// reference is logged and acknowledged so the provider stops
    /// retrying.
    #[instrument(skip(self))]
    pub async fn apply_payment(
        &self,
        provider_order_reference: &str,
    ) -> Result<PaymentApplication, ServiceError> {
        let order = match order::Entity::find()
            .filter(order::Column::Number.eq(provider_order_reference))
            .one(&*self.db)
            .await?
        {
            Some(order) => order,
            None => {
                warn!(
                    reference = provider_order_reference,
                    "settlement callback for unknown order; acknowledging as no-op"
                );
                return Ok(PaymentApplication::UnknownOrder);
            }
        };

        if order.pay_status == PayStatus::Paid {
            info!(order_id = order.id, "duplicate settlement callback ignored");
            return Ok(PaymentApplication::AlreadyApplied);
        }
        if order.status != OrderStatus::PendingPayment {
            warn!(
                order_id = order.id,
                status = %order.status,
                "settlement callback for an order no longer awaiting payment"
            );
            return Ok(PaymentApplication::NotPayable);
        }

        // Guarded by the prior status so a racing duplicate callback (or a
        // concurrent cancellation) matches zero rows instead of re-applying.
        let result = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::ToBeConfirmed))
            .col_expr(order::Column::PayStatus, Expr::value(PayStatus::Paid))
            .col_expr(order::Column::CheckoutTime, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(OrderStatus::PendingPayment))
            .filter(order::Column::PayStatus.eq(PayStatus::Unpaid))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            info!(order_id = order.id, "order advanced concurrently; settlement not re-applied");
            return Ok(PaymentApplication::AlreadyApplied);
        }

        info!(order_id = order.id, "payment applied");
        self.event_sender
            .emit(Event::OrderPaid { order_id: order.id })
            .await;
        Ok(PaymentApplication::Applied)
    }

    /// Merchant accepts a paid order.
    pub async fn confirm(&self, order_id: i64) -> Result<(), ServiceError> {
        self.transition(order_id, OrderStatus::ToBeConfirmed, OrderStatus::Confirmed, |update| update)
            .await?;
        self.event_sender.emit(Event::OrderConfirmed { order_id }).await;
        Ok(())
    }

    /// Merchant hands the order to a rider.
    pub async fn deliver(&self, order_id: i64) -> Result<(), ServiceError> {
        self.transition(
            order_id,
            OrderStatus::Confirmed,
            OrderStatus::DeliveryInProgress,
            |update| update,
        )
        .await?;
        self.event_sender.emit(Event::OrderDelivered { order_id }).await;
        Ok(())
    }

    /// Rider (or customer) confirms receipt.
    pub async fn complete(&self, order_id: i64) -> Result<(), ServiceError> {
        self.transition(
            order_id,
            OrderStatus::DeliveryInProgress,
            OrderStatus::Completed,
            |update| update.col_expr(order::Column::DeliveryTime, Expr::value(Utc::now())),
        )
        .await?;
        self.event_sender.emit(Event::OrderCompleted { order_id }).await;
        Ok(())
    }

    /// Customer cancels an order that has not been paid yet.
    pub async fn cancel(&self, order_id: i64, reason: &str) -> Result<(), ServiceError> {
        let now = Utc::now();
        self.transition(
            order_id,
            OrderStatus::PendingPayment,
            OrderStatus::Cancelled,
            |update| {
                update
                    .col_expr(order::Column::CancelReason, Expr::value(reason))
                    .col_expr(order::Column::CancelTime, Expr::value(now))
            },
        )
        .await?;
        self.event_sender
            .emit(Event::OrderCancelled {
                order_id,
                reason: reason.to_string(),
            })
            .await;
        Ok(())
    }

    /// Single-row, status-guarded transition. The guard on the expected
    /// prior status means a concurrent transition makes this a zero-row
    /// update rather than a downgrade.
    async fn transition<F>(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
        decorate: F,
    ) -> Result<(), ServiceError>
    where
        F: FnOnce(sea_orm::UpdateMany<order::Entity>) -> sea_orm::UpdateMany<order::Entity>,
    {
        let update = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(to))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(from));
        let result = decorate(update).exec(&*self.db).await?;

        if result.rows_affected == 0 {
            let current = order::Entity::find_by_id(order_id).one(&*self.db).await?;
            return Err(match current {
                None => ServiceError::NotFound(format!("Order {} not found", order_id)),
                Some(order) => ServiceError::Conflict(format!(
                    "Order {} cannot move from {} to {}",
                    order_id, order.status, to
                )),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn order_numbers_are_unique_within_a_millisecond() {
        let now = Utc::now();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(next_order_number(now)), "collision at same instant");
        }
    }

    #[test]
    fn order_numbers_are_digits_only() {
        let number = next_order_number(Utc::now());
        assert!(number.chars().all(|c| c.is_ascii_digit()));
        assert!(number.len() >= 13 + 3 + 6);
    }
}

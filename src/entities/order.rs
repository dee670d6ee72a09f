use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A customer order.
///
/// Address, consignee, phone and customer name are copied from the address
/// book and user profile at submission time. An order is a point-in-time
/// snapshot, never a live reference into the catalog or address book.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Display-facing business number, distinct from the row identity.
    #[sea_orm(unique)]
    pub number: String,

    pub status: OrderStatus,
    pub pay_status: PayStatus,
    pub user_id: i64,
    pub address_book_id: i64,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    pub order_time: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub checkout_time: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub cancel_reason: Option<String>,
    #[sea_orm(nullable)]
    pub cancel_time: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub delivery_time: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub remark: Option<String>,

    // Snapshot fields, copied at submission.
    pub consignee: String,
    pub phone: String,
    pub address: String,
    pub user_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_detail::Entity")]
    OrderDetail,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetail.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order state machine.
///
/// `PendingPayment → ToBeConfirmed → Confirmed → DeliveryInProgress →
/// Completed`, with `Cancelled` reachable from any non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending_payment")]
    PendingPayment,
    #[sea_orm(string_value = "to_be_confirmed")]
    ToBeConfirmed,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "delivery_in_progress")]
    DeliveryInProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Forward transitions of the state machine. Terminal states admit none.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (PendingPayment, ToBeConfirmed)
            | (ToBeConfirmed, Confirmed)
            | (Confirmed, DeliveryInProgress)
            | (DeliveryInProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(12))")]
#[strum(serialize_all = "snake_case")]
pub enum PayStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

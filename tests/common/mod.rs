#![allow(dead_code)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

use takeout_api::db::DbPool;
use takeout_api::entities::{address_book, order, order_detail, user, OrderStatus, PayStatus};
use takeout_api::events::{self, EventSender};
use takeout_api::migrator::Migrator;

/// Test harness: fresh in-memory SQLite with the embedded migrations
/// applied and a live event processor draining the channel.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub event_sender: EventSender,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single pooled connection keeps every query on the same
        // in-memory database.
        let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options)
            .await
            .expect("Failed to open in-memory SQLite");
        Migrator::up(&db, None)
            .await
            .expect("Failed to apply migrations");

        let (event_sender, rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(rx));

        Self {
            db: Arc::new(db),
            event_sender,
            _event_task: event_task,
        }
    }

    pub async fn seed_user(&self, openid: &str, name: &str) -> user::Model {
        self.seed_user_created_at(openid, name, Utc::now()).await
    }

    pub async fn seed_user_created_at(
        &self,
        openid: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> user::Model {
        user::ActiveModel {
            id: NotSet,
            openid: Set(openid.to_string()),
            name: Set(name.to_string()),
            phone: Set(None),
            created_at: Set(created_at),
        }
        .insert(&*self.db)
        .await
        .expect("Failed to insert user")
    }

    pub async fn seed_address(&self, user_id: i64) -> address_book::Model {
        address_book::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            consignee: Set("Alex Chen".to_string()),
            phone: Set("13800000000".to_string()),
            detail: Set("1 Example Road, Unit 4".to_string()),
            label: Set(Some("home".to_string())),
            is_default: Set(true),
        }
        .insert(&*self.db)
        .await
        .expect("Failed to insert address")
    }

    /// Inserts a bare order row, bypassing submission. Used by sweeper and
    /// stats tests that need orders at specific times and states.
    pub async fn seed_order(
        &self,
        user_id: i64,
        number: &str,
        status: OrderStatus,
        pay_status: PayStatus,
        amount: Decimal,
        order_time: DateTime<Utc>,
    ) -> order::Model {
        order::ActiveModel {
            id: NotSet,
            number: Set(number.to_string()),
            status: Set(status),
            pay_status: Set(pay_status),
            user_id: Set(user_id),
            address_book_id: Set(1),
            amount: Set(amount),
            order_time: Set(order_time),
            checkout_time: Set(None),
            cancel_reason: Set(None),
            cancel_time: Set(None),
            delivery_time: Set(None),
            remark: Set(None),
            consignee: Set("Alex Chen".to_string()),
            phone: Set("13800000000".to_string()),
            address: Set("1 Example Road, Unit 4".to_string()),
            user_name: Set("Alex".to_string()),
        }
        .insert(&*self.db)
        .await
        .expect("Failed to insert order")
    }

    pub async fn seed_order_line(
        &self,
        order_id: i64,
        name: &str,
        number: i32,
        amount: Decimal,
    ) -> order_detail::Model {
        order_detail::ActiveModel {
            id: NotSet,
            order_id: Set(order_id),
            name: Set(name.to_string()),
            image: Set(None),
            dish_id: Set(Some(1)),
            setmeal_id: Set(None),
            dish_flavor: Set(None),
            number: Set(number),
            amount: Set(amount),
        }
        .insert(&*self.db)
        .await
        .expect("Failed to insert order line")
    }
}

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use std::sync::Arc;
use std::time::Duration;

use takeout_api::entities::{order, OrderStatus, PayStatus};
use takeout_api::tasks::{OrderSweeper, SweeperSettings};

fn settings() -> SweeperSettings {
    SweeperSettings {
        unpaid_check_interval: Duration::from_secs(60),
        unpaid_grace: ChronoDuration::minutes(15),
        undelivered_check_interval: Duration::from_secs(86_400),
        undelivered_grace: ChronoDuration::hours(2),
    }
}

fn sweeper(app: &TestApp) -> OrderSweeper {
    OrderSweeper::new(app.db.clone(), app.event_sender.clone(), settings())
}

#[tokio::test]
async fn unpaid_pass_cancels_only_orders_past_the_grace_period() {
    let app = TestApp::new().await;
    let user = app.seed_user("wx-sweep-1", "Alex").await;
    let now = Utc::now();

    let overdue = app
        .seed_order(
            user.id,
            "3001",
            OrderStatus::PendingPayment,
            PayStatus::Unpaid,
            dec!(20.00),
            now - ChronoDuration::minutes(20),
        )
        .await;
    let fresh = app
        .seed_order(
            user.id,
            "3002",
            OrderStatus::PendingPayment,
            PayStatus::Unpaid,
            dec!(15.00),
            now - ChronoDuration::minutes(5),
        )
        .await;
    // Old but already paid; selection by exact prior status must skip it.
    let paid = app
        .seed_order(
            user.id,
            "3003",
            OrderStatus::ToBeConfirmed,
            PayStatus::Paid,
            dec!(18.00),
            now - ChronoDuration::minutes(30),
        )
        .await;

    let swept = sweeper(&app).sweep_unpaid_once(now).await.unwrap();
    assert_eq!(swept, 1);

    let cancelled = order::Entity::find_by_id(overdue.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(
        cancelled.cancel_reason.as_deref(),
        Some("timed out, auto-cancelled")
    );
    assert!(cancelled.cancel_time.is_some());
    assert_eq!(cancelled.pay_status, PayStatus::Unpaid);

    let untouched = order::Entity::find_by_id(fresh.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, OrderStatus::PendingPayment);
    assert!(untouched.cancel_time.is_none());

    let kept = order::Entity::find_by_id(paid.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.status, OrderStatus::ToBeConfirmed);
}

#[tokio::test]
async fn unpaid_pass_is_idempotent_across_runs() {
    let app = TestApp::new().await;
    let user = app.seed_user("wx-sweep-2", "Sam").await;
    let now = Utc::now();

    app.seed_order(
        user.id,
        "3101",
        OrderStatus::PendingPayment,
        PayStatus::Unpaid,
        dec!(12.00),
        now - ChronoDuration::minutes(40),
    )
    .await;

    let sweeper = sweeper(&app);
    assert_eq!(sweeper.sweep_unpaid_once(now).await.unwrap(), 1);
    assert_eq!(
        sweeper.sweep_unpaid_once(now).await.unwrap(),
        0,
        "a cancelled order leaves the selection"
    );
}

#[tokio::test]
async fn undelivered_pass_completes_overdue_deliveries() {
    let app = TestApp::new().await;
    let user = app.seed_user("wx-sweep-3", "Kim").await;
    let now = Utc::now();

    let overdue = app
        .seed_order(
            user.id,
            "3201",
            OrderStatus::DeliveryInProgress,
            PayStatus::Paid,
            dec!(25.00),
            now - ChronoDuration::hours(3),
        )
        .await;
    let recent = app
        .seed_order(
            user.id,
            "3202",
            OrderStatus::DeliveryInProgress,
            PayStatus::Paid,
            dec!(22.00),
            now - ChronoDuration::hours(1),
        )
        .await;

    let swept = sweeper(&app).sweep_undelivered_once(now).await.unwrap();
    assert_eq!(swept, 1);

    let completed = order::Entity::find_by_id(overdue.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert!(completed.delivery_time.is_some());
    assert_eq!(completed.pay_status, PayStatus::Paid);

    let in_flight = order::Entity::find_by_id(recent.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(in_flight.status, OrderStatus::DeliveryInProgress);
    assert!(in_flight.delivery_time.is_none());
}

#[tokio::test]
async fn spawned_loops_keep_running() {
    let app = TestApp::new().await;
    let sweeper = Arc::new(OrderSweeper::new(
        app.db.clone(),
        app.event_sender.clone(),
        SweeperSettings {
            unpaid_check_interval: Duration::from_millis(20),
            unpaid_grace: ChronoDuration::minutes(15),
            undelivered_check_interval: Duration::from_millis(20),
            undelivered_grace: ChronoDuration::hours(2),
        },
    ));

    let handles = sweeper.spawn();
    tokio::time::sleep(Duration::from_millis(80)).await;
    for handle in &handles {
        assert!(!handle.is_finished(), "sweeper loops must not exit");
    }
    for handle in handles {
        handle.abort();
    }
}

//! Backend core for an online food-ordering platform.
//!
//! Three pieces carry the weight here: the order lifecycle
//! ([`services::orders::OrderService`]), the timeout sweeper that forces
//! deadline-based transitions ([`tasks::order_sweeper::OrderSweeper`]), and
//! the cache-aside reporting engine
//! ([`services::reports::ReportService`]). HTTP routing, authentication and
//! the payment gateway itself live outside this crate and plug in through
//! the seams in [`services::payments`] and [`cache`].

use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;
pub mod tasks;

pub use errors::ServiceError;

/// Shared state wired once at startup and handed to whatever serving layer
/// embeds this crate.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub redis: Arc<redis::Client>,
}

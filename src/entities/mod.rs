pub mod address_book;
pub mod audit;
pub mod dish;
pub mod order;
pub mod order_detail;
pub mod setmeal;
pub mod shopping_cart;
pub mod user;

pub use audit::{AuditStamp, Audited};
pub use order::{OrderStatus, PayStatus};

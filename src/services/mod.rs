pub mod cart;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod stats;

pub use cart::{CartItemRef, ShoppingCartService};
pub use catalog::CatalogService;
pub use orders::{OrderService, PaymentApplication};
pub use payments::{PaymentHandle, PaymentIntent, PaymentProvider};
pub use reports::{ReportRange, ReportService, SnapshotRenderer};
pub use stats::{SeaOrmStatsStore, StatsStore};

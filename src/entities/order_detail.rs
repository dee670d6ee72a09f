use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One line of an order: a snapshot of a cart line at submission time.
///
/// Name, unit price and flavor are copied so historical orders stay accurate
/// after catalog changes. Lines are created atomically with their order and
/// only ever removed by cascading order deletion.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    /// Exactly one of `dish_id` / `setmeal_id` is set.
    #[sea_orm(nullable)]
    pub dish_id: Option<i64>,
    #[sea_orm(nullable)]
    pub setmeal_id: Option<i64>,
    #[sea_orm(nullable)]
    pub dish_flavor: Option<String>,
    pub number: i32,
    /// Unit price snapshot.
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

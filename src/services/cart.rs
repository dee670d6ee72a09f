use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use std::sync::Arc;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::{dish, setmeal, shopping_cart};
use crate::errors::ServiceError;

/// A cart line refers to exactly one catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartItemRef {
    Dish(i64),
    Setmeal(i64),
}

/// Shopping cart operations. Lines are keyed by
/// (user, dish|setmeal, flavor); adding an existing key bumps the quantity.
#[derive(Clone)]
pub struct ShoppingCartService {
    db: Arc<DbPool>,
}

impl ShoppingCartService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Adds one unit of the item, snapshotting name/price/image from the
    /// catalog when the line is first created.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: i64,
        item: CartItemRef,
        flavor: Option<String>,
    ) -> Result<shopping_cart::Model, ServiceError> {
        if let Some(line) = self.find_line(user_id, item, flavor.as_deref()).await? {
            let number = line.number + 1;
            let mut active = line.into_active_model();
            active.number = Set(number);
            return Ok(active.update(&*self.db).await?);
        }

        let (name, amount, image) = match item {
            CartItemRef::Dish(id) => {
                let dish = dish::Entity::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Dish {} not found", id)))?;
                (dish.name, dish.price, dish.image)
            }
            CartItemRef::Setmeal(id) => {
                let setmeal = setmeal::Entity::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Setmeal {} not found", id)))?;
                (setmeal.name, setmeal.price, setmeal.image)
            }
        };

        let (dish_id, setmeal_id) = match item {
            CartItemRef::Dish(id) => (Some(id), None),
            CartItemRef::Setmeal(id) => (None, Some(id)),
        };

        let line = shopping_cart::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            name: Set(name),
            image: Set(image),
            dish_id: Set(dish_id),
            setmeal_id: Set(setmeal_id),
            dish_flavor: Set(flavor),
            number: Set(1),
            amount: Set(amount),
            created_at: Set(Utc::now()),
        };
        Ok(line.insert(&*self.db).await?)
    }

    /// Removes one unit; the line disappears when its quantity reaches
    /// zero. Returns the surviving line, if any.
    #[instrument(skip(self))]
    pub async fn sub(
        &self,
        user_id: i64,
        item: CartItemRef,
        flavor: Option<String>,
    ) -> Result<Option<shopping_cart::Model>, ServiceError> {
        let line = self
            .find_line(user_id, item, flavor.as_deref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart line not found".to_string()))?;

        if line.number <= 1 {
            shopping_cart::Entity::delete_by_id(line.id)
                .exec(&*self.db)
                .await?;
            return Ok(None);
        }

        let number = line.number - 1;
        let mut active = line.into_active_model();
        active.number = Set(number);
        Ok(Some(active.update(&*self.db).await?))
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<shopping_cart::Model>, ServiceError> {
        Ok(shopping_cart::Entity::find()
            .filter(shopping_cart::Column::UserId.eq(user_id))
            .all(&*self.db)
            .await?)
    }

    pub async fn clean(&self, user_id: i64) -> Result<(), ServiceError> {
        shopping_cart::Entity::delete_many()
            .filter(shopping_cart::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    async fn find_line(
        &self,
        user_id: i64,
        item: CartItemRef,
        flavor: Option<&str>,
    ) -> Result<Option<shopping_cart::Model>, ServiceError> {
        let mut query = shopping_cart::Entity::find()
            .filter(shopping_cart::Column::UserId.eq(user_id));
        query = match item {
            CartItemRef::Dish(id) => query.filter(shopping_cart::Column::DishId.eq(id)),
            CartItemRef::Setmeal(id) => query.filter(shopping_cart::Column::SetmealId.eq(id)),
        };
        query = match flavor {
            Some(flavor) => query.filter(shopping_cart::Column::DishFlavor.eq(flavor)),
            None => query.filter(shopping_cart::Column::DishFlavor.is_null()),
        };
        Ok(query.one(&*self.db).await?)
    }
}

use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{dish, setmeal, AuditStamp, Audited};
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be between 1 and 64 characters"))]
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl CreateItemRequest {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if self.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Catalog maintenance used by the merchant console. Carts and orders only
/// ever snapshot out of these rows, so edits here never rewrite history.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_dish(
        &self,
        actor: i64,
        request: CreateItemRequest,
    ) -> Result<dish::Model, ServiceError> {
        request.check()?;
        let mut active = dish::ActiveModel {
            id: NotSet,
            name: Set(request.name),
            price: Set(request.price),
            image: Set(request.image),
            description: Set(request.description),
            on_sale: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
            created_by: NotSet,
            updated_by: NotSet,
        };
        active.apply_created(&AuditStamp::now(actor));
        Ok(active.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn update_dish_price(
        &self,
        actor: i64,
        dish_id: i64,
        price: Decimal,
    ) -> Result<dish::Model, ServiceError> {
        if price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must be positive".to_string(),
            ));
        }
        let dish = dish::Entity::find_by_id(dish_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Dish {} not found", dish_id)))?;
        let mut active = dish.into_active_model();
        active.price = Set(price);
        active.apply_updated(&AuditStamp::now(actor));
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_setmeal(
        &self,
        actor: i64,
        request: CreateItemRequest,
    ) -> Result<setmeal::Model, ServiceError> {
        request.check()?;
        let mut active = setmeal::ActiveModel {
            id: NotSet,
            name: Set(request.name),
            price: Set(request.price),
            image: Set(request.image),
            description: Set(request.description),
            on_sale: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
            created_by: NotSet,
            updated_by: NotSet,
        };
        active.apply_created(&AuditStamp::now(actor));
        Ok(active.insert(&*self.db).await?)
    }
}

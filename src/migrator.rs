use sea_orm_migration::prelude::*;

/// Embedded schema migrations, applied by `db::run_migrations` at startup
/// (and by the test harness against in-memory SQLite).
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_address_books_table::Migration),
            Box::new(m20240101_000003_create_catalog_tables::Migration),
            Box::new(m20240101_000004_create_shopping_carts_table::Migration),
            Box::new(m20240101_000005_create_orders_table::Migration),
            Box::new(m20240101_000006_create_order_details_table::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Openid).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Phone).string())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_users_created_at")
                        .table(Users::Table)
                        .col(Users::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Openid,
        Name,
        Phone,
        CreatedAt,
    }
}

mod m20240101_000002_create_address_books_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_address_books_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AddressBooks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AddressBooks::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AddressBooks::UserId).big_integer().not_null())
                        .col(ColumnDef::new(AddressBooks::Consignee).string().not_null())
                        .col(ColumnDef::new(AddressBooks::Phone).string().not_null())
                        .col(ColumnDef::new(AddressBooks::Detail).string().not_null())
                        .col(ColumnDef::new(AddressBooks::Label).string())
                        .col(
                            ColumnDef::new(AddressBooks::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_address_books_user_id")
                        .table(AddressBooks::Table)
                        .col(AddressBooks::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AddressBooks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AddressBooks {
        Table,
        Id,
        UserId,
        Consignee,
        Phone,
        Detail,
        Label,
        IsDefault,
    }
}

mod m20240101_000003_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [Catalog::Dishes, Catalog::Setmeals] {
                manager
                    .create_table(
                        Table::create()
                            .table(table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(Catalog::Id)
                                    .big_integer()
                                    .not_null()
                                    .auto_increment()
                                    .primary_key(),
                            )
                            .col(ColumnDef::new(Catalog::Name).string().not_null())
                            .col(ColumnDef::new(Catalog::Price).decimal_len(10, 2).not_null())
                            .col(ColumnDef::new(Catalog::Image).string())
                            .col(ColumnDef::new(Catalog::Description).string())
                            .col(
                                ColumnDef::new(Catalog::OnSale)
                                    .boolean()
                                    .not_null()
                                    .default(true),
                            )
                            .col(
                                ColumnDef::new(Catalog::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .col(ColumnDef::new(Catalog::UpdatedAt).timestamp_with_time_zone())
                            .col(ColumnDef::new(Catalog::CreatedBy).big_integer())
                            .col(ColumnDef::new(Catalog::UpdatedBy).big_integer())
                            .to_owned(),
                    )
                    .await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Catalog::Dishes).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Catalog::Setmeals).to_owned())
                .await
        }
    }

    // Dishes and setmeals share a column layout.
    #[derive(DeriveIden, Clone, Copy)]
    enum Catalog {
        Dishes,
        Setmeals,
        Id,
        Name,
        Price,
        Image,
        Description,
        OnSale,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        UpdatedBy,
    }
}

mod m20240101_000004_create_shopping_carts_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_shopping_carts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShoppingCarts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShoppingCarts::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ShoppingCarts::UserId).big_integer().not_null())
                        .col(ColumnDef::new(ShoppingCarts::Name).string().not_null())
                        .col(ColumnDef::new(ShoppingCarts::Image).string())
                        .col(ColumnDef::new(ShoppingCarts::DishId).big_integer())
                        .col(ColumnDef::new(ShoppingCarts::SetmealId).big_integer())
                        .col(ColumnDef::new(ShoppingCarts::DishFlavor).string())
                        .col(ColumnDef::new(ShoppingCarts::Number).integer().not_null())
                        .col(
                            ColumnDef::new(ShoppingCarts::Amount)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCarts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_shopping_carts_user_id")
                        .table(ShoppingCarts::Table)
                        .col(ShoppingCarts::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShoppingCarts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ShoppingCarts {
        Table,
        Id,
        UserId,
        Name,
        Image,
        DishId,
        SetmealId,
        DishFlavor,
        Number,
        Amount,
        CreatedAt,
    }
}

mod m20240101_000005_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::Number).string().not_null().unique_key())
                        .col(ColumnDef::new(Orders::Status).string_len(24).not_null())
                        .col(ColumnDef::new(Orders::PayStatus).string_len(12).not_null())
                        .col(ColumnDef::new(Orders::UserId).big_integer().not_null())
                        .col(ColumnDef::new(Orders::AddressBookId).big_integer().not_null())
                        .col(ColumnDef::new(Orders::Amount).decimal_len(10, 2).not_null())
                        .col(
                            ColumnDef::new(Orders::OrderTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::CheckoutTime).timestamp_with_time_zone())
                        .col(ColumnDef::new(Orders::CancelReason).string())
                        .col(ColumnDef::new(Orders::CancelTime).timestamp_with_time_zone())
                        .col(ColumnDef::new(Orders::DeliveryTime).timestamp_with_time_zone())
                        .col(ColumnDef::new(Orders::Remark).string())
                        .col(ColumnDef::new(Orders::Consignee).string().not_null())
                        .col(ColumnDef::new(Orders::Phone).string().not_null())
                        .col(ColumnDef::new(Orders::Address).string().not_null())
                        .col(ColumnDef::new(Orders::UserName).string().not_null())
                        .to_owned(),
                )
                .await?;

            // The sweeper selects on (status, order_time).
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_status_order_time")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .col(Orders::OrderTime)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        Number,
        Status,
        PayStatus,
        UserId,
        AddressBookId,
        Amount,
        OrderTime,
        CheckoutTime,
        CancelReason,
        CancelTime,
        DeliveryTime,
        Remark,
        Consignee,
        Phone,
        Address,
        UserName,
    }
}

mod m20240101_000006_create_order_details_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_order_details_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderDetails::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderDetails::OrderId).big_integer().not_null())
                        .col(ColumnDef::new(OrderDetails::Name).string().not_null())
                        .col(ColumnDef::new(OrderDetails::Image).string())
                        .col(ColumnDef::new(OrderDetails::DishId).big_integer())
                        .col(ColumnDef::new(OrderDetails::SetmealId).big_integer())
                        .col(ColumnDef::new(OrderDetails::DishFlavor).string())
                        .col(ColumnDef::new(OrderDetails::Number).integer().not_null())
                        .col(
                            ColumnDef::new(OrderDetails::Amount)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_details_order_id")
                        .table(OrderDetails::Table)
                        .col(OrderDetails::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderDetails::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderDetails {
        Table,
        Id,
        OrderId,
        Name,
        Image,
        DishId,
        SetmealId,
        DishFlavor,
        Number,
        Amount,
    }
}

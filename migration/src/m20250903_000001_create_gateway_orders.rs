use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum GatewayOrders {
    Table,
    Id,
    OrderId,
    ProviderOrderId,
    ProviderPaymentId,
    UserId,
    Amount,
    Currency,
    Status,
    SessionToken,
    PaymentMethod,
    SettledVia,
    EntryId,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GatewayOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GatewayOrders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::OrderId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::ProviderOrderId)
                            .string_len(255)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::ProviderPaymentId)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::Currency)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::SessionToken)
                            .string_len(512)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::PaymentMethod)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::SettledVia)
                            .string_len(24)
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayOrders::EntryId).big_integer().null())
                    .col(ColumnDef::new(GatewayOrders::Metadata).json().null())
                    .col(
                        ColumnDef::new(GatewayOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GatewayOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_gateway_orders_user", GatewayOrders::UserId),
            ("idx_gateway_orders_status", GatewayOrders::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(GatewayOrders::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(GatewayOrders::Table)
                    .to_owned(),
            )
            .await
    }
}

use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Penalties {
    Table,
    Id,
    UserId,
    Amount,
    Reason,
    PenaltyType,
    AppliedBy,
    EntryId,
    EmailSent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Recharges {
    Table,
    Id,
    RechargeId,
    UserId,
    Operator,
    Mobile,
    Amount,
    Commission,
    Status,
    ProviderRef,
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
                    .table(Penalties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Penalties::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Penalties::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Penalties::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Penalties::Reason).string().not_null())
                    .col(
                        ColumnDef::new(Penalties::PenaltyType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Penalties::AppliedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Penalties::EntryId).big_integer().null())
                    .col(
                        ColumnDef::new(Penalties::EmailSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Penalties::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Recharges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Recharges::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Recharges::RechargeId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Recharges::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Recharges::Operator).string_len(50).not_null())
                    .col(ColumnDef::new(Recharges::Mobile).string_len(20).not_null())
                    .col(ColumnDef::new(Recharges::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Recharges::Commission)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Recharges::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Recharges::ProviderRef)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Recharges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Recharges::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_penalties_user")
                    .table(Penalties::Table)
                    .col(Penalties::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_recharges_user")
                    .table(Recharges::Table)
                    .col(Recharges::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Recharges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Penalties::Table).to_owned())
            .await
    }
}

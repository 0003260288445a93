use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    Balance,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TransactionEntries {
    Table,
    Id,
    UserId,
    WalletId,
    EntryType,
    Amount,
    BalanceAfter,
    Status,
    Reference,
    CashbackState,
    Description,
    Metadata,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::UserId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Wallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Wallets::Balance).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::WalletId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::EntryType)
                            .string_len(24)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::BalanceAfter)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::Reference)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::CashbackState)
                            .string_len(16)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::Description)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(TransactionEntries::Metadata).json().null())
                    .col(
                        ColumnDef::new(TransactionEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_entries_wallet")
                            .from(TransactionEntries::Table, TransactionEntries::WalletId)
                            .to(Wallets::Table, Wallets::Id),
                    )
                    .check(Expr::col(TransactionEntries::Amount).gt(0))
                    .to_owned(),
            )
            .await?;

        // idempotency guard: one entry per (type, external reference)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_entries_type_reference")
                    .table(TransactionEntries::Table)
                    .col(TransactionEntries::EntryType)
                    .col(TransactionEntries::Reference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_entries_user", TransactionEntries::UserId),
            ("idx_entries_wallet", TransactionEntries::WalletId),
            ("idx_entries_created_at", TransactionEntries::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(TransactionEntries::Table)
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
                    .table(TransactionEntries::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Wallets::Table).to_owned())
            .await?;
        Ok(())
    }
}

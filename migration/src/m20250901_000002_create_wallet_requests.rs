use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum WalletRequests {
    Table,
    Id,
    UserId,
    RequestType,
    Amount,
    Status,
    PaymentMethod,
    TransactionReference,
    EvidenceUrl,
    Remarks,
    ApproverId,
    EntryId,
    Metadata,
    CreatedAt,
    DecidedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WalletRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::RequestType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::PaymentMethod)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::TransactionReference)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(WalletRequests::EvidenceUrl).string().null())
                    .col(ColumnDef::new(WalletRequests::Remarks).string().null())
                    .col(
                        ColumnDef::new(WalletRequests::ApproverId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(WalletRequests::EntryId).big_integer().null())
                    .col(ColumnDef::new(WalletRequests::Metadata).json().null())
                    .col(
                        ColumnDef::new(WalletRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WalletRequests::DecidedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_wallet_requests_user", WalletRequests::UserId),
            ("idx_wallet_requests_status", WalletRequests::Status),
            (
                "idx_wallet_requests_txn_ref",
                WalletRequests::TransactionReference,
            ),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(WalletRequests::Table)
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
                    .table(WalletRequests::Table)
                    .to_owned(),
            )
            .await
    }
}

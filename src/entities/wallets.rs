use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 用户钱包：每个用户一行，余额以 paise 计，永不为负
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    pub balance: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_entries::Entity")]
    TransactionEntries,
}

impl Related<super::transaction_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

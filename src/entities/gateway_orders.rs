use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayOrderStatus {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

impl GatewayOrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GatewayOrderStatus::Created)
    }
}

/// 哪一条路径让订单进入了终态
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettledVia {
    #[sea_orm(string_value = "RETURN_PATH")]
    ReturnPath,
    #[sea_orm(string_value = "WEBHOOK")]
    Webhook,
    #[sea_orm(string_value = "STATUS_POLL")]
    StatusPoll,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "EXPIRY_SWEEP")]
    ExpirySweep,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "gateway_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub order_id: String,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub status: GatewayOrderStatus,
    pub session_token: Option<String>,
    pub payment_method: Option<String>,
    pub settled_via: Option<SettledVia>,
    pub entry_id: Option<i64>,
    pub metadata: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

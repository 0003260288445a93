use crate::entities::{
    CashbackState, EntryStatus, EntryType, transaction_entry_entity as entries,
    wallet_entity as wallets,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    EntryMetadata, PaginatedResponse, PaginationParams, Reconciliation, TransactionEntryResponse,
    TransactionQuery,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// 待写入的账本条目
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: i64,
    pub wallet_id: i64,
    pub entry_type: EntryType,
    pub amount: i64,
    pub balance_after: Option<i64>,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub cashback_state: Option<CashbackState>,
    pub description: Option<String>,
    pub metadata: Option<EntryMetadata>,
}

/// 账本存储：钱包余额与只追加的交易条目
///
/// 关联函数（`ensure_wallet` / `adjust_balance` / `append_entry`）接受任意连接，
/// 调用方负责把它们放进同一个数据库事务里。
#[derive(Clone)]
pub struct LedgerService {
    pool: DatabaseConnection,
}

impl LedgerService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 获取钱包，不存在则创建（并发创建安全）
    pub async fn ensure_wallet<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<wallets::Model> {
        if let Some(w) = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db)
            .await?
        {
            return Ok(w);
        }

        let now = Utc::now();
        let insert = wallets::Entity::insert(wallets::ActiveModel {
            user_id: Set(user_id),
            balance: Set(0),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(wallets::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;
        match insert {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("Wallet for user {user_id} not created")))
    }

    /// 原子调整余额
    ///
    /// 出账时余额校验与扣减在同一条 UPDATE 中完成（`WHERE balance >= x`），
    /// 行锁保证同一钱包的并发修改被串行化。
    pub async fn adjust_balance<C: ConnectionTrait>(
        db: &C,
        wallet_id: i64,
        delta: i64,
    ) -> AppResult<wallets::Model> {
        let mut update = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(delta),
            )
            .col_expr(
                wallets::Column::Version,
                Expr::col(wallets::Column::Version).add(1),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallets::Column::Id.eq(wallet_id));
        if delta < 0 {
            update = update.filter(wallets::Column::Balance.gte(-delta));
        }

        let result = update.exec(db).await?;
        if result.rows_affected == 0 {
            return Err(if delta < 0 {
                AppError::InsufficientBalance
            } else {
                AppError::NotFound(format!("Wallet {wallet_id} not found"))
            });
        }

        wallets::Entity::find_by_id(wallet_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet {wallet_id} not found")))
    }

    /// 追加一条账本条目；(类型, 引用) 重复时返回 `DuplicateReference`
    pub async fn append_entry<C: ConnectionTrait>(
        db: &C,
        entry: NewEntry,
    ) -> AppResult<entries::Model> {
        if entry.amount <= 0 {
            return Err(AppError::ValidationError(
                "Entry amount must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        let processed_at = entry.status.is_terminal().then_some(now);

        entries::ActiveModel {
            user_id: Set(entry.user_id),
            wallet_id: Set(entry.wallet_id),
            entry_type: Set(entry.entry_type),
            amount: Set(entry.amount),
            balance_after: Set(entry.balance_after),
            status: Set(entry.status),
            reference: Set(entry.reference),
            cashback_state: Set(entry.cashback_state),
            description: Set(entry.description),
            metadata: Set(entry.metadata.as_ref().map(EntryMetadata::to_json)),
            created_at: Set(now),
            processed_at: Set(processed_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::DuplicateReference
            } else {
                e.into()
            }
        })
    }

    pub async fn find_by_reference<C: ConnectionTrait>(
        db: &C,
        entry_type: EntryType,
        reference: &str,
    ) -> AppResult<Option<entries::Model>> {
        Ok(entries::Entity::find()
            .filter(entries::Column::EntryType.eq(entry_type))
            .filter(entries::Column::Reference.eq(reference))
            .one(db)
            .await?)
    }

    pub async fn find_entry(&self, entry_id: i64) -> AppResult<Option<entries::Model>> {
        Ok(entries::Entity::find_by_id(entry_id).one(&self.pool).await?)
    }

    pub async fn get_wallet(&self, user_id: i64) -> AppResult<Option<wallets::Model>> {
        Ok(wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?)
    }

    /// 当前存储的余额；尚无钱包视为 0
    pub async fn get_balance(&self, user_id: i64) -> AppResult<i64> {
        Ok(self.get_wallet(user_id).await?.map(|w| w.balance).unwrap_or(0))
    }

    /// 对账：已完成条目的有符号合计 vs 存储余额。仅供审计与测试使用
    pub async fn reconcile(&self, user_id: i64) -> AppResult<Reconciliation> {
        let stored = self.get_balance(user_id).await?;

        let rows: Vec<(EntryType, i64)> = entries::Entity::find()
            .select_only()
            .column(entries::Column::EntryType)
            .column(entries::Column::Amount)
            .filter(entries::Column::UserId.eq(user_id))
            .filter(entries::Column::Status.eq(EntryStatus::Completed))
            .into_tuple()
            .all(&self.pool)
            .await?;
        let computed: i64 = rows.iter().map(|(t, amount)| t.signed(*amount)).sum();

        Ok(Reconciliation::new(user_id, stored, computed))
    }

    /// 遍历全部钱包，返回存在偏差的对账结果
    pub async fn reconcile_all(&self) -> AppResult<Vec<Reconciliation>> {
        let mut drifted = Vec::new();
        let mut pages = wallets::Entity::find()
            .order_by_asc(wallets::Column::Id)
            .paginate(&self.pool, 200);

        while let Some(batch) = pages.fetch_and_next().await? {
            for wallet in batch {
                let rec = self.reconcile(wallet.user_id).await?;
                if !rec.is_consistent() {
                    log::error!(
                        "Ledger drift for user {}: stored={} computed={} drift={}",
                        rec.user_id,
                        rec.stored_balance,
                        rec.computed_balance,
                        rec.drift
                    );
                    drifted.push(rec);
                }
            }
        }
        Ok(drifted)
    }

    /// 交易明细（分页，支持类型、状态、时间范围过滤）
    pub async fn list_entries(
        &self,
        user_id: i64,
        query: &TransactionQuery,
    ) -> AppResult<PaginatedResponse<TransactionEntryResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = entries::Entity::find().filter(entries::Column::UserId.eq(user_id));
        if let Some(t) = query.entry_type {
            base_query = base_query.filter(entries::Column::EntryType.eq(t));
        }
        if let Some(s) = query.status {
            base_query = base_query.filter(entries::Column::Status.eq(s));
        }
        if let Some(from) = query.from {
            base_query = base_query.filter(entries::Column::CreatedAt.gte(from));
        }
        if let Some(to) = query.to {
            base_query = base_query.filter(entries::Column::CreatedAt.lte(to));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items = base_query
            .order_by_desc(entries::Column::CreatedAt)
            .order_by_desc(entries::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(TransactionEntryResponse::from)
            .collect();

        Ok(PaginatedResponse::from_params(items, &params, total))
    }
}

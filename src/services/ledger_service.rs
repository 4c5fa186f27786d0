use crate::entities::card_ledger_entity as ledger;
use crate::error::AppResult;
use crate::models::{LedgerPageResponse, LedgerRecordResponse, PaginatedResponse, PaginationParams};
use crate::utils::resolve_user_key;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

#[derive(Clone)]
pub struct LedgerService {
    pool: DatabaseConnection,
}

impl LedgerService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 获取掉落/合成流水 (分页, 倒序)
    pub async fn list_records(
        &self,
        raw_user: &str,
        params: &PaginationParams,
    ) -> AppResult<LedgerPageResponse> {
        let user_id = resolve_user_key(raw_user);

        let base_query = ledger::Entity::find().filter(ledger::Column::UserId.eq(user_id.as_str()));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items_models = base_query
            .order_by(ledger::Column::CreatedAt, Order::Desc)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<LedgerRecordResponse> =
            items_models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1).max(1),
            params.get_limit(),
            total,
        ))
    }
}

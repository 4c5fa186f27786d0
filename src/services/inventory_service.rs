use crate::entities::{inventory_entries as inventory, AcquiredVia};
use crate::error::{AppError, AppResult};
use crate::models::{
    CardView, ConsumedCard, InventoryEntryResponse, InventoryPageResponse, PaginatedResponse,
    PaginationParams,
};
use crate::services::CatalogService;
use crate::utils::resolve_user_key;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct InventoryService {
    pool: DatabaseConnection,
    catalog: CatalogService,
}

impl InventoryService {
    pub fn new(pool: DatabaseConnection, catalog: CatalogService) -> Self {
        Self { pool, catalog }
    }

    /// 给用户入账一张卡
    /// (user_id, card_id) 已存在时数量 +1 并刷新获得时间, 否则新建 quantity=1
    /// 通过 ON CONFLICT 原子合并, 并发入账不会产生重复行
    pub async fn add_card<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        card_id: &str,
        source: AcquiredVia,
    ) -> AppResult<()> {
        let entry = inventory::ActiveModel {
            user_id: Set(user_id.to_string()),
            card_id: Set(card_id.to_string()),
            quantity: Set(1),
            locked: Set(false),
            acquired_via: Set(source),
            acquired_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        inventory::Entity::insert(entry)
            .on_conflict(
                OnConflict::columns([inventory::Column::UserId, inventory::Column::CardId])
                    .value(
                        inventory::Column::Quantity,
                        Expr::col(inventory::Column::Quantity).add(1),
                    )
                    .value(inventory::Column::AcquiredAt, Expr::cust("NOW()"))
                    .to_owned(),
            )
            .exec(db)
            .await?;

        Ok(())
    }

    /// 按消耗计划扣减库存
    /// 每一项都是守卫式原子扣减 (未锁定且数量足够才会命中);
    /// 任意一项未命中说明库存被并发修改, 返回错误由调用方回滚整个事务。
    /// 数量永不为负, 扣减到 0 的行直接删除。
    pub async fn consume<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        plan: &[ConsumedCard],
    ) -> AppResult<()> {
        for item in plan {
            let updated = inventory::Entity::update_many()
                .col_expr(
                    inventory::Column::Quantity,
                    Expr::col(inventory::Column::Quantity).sub(item.quantity),
                )
                .filter(inventory::Column::UserId.eq(user_id))
                .filter(inventory::Column::CardId.eq(item.card_id.as_str()))
                .filter(inventory::Column::Locked.eq(false))
                .filter(inventory::Column::Quantity.gte(item.quantity))
                .exec(db)
                .await?;

            if updated.rows_affected != 1 {
                return Err(AppError::ValidationError(format!(
                    "Card {} no longer has {} unlocked copies available",
                    item.card_id, item.quantity
                )));
            }
        }

        // 清理扣减到 0 的行
        inventory::Entity::delete_many()
            .filter(inventory::Column::UserId.eq(user_id))
            .filter(inventory::Column::Quantity.lte(0))
            .exec(db)
            .await?;

        Ok(())
    }

    /// 用户当前全部库存行 (合成计划用)
    pub async fn entries_for_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> AppResult<Vec<inventory::Model>> {
        let list = inventory::Entity::find()
            .filter(inventory::Column::UserId.eq(user_id))
            .order_by_asc(inventory::Column::CardId)
            .all(db)
            .await?;
        Ok(list)
    }

    /// 分页查询库存 (与卡片目录连接, 最近获得优先)
    pub async fn list_inventory(
        &self,
        raw_user: &str,
        params: &PaginationParams,
    ) -> AppResult<InventoryPageResponse> {
        let user_id = resolve_user_key(raw_user);
        let base_query = inventory::Entity::find()
            .filter(inventory::Column::UserId.eq(user_id.as_str()))
            .filter(inventory::Column::Quantity.gt(0));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let entries = base_query
            .order_by_desc(inventory::Column::AcquiredAt)
            .order_by_asc(inventory::Column::CardId)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        // 批量取卡片定义, 缺失的目录行按不一致处理
        let ids: Vec<String> = entries.iter().map(|e| e.card_id.clone()).collect();
        let card_map: HashMap<String, _> = self
            .catalog
            .cards_by_ids(&self.pool, &ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let card = card_map
                .get(&entry.card_id)
                .ok_or_else(|| AppError::UnknownCard(entry.card_id.clone()))?;
            items.push(InventoryEntryResponse {
                card: CardView::from_card(card, self.catalog.placeholder_ref()),
                quantity: entry.quantity,
                locked: entry.locked,
                acquired_via: entry.acquired_via,
                acquired_at: entry.acquired_at.unwrap_or_else(Utc::now),
            });
        }

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1).max(1),
            params.get_limit(),
            total,
        ))
    }
}

use crate::entities::{
    card_entity as cards, inventory_entries as inventory, user_stats_entity as stats, CardRarity,
};
use crate::error::{AppError, AppResult};
use crate::models::UserStatsResponse;
use crate::utils::resolve_user_key;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    Set,
};
use std::collections::HashMap;

/// 掉落窗口长度
pub const DROP_WINDOW_HOURS: i64 = 24;

/// 单个窗口内最多掉落次数
pub const MAX_DROPS_PER_WINDOW: i32 = 5;

/// 窗口是否已失效
/// 失效条件: 从未开窗 / 开窗时间在未来 (时钟偏移保护) / 距开窗已满 24 小时
/// 所有读写 drops_used_in_window 的路径都必须经过这一个判定
pub fn window_is_stale(window_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match window_start {
        None => true,
        Some(start) => start > now || now - start >= Duration::hours(DROP_WINDOW_HOURS),
    }
}

/// 按当前窗口计算剩余掉落次数
pub fn remaining_in_window(model: &stats::Model) -> i32 {
    (MAX_DROPS_PER_WINDOW - model.drops_used_in_window).max(0)
}

#[derive(Clone)]
pub struct StatsService {
    pool: DatabaseConnection,
}

impl StatsService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 取用户统计, 不存在则创建
    /// ON CONFLICT DO NOTHING 后回读, 并发的首次访问不会产生重复行
    pub async fn ensure_stats<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> AppResult<stats::Model> {
        let insert = stats::Entity::insert(stats::ActiveModel {
            user_id: Set(user_id.to_string()),
            drops_used_in_window: Set(0),
            total_drops_used: Set(0),
            total_cards_collected: Set(0),
            crafting_attempts: Set(0),
            successful_crafts: Set(0),
            failed_crafts: Set(0),
            basic_cards: Set(0),
            rare_cards: Set(0),
            epic_cards: Set(0),
            legendary_cards: Set(0),
            material_cards: Set(0),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(stats::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;

        match insert {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        stats::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("user_stats missing for {user_id}")))
    }

    /// 窗口失效时重置并回读
    /// 重置是守卫式更新 (以读到的 window_start 为条件), 并发重置只会生效一次
    pub async fn refresh_window<C: ConnectionTrait>(
        &self,
        db: &C,
        model: stats::Model,
        now: DateTime<Utc>,
    ) -> AppResult<stats::Model> {
        if !window_is_stale(model.window_start, now) {
            return Ok(model);
        }

        let seen = match model.window_start {
            Some(start) => stats::Column::WindowStart.eq(start),
            None => stats::Column::WindowStart.is_null(),
        };

        stats::Entity::update_many()
            .col_expr(stats::Column::WindowStart, Expr::value(now))
            .col_expr(stats::Column::DropsUsedInWindow, Expr::value(0))
            .col_expr(stats::Column::UpdatedAt, Expr::cust("NOW()"))
            .filter(stats::Column::UserId.eq(model.user_id.as_str()))
            .filter(Condition::all().add(seen))
            .exec(db)
            .await?;

        // 无论本次重置是否生效 (可能被并发请求抢先), 都以库内最新状态为准
        stats::Entity::find_by_id(model.user_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!("user_stats missing for {}", model.user_id))
            })
    }

    /// 原子占用一个掉落名额并累计掉落/收集计数
    /// 守卫条件 drops_used_in_window < 上限; 未命中表示名额已被并发请求用完
    pub async fn take_drop_slot<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> AppResult<bool> {
        let updated = stats::Entity::update_many()
            .col_expr(
                stats::Column::DropsUsedInWindow,
                Expr::col(stats::Column::DropsUsedInWindow).add(1),
            )
            .col_expr(
                stats::Column::TotalDropsUsed,
                Expr::col(stats::Column::TotalDropsUsed).add(1),
            )
            .col_expr(
                stats::Column::TotalCardsCollected,
                Expr::col(stats::Column::TotalCardsCollected).add(1),
            )
            .col_expr(stats::Column::UpdatedAt, Expr::cust("NOW()"))
            .filter(stats::Column::UserId.eq(user_id))
            .filter(stats::Column::DropsUsedInWindow.lt(MAX_DROPS_PER_WINDOW))
            .exec(db)
            .await?;

        Ok(updated.rows_affected == 1)
    }

    /// 记录一次合成尝试的结果计数
    pub async fn record_craft_outcome<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        success: bool,
    ) -> AppResult<()> {
        let outcome_col = if success {
            stats::Column::SuccessfulCrafts
        } else {
            stats::Column::FailedCrafts
        };

        stats::Entity::update_many()
            .col_expr(
                stats::Column::CraftingAttempts,
                Expr::col(stats::Column::CraftingAttempts).add(1),
            )
            .col_expr(outcome_col, Expr::col(outcome_col).add(1))
            .col_expr(stats::Column::UpdatedAt, Expr::cust("NOW()"))
            .filter(stats::Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        Ok(())
    }

    /// 全量重算按稀有度的持有计数
    /// 任何库存变更后调用; 从当前库存出发重算, 天然幂等
    pub async fn recompute_rarity_counters<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> AppResult<()> {
        let entries = inventory::Entity::find()
            .filter(inventory::Column::UserId.eq(user_id))
            .filter(inventory::Column::Quantity.gt(0))
            .all(db)
            .await?;

        let ids: Vec<String> = entries.iter().map(|e| e.card_id.clone()).collect();
        let rarity_map: HashMap<String, CardRarity> = if ids.is_empty() {
            HashMap::new()
        } else {
            cards::Entity::find()
                .filter(cards::Column::Id.is_in(ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.rarity))
                .collect()
        };

        let mut counts: HashMap<CardRarity, i64> = HashMap::new();
        for entry in &entries {
            let rarity = rarity_map
                .get(&entry.card_id)
                .copied()
                .ok_or_else(|| AppError::UnknownCard(entry.card_id.clone()))?;
            *counts.entry(rarity).or_insert(0) += entry.quantity as i64;
        }

        let get = |r: CardRarity| counts.get(&r).copied().unwrap_or(0);

        stats::Entity::update_many()
            .col_expr(stats::Column::BasicCards, Expr::value(get(CardRarity::Basic)))
            .col_expr(stats::Column::RareCards, Expr::value(get(CardRarity::Rare)))
            .col_expr(stats::Column::EpicCards, Expr::value(get(CardRarity::Epic)))
            .col_expr(
                stats::Column::LegendaryCards,
                Expr::value(get(CardRarity::Legendary)),
            )
            .col_expr(
                stats::Column::MaterialCards,
                Expr::value(get(CardRarity::Material)),
            )
            .col_expr(stats::Column::UpdatedAt, Expr::cust("NOW()"))
            .filter(stats::Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        Ok(())
    }

    /// 当前窗口剩余掉落次数 (失效窗口先重置再上报)
    pub async fn remaining_drops(&self, raw_user: &str) -> AppResult<i32> {
        let user_id = resolve_user_key(raw_user);
        let model = self.ensure_stats(&self.pool, &user_id).await?;
        let model = self.refresh_window(&self.pool, model, Utc::now()).await?;
        Ok(remaining_in_window(&model))
    }

    /// 用户统计视图
    pub async fn get_user_stats(&self, raw_user: &str) -> AppResult<UserStatsResponse> {
        let user_id = resolve_user_key(raw_user);
        let model = self.ensure_stats(&self.pool, &user_id).await?;
        let model = self.refresh_window(&self.pool, model, Utc::now()).await?;
        let remaining = remaining_in_window(&model);
        Ok(UserStatsResponse::from_stats(&model, remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with(window_start: Option<DateTime<Utc>>, used: i32) -> stats::Model {
        stats::Model {
            user_id: "testuser0000001".to_string(),
            window_start,
            drops_used_in_window: used,
            total_drops_used: 0,
            total_cards_collected: 0,
            crafting_attempts: 0,
            successful_crafts: 0,
            failed_crafts: 0,
            basic_cards: 0,
            rare_cards: 0,
            epic_cards: 0,
            legendary_cards: 0,
            material_cards: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_missing_window_is_stale() {
        assert!(window_is_stale(None, Utc::now()));
    }

    #[test]
    fn test_future_window_is_stale() {
        // 时钟偏移保护: 开窗时间在未来视为失效
        let now = Utc::now();
        assert!(window_is_stale(Some(now + Duration::minutes(5)), now));
    }

    #[test]
    fn test_expired_window_is_stale() {
        let now = Utc::now();
        assert!(window_is_stale(Some(now - Duration::hours(24)), now));
        assert!(window_is_stale(Some(now - Duration::hours(25)), now));
    }

    #[test]
    fn test_recent_window_is_fresh() {
        let now = Utc::now();
        assert!(!window_is_stale(Some(now), now));
        assert!(!window_is_stale(
            Some(now - Duration::hours(23) - Duration::minutes(59)),
            now
        ));
    }

    #[test]
    fn test_remaining_never_negative() {
        let now = Utc::now();
        assert_eq!(remaining_in_window(&stats_with(Some(now), 0)), 5);
        assert_eq!(remaining_in_window(&stats_with(Some(now), 5)), 0);
        // 计数超过上限时按 0 上报
        assert_eq!(remaining_in_window(&stats_with(Some(now), 7)), 0);
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户收集统计表实体
/// 说明:
/// - window_start / drops_used_in_window: 当前24小时掉落窗口 (懒重置, 无后台任务)
/// - *_cards: 按稀有度冗余统计的持有数量, 由 StatsService 全量重算
/// - 记录只增不删, 首次使用时创建
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub window_start: Option<DateTime<Utc>>,
    pub drops_used_in_window: i32,
    pub total_drops_used: i64,
    pub total_cards_collected: i64,
    pub crafting_attempts: i64,
    pub successful_crafts: i64,
    pub failed_crafts: i64,
    pub basic_cards: i64,
    pub rare_cards: i64,
    pub epic_cards: i64,
    pub legendary_cards: i64,
    pub material_cards: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::user_stats_entity;

/// 用户收集统计响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserStatsResponse {
    /// 当前窗口剩余掉落次数
    pub remaining_drops: i32,
    /// 累计掉落次数
    pub total_drops_used: i64,
    /// 累计获得卡片数
    pub total_cards_collected: i64,
    /// 合成尝试次数
    pub crafting_attempts: i64,
    /// 合成成功次数
    pub successful_crafts: i64,
    /// 合成失败次数
    pub failed_crafts: i64,
    /// 按稀有度统计的当前持有数量
    pub owned_by_rarity: OwnedByRarity,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnedByRarity {
    pub basic: i64,
    pub rare: i64,
    pub epic: i64,
    pub legendary: i64,
    pub material: i64,
}

impl UserStatsResponse {
    /// remaining_drops 由调用方按窗口规则计算后传入
    pub fn from_stats(m: &user_stats_entity::Model, remaining_drops: i32) -> Self {
        UserStatsResponse {
            remaining_drops,
            total_drops_used: m.total_drops_used,
            total_cards_collected: m.total_cards_collected,
            crafting_attempts: m.crafting_attempts,
            successful_crafts: m.successful_crafts,
            failed_crafts: m.failed_crafts,
            owned_by_rarity: OwnedByRarity {
                basic: m.basic_cards,
                rare: m.rare_cards,
                epic: m.epic_cards,
                legendary: m.legendary_cards,
                material: m.material_cards,
            },
        }
    }
}

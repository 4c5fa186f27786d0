use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::CardView;

/// 合成请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CraftRequest {
    /// true 走 material 路径 (材料卡作为催化剂, 不消耗)
    #[serde(default)]
    pub use_material_path: bool,
}

/// 合成消耗的一项 (card_id, quantity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConsumedCard {
    pub card_id: String,
    pub quantity: i32,
}

/// 合成结果响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CraftResponse {
    /// 是否合成成功
    pub success: bool,
    /// 合成得到的 prestige 卡 (失败时为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardView>,
    /// 用户可读的说明
    pub message: String,
    /// 本次实际消耗的卡片 (material 路径与校验失败时为空)
    pub consumed: Vec<ConsumedCard>,
}

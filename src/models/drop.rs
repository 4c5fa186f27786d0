use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::CardView;

/// 掉落结果响应
/// 限流与空目录属于正常业务失败: success=false 并附带说明, 不走错误通道
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DropResponse {
    /// 是否掉落成功
    pub success: bool,
    /// 掉落到的卡片 (失败时为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardView>,
    /// 用户可读的说明
    pub message: String,
    /// 当前窗口剩余掉落次数
    pub remaining_drops: i32,
}

/// 剩余掉落次数响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemainingDropsResponse {
    /// 当前窗口剩余掉落次数
    pub remaining: i32,
}

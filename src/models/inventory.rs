use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CardView, PaginatedResponse};
use crate::entities::AcquiredVia;

/// 库存查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct InventoryQuery {
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

/// 库存条目响应 (已与卡片目录连接)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryEntryResponse {
    /// 卡片视图
    pub card: CardView,
    /// 持有数量
    pub quantity: i32,
    /// 是否锁定 (锁定的卡不参与合成消耗)
    pub locked: bool,
    /// 获得途径
    pub acquired_via: AcquiredVia,
    /// 最近获得时间
    pub acquired_at: DateTime<Utc>,
}

/// 库存分页响应 (最近获得优先)
pub type InventoryPageResponse = PaginatedResponse<InventoryEntryResponse>;

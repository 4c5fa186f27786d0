use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ConsumedCard, PaginatedResponse};
use crate::entities::{card_ledger_entity, LedgerKind};

/// 流水查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LedgerQuery {
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

/// 单条掉落/合成流水
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerRecordResponse {
    /// 记录ID
    pub id: i64,
    /// 类型 (drop / craft)
    pub kind: LedgerKind,
    /// 是否成功
    pub success: bool,
    /// 获得的卡片ID (合成失败时为空)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    /// 合成消耗的卡片列表 (掉落为空)
    pub consumed: Vec<ConsumedCard>,
    /// 时间
    pub created_at: DateTime<Utc>,
}

impl From<card_ledger_entity::Model> for LedgerRecordResponse {
    fn from(m: card_ledger_entity::Model) -> Self {
        // consumed 为历史快照 JSON, 解析失败按空列表处理
        let consumed = m
            .consumed
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        LedgerRecordResponse {
            id: m.id,
            kind: m.kind,
            success: m.success,
            card_id: m.card_id,
            consumed,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// 流水分页响应
pub type LedgerPageResponse = PaginatedResponse<LedgerRecordResponse>;

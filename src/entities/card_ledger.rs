use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ledger_kind")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    #[sea_orm(string_value = "drop")]
    Drop,
    #[sea_orm(string_value = "craft")]
    Craft,
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKind::Drop => write!(f, "drop"),
            LedgerKind::Craft => write!(f, "craft"),
        }
    }
}

/// 掉落/合成流水实体 (仅追加, 审计用)
/// 说明:
/// - card_id: 获得的卡片; 合成失败时为 NULL
/// - consumed: 合成消耗的 (card_id, quantity) 列表, JSON 文本; 掉落为 NULL
/// - 创建后不再修改
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "card_ledger")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub card_id: Option<String>,
    pub kind: LedgerKind,
    pub success: bool,
    pub consumed: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

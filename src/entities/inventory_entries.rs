use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "acquired_via")]
#[serde(rename_all = "snake_case")]
pub enum AcquiredVia {
    #[sea_orm(string_value = "drop")]
    Drop,
    #[sea_orm(string_value = "craft")]
    Craft,
    #[sea_orm(string_value = "gift")]
    Gift,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl std::fmt::Display for AcquiredVia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquiredVia::Drop => write!(f, "drop"),
            AcquiredVia::Craft => write!(f, "craft"),
            AcquiredVia::Gift => write!(f, "gift"),
            AcquiredVia::Admin => write!(f, "admin"),
        }
    }
}

/// 用户库存实体
/// 说明:
/// - (user_id, card_id) 唯一, 重复获得时 quantity 递增
/// - quantity 恒 >= 1, 扣减到 0 的行直接删除而不是保留
/// - locked: 锁定的卡不参与合成消耗
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub card_id: String,
    pub quantity: i32,
    pub locked: bool,
    pub acquired_via: AcquiredVia,
    pub acquired_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "card_type")]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    #[sea_orm(string_value = "year")]
    Year,
    #[sea_orm(string_value = "signature")]
    Signature,
    #[sea_orm(string_value = "special")]
    Special,
    #[sea_orm(string_value = "material")]
    Material,
    #[sea_orm(string_value = "prestige")]
    Prestige,
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardType::Year => write!(f, "year"),
            CardType::Signature => write!(f, "signature"),
            CardType::Special => write!(f, "special"),
            CardType::Material => write!(f, "material"),
            CardType::Prestige => write!(f, "prestige"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "card_rarity")]
#[serde(rename_all = "snake_case")]
pub enum CardRarity {
    #[sea_orm(string_value = "basic")]
    Basic,
    #[sea_orm(string_value = "rare")]
    Rare,
    #[sea_orm(string_value = "epic")]
    Epic,
    #[sea_orm(string_value = "legendary")]
    Legendary,
    #[sea_orm(string_value = "material")]
    Material,
}

impl std::fmt::Display for CardRarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardRarity::Basic => write!(f, "basic"),
            CardRarity::Rare => write!(f, "rare"),
            CardRarity::Epic => write!(f, "epic"),
            CardRarity::Legendary => write!(f, "legendary"),
            CardRarity::Material => write!(f, "material"),
        }
    }
}

/// 卡片目录实体
/// 概念说明:
/// - id: 卡片唯一标识, 命名约定 {owner}_year_{yyyy}_{h1|h2}[_vN] / {owner}_sig_{yyyy} 等
/// - drop_weight: 掉落权重, 0 表示不参与自然掉落 (prestige 卡固定为 0)
/// - image_ref: 资源指针, NULL/空 表示素材缺失, 该卡不进入掉落池
/// - period: year 卡的上/下半期标记 (h1 / h2)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub display_name: String,
    pub card_type: CardType,
    pub rarity: CardRarity,
    pub owner_tag: Option<String>,
    pub year: Option<i32>,
    pub period: Option<String>,
    pub drop_weight: i32,
    pub craft_eligible: bool,
    pub image_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 素材是否可解析 (缺失素材的卡不进入掉落池)
    pub fn has_asset(&self) -> bool {
        self.image_ref.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// 是否参与自然掉落
    pub fn is_droppable(&self) -> bool {
        self.card_type != CardType::Prestige && self.drop_weight > 0 && self.has_asset()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

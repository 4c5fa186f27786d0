use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{card_entity, CardRarity, CardType};

/// 返回给前端的卡片视图
/// image_ref 保证可解析: 素材缺失时落到统一兜底图
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CardView {
    /// 卡片ID
    pub card_id: String,
    /// 展示名称
    pub display_name: String,
    /// 卡片类型
    pub card_type: CardType,
    /// 稀有度
    pub rarity: CardRarity,
    /// 素材指针 (缺失时为兜底图)
    pub image_ref: String,
}

impl CardView {
    pub fn from_card(card: &card_entity::Model, placeholder_ref: &str) -> Self {
        let image_ref = match card.image_ref.as_deref() {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => placeholder_ref.to_string(),
        };
        CardView {
            card_id: card.id.clone(),
            display_name: card.display_name.clone(),
            card_type: card.card_type,
            rarity: card.rarity,
            image_ref,
        }
    }
}

/// 掉落池条目 (归并后的候选与合计权重)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DropPoolEntry {
    /// 代表卡
    pub card: CardView,
    /// 合计掉落权重 (同组变体已合并)
    pub weight: i64,
}

/// 目录重建响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogResyncResponse {
    /// 本次从素材源补录的卡片数
    pub upserted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(image_ref: Option<&str>) -> card_entity::Model {
        card_entity::Model {
            id: "haru_year_2024_h1".to_string(),
            display_name: "Haru 2024 First Half".to_string(),
            card_type: CardType::Year,
            rarity: CardRarity::Basic,
            owner_tag: Some("haru".to_string()),
            year: Some(2024),
            period: Some("h1".to_string()),
            drop_weight: 50,
            craft_eligible: true,
            image_ref: image_ref.map(|s| s.to_string()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_view_keeps_resolvable_image_ref() {
        let view = CardView::from_card(&card(Some("cards/x.webp")), "cards/placeholder.webp");
        assert_eq!(view.image_ref, "cards/x.webp");
    }

    #[test]
    fn test_view_falls_back_to_placeholder() {
        let view = CardView::from_card(&card(None), "cards/placeholder.webp");
        assert_eq!(view.image_ref, "cards/placeholder.webp");

        let view = CardView::from_card(&card(Some("")), "cards/placeholder.webp");
        assert_eq!(view.image_ref, "cards/placeholder.webp");
    }
}

use crate::entities::{card_entity as cards, CardRarity, CardType};
use crate::error::AppResult;
use crate::external::AssetCatalogApi;
use regex::Regex;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// 目录为空且重建后仍为空时返回的合成兜底卡 (不落库)
pub const FALLBACK_CARD_ID: &str = "default_card";

/// 掉落候选: 同一 dedup key 的目录行合并后的代表卡与合计权重
#[derive(Debug, Clone)]
pub struct DropCandidate {
    pub card: cards::Model,
    pub weight: i64,
}

fn year_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([a-z0-9]+)_year_(\d{4})_(h1|h2)(?:_v(\d+))?$").expect("valid regex")
    })
}

fn sig_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z0-9]+)_sig_(\d{4})$").expect("valid regex"))
}

/// 同一概念掉落的归并键
/// - year 卡: (owner, year, 半期)
/// - signature 卡: (owner, year)
/// - special / material 卡: 素材指针 (缺失时回退卡片 id)
/// 字段不全的行退化为按 id 独立成组, 避免把无关卡归并到一起
pub fn dedup_key(card: &cards::Model) -> String {
    match card.card_type {
        CardType::Year => match (card.owner_tag.as_deref(), card.year, card.period.as_deref()) {
            (Some(owner), Some(year), Some(period)) => {
                format!("year:{owner}:{year}:{period}")
            }
            _ => format!("id:{}", card.id),
        },
        CardType::Signature => match (card.owner_tag.as_deref(), card.year) {
            (Some(owner), Some(year)) => format!("sig:{owner}:{year}"),
            _ => format!("id:{}", card.id),
        },
        CardType::Special | CardType::Material => match card.image_ref.as_deref() {
            Some(r) if !r.is_empty() => format!("asset:{r}"),
            _ => format!("id:{}", card.id),
        },
        // prestige 卡不进掉落池, 仅为完整性
        CardType::Prestige => format!("id:{}", card.id),
    }
}

/// 组内代表卡评分: 命名规范加分, 背景/占位风格素材减分
pub fn candidate_score(card: &cards::Model) -> i32 {
    let mut score = 0;

    let id_matches = match card.card_type {
        CardType::Year => year_id_pattern().is_match(&card.id),
        CardType::Signature => sig_id_pattern().is_match(&card.id),
        _ => true,
    };
    if id_matches {
        score += 2;
    }

    if let Some(image_ref) = card.image_ref.as_deref() {
        let lower = image_ref.to_ascii_lowercase();
        if lower.contains("background") || lower.contains("placeholder") || lower.contains("_bg") {
            score -= 2;
        }
    }

    score
}

/// 将原始目录行按 dedup key 归并为掉落候选
/// 组内按 (评分 desc, id asc) 选代表, 权重为全组合计
/// 结果按代表卡 id 升序, 同一目录快照下顺序稳定
pub fn dedup_candidates(raw: Vec<cards::Model>) -> Vec<DropCandidate> {
    let mut groups: BTreeMap<String, Vec<cards::Model>> = BTreeMap::new();
    for card in raw {
        groups.entry(dedup_key(&card)).or_default().push(card);
    }

    let mut result: Vec<DropCandidate> = groups
        .into_values()
        .map(|mut group| {
            let weight: i64 = group.iter().map(|c| c.drop_weight as i64).sum();
            group.sort_by(|a, b| {
                candidate_score(b)
                    .cmp(&candidate_score(a))
                    .then_with(|| a.id.cmp(&b.id))
            });
            let canonical = group.into_iter().next().expect("non-empty group");
            DropCandidate {
                card: canonical,
                weight,
            }
        })
        .collect();

    result.sort_by(|a, b| a.card.id.cmp(&b.card.id));
    result
}

/// 合成兜底卡 (目录未初始化时, 列表接口不向调用方抛错)
pub fn fallback_card() -> cards::Model {
    cards::Model {
        id: FALLBACK_CARD_ID.to_string(),
        display_name: "Mystery Card".to_string(),
        card_type: CardType::Special,
        rarity: CardRarity::Basic,
        owner_tag: None,
        year: None,
        period: None,
        drop_weight: 1,
        craft_eligible: false,
        image_ref: None,
        created_at: None,
        updated_at: None,
    }
}

/// 从素材文件名解析目录行 (不符合命名约定的素材拒收)
/// 例: cards/haru_year_2024_h1_v2.webp -> year 卡, owner=haru, 2024 上半期第2版式
pub fn parse_card_from_asset(file_name: &str) -> Option<cards::ActiveModel> {
    let stem = file_name
        .rsplit('/')
        .next()
        .unwrap_or(file_name)
        .split('.')
        .next()
        .unwrap_or_default();
    if stem.is_empty() {
        return None;
    }

    let image_ref = format!("cards/{stem}.webp");

    if let Some(caps) = year_id_pattern().captures(stem) {
        let owner = caps.get(1).map(|m| m.as_str().to_string())?;
        let year: i32 = caps.get(2)?.as_str().parse().ok()?;
        let period = caps.get(3)?.as_str().to_string();
        let variant = caps.get(4).is_some();
        let half = if period == "h1" {
            "First Half"
        } else {
            "Second Half"
        };
        return Some(cards::ActiveModel {
            id: Set(stem.to_string()),
            display_name: Set(format!("{} {} {}", title_case(&owner), year, half)),
            card_type: Set(CardType::Year),
            rarity: Set(CardRarity::Basic),
            owner_tag: Set(Some(owner)),
            year: Set(Some(year)),
            period: Set(Some(period)),
            drop_weight: Set(if variant { 30 } else { 50 }),
            craft_eligible: Set(true),
            image_ref: Set(Some(image_ref)),
            ..Default::default()
        });
    }

    if let Some(caps) = sig_id_pattern().captures(stem) {
        let owner = caps.get(1).map(|m| m.as_str().to_string())?;
        let year: i32 = caps.get(2)?.as_str().parse().ok()?;
        return Some(cards::ActiveModel {
            id: Set(stem.to_string()),
            display_name: Set(format!("{} Signature {}", title_case(&owner), year)),
            card_type: Set(CardType::Signature),
            rarity: Set(CardRarity::Epic),
            owner_tag: Set(Some(owner)),
            year: Set(Some(year)),
            drop_weight: Set(5),
            craft_eligible: Set(true),
            image_ref: Set(Some(image_ref)),
            ..Default::default()
        });
    }

    let (card_type, rarity, weight, craft_eligible) = if stem.starts_with("special_") {
        (CardType::Special, CardRarity::Rare, 20, true)
    } else if stem.starts_with("material_") {
        (CardType::Material, CardRarity::Material, 10, true)
    } else if stem.starts_with("prestige_") {
        (CardType::Prestige, CardRarity::Legendary, 0, false)
    } else {
        return None;
    };

    Some(cards::ActiveModel {
        id: Set(stem.to_string()),
        display_name: Set(title_case(stem)),
        card_type: Set(card_type),
        rarity: Set(rarity),
        drop_weight: Set(weight),
        craft_eligible: Set(craft_eligible),
        image_ref: Set(Some(image_ref)),
        ..Default::default()
    })
}

fn title_case(slug: &str) -> String {
    slug.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct CatalogService {
    pool: DatabaseConnection,
    asset_api: AssetCatalogApi,
}

impl CatalogService {
    pub fn new(pool: DatabaseConnection, asset_api: AssetCatalogApi) -> Self {
        Self { pool, asset_api }
    }

    pub fn placeholder_ref(&self) -> &str {
        self.asset_api.placeholder_ref()
    }

    /// 原始掉落池: 非 prestige, 权重 > 0, 素材可解析; 已归并, 可能为空
    pub async fn drop_candidates<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> AppResult<Vec<DropCandidate>> {
        let raw = cards::Entity::find()
            .filter(cards::Column::CardType.ne(CardType::Prestige))
            .filter(cards::Column::DropWeight.gt(0))
            .order_by_asc(cards::Column::Id)
            .all(db)
            .await?;

        let droppable: Vec<cards::Model> = raw.into_iter().filter(|c| c.is_droppable()).collect();
        Ok(dedup_candidates(droppable))
    }

    /// 掉落池 (空时重建目录一次再查); 仍为空时返回空列表, 由调用方决定失败或兜底
    pub async fn drop_candidates_with_repair<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> AppResult<Vec<DropCandidate>> {
        let pool = self.drop_candidates(db).await?;
        if !pool.is_empty() {
            return Ok(pool);
        }

        log::warn!("Drop pool is empty, attempting catalog resync from asset source");
        match self.resync_from_assets().await {
            Ok(upserted) => log::info!("Catalog resync complete, upserted {upserted} cards"),
            Err(e) => log::error!("Catalog resync failed: {e:?}"),
        }

        self.drop_candidates(db).await
    }

    /// 展示用掉落池: 目录未初始化时回退到合成兜底卡, 不抛错
    pub async fn list_drop_candidates(&self) -> AppResult<Vec<DropCandidate>> {
        let pool = self.drop_candidates_with_repair(&self.pool).await?;
        if pool.is_empty() {
            return Ok(vec![DropCandidate {
                card: fallback_card(),
                weight: 1,
            }]);
        }
        Ok(pool)
    }

    /// 从素材源重建目录 (幂等: 已存在的卡跳过)
    pub async fn resync_from_assets(&self) -> AppResult<u64> {
        let assets = self.asset_api.list_card_assets().await?;

        let mut upserted = 0u64;
        for file_name in &assets {
            let Some(model) = parse_card_from_asset(file_name) else {
                log::warn!("Asset does not match any card naming convention, skipped: {file_name}");
                continue;
            };

            let insert = cards::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(cards::Column::Id)
                        .do_nothing()
                        .to_owned(),
                )
                .exec(&self.pool)
                .await;

            match insert {
                Ok(_) => upserted += 1,
                // 已存在的卡: 幂等跳过
                Err(DbErr::RecordNotInserted) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(upserted)
    }

    /// prestige 卡列表 (合成奖励选择用)
    pub async fn prestige_cards<C: ConnectionTrait>(&self, db: &C) -> AppResult<Vec<cards::Model>> {
        let list = cards::Entity::find()
            .filter(cards::Column::CardType.eq(CardType::Prestige))
            .order_by_asc(cards::Column::Id)
            .all(db)
            .await?;
        Ok(list)
    }

    /// 按 id 批量取卡 (库存连接用)
    pub async fn cards_by_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
    ) -> AppResult<Vec<cards::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let list = cards::Entity::find()
            .filter(cards::Column::Id.is_in(ids.iter().cloned()))
            .all(db)
            .await?;
        Ok(list)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn year_card(id: &str, owner: &str, period: &str, weight: i32, image: &str) -> cards::Model {
        cards::Model {
            id: id.to_string(),
            display_name: format!("{} 2024", title_case(owner)),
            card_type: CardType::Year,
            rarity: CardRarity::Basic,
            owner_tag: Some(owner.to_string()),
            year: Some(2024),
            period: Some(period.to_string()),
            drop_weight: weight,
            craft_eligible: true,
            image_ref: Some(image.to_string()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_variants_merge_into_one_candidate_with_summed_weight() {
        let raw = vec![
            year_card("haru_year_2024_h1", "haru", "h1", 50, "cards/haru_year_2024_h1.webp"),
            year_card(
                "haru_year_2024_h1_v2",
                "haru",
                "h1",
                30,
                "cards/haru_year_2024_h1_v2.webp",
            ),
            year_card("haru_year_2024_h2", "haru", "h2", 50, "cards/haru_year_2024_h2.webp"),
        ];

        let pool = dedup_candidates(raw);
        assert_eq!(pool.len(), 2);

        // 合并组: 权重合计, 代表卡为基础版式
        let merged = pool
            .iter()
            .find(|c| c.card.id == "haru_year_2024_h1")
            .expect("canonical variant");
        assert_eq!(merged.weight, 80);

        // v2 变体不会作为独立候选出现
        assert!(pool.iter().all(|c| c.card.id != "haru_year_2024_h1_v2"));
    }

    #[test]
    fn test_background_looking_asset_loses_canonical_pick() {
        let base = year_card(
            "mina_year_2024_h1",
            "mina",
            "h1",
            20,
            "cards/mina_year_2024_h1_background.webp",
        );
        let alt = year_card(
            "mina_year_2024_h1_v2",
            "mina",
            "h1",
            20,
            "cards/mina_year_2024_h1_v2.webp",
        );

        let pool = dedup_candidates(vec![base, alt]);
        assert_eq!(pool.len(), 1);
        // 背景风格素材被减分, 第二版式成为代表
        assert_eq!(pool[0].card.id, "mina_year_2024_h1_v2");
        assert_eq!(pool[0].weight, 40);
    }

    #[test]
    fn test_distinct_periods_stay_separate() {
        let pool = dedup_candidates(vec![
            year_card("haru_year_2024_h1", "haru", "h1", 50, "cards/a.webp"),
            year_card("haru_year_2024_h2", "haru", "h2", 50, "cards/b.webp"),
        ]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_special_cards_dedup_by_image_ref() {
        let mk = |id: &str, image: &str| cards::Model {
            id: id.to_string(),
            display_name: "Anniversary".to_string(),
            card_type: CardType::Special,
            rarity: CardRarity::Rare,
            owner_tag: None,
            year: Some(2024),
            period: None,
            drop_weight: 10,
            craft_eligible: true,
            image_ref: Some(image.to_string()),
            created_at: None,
            updated_at: None,
        };

        let pool = dedup_candidates(vec![
            mk("special_anniv_2024", "cards/special_anniv_2024.webp"),
            mk("special_anniv_2024_alt", "cards/special_anniv_2024.webp"),
            mk("special_concert_2024", "cards/special_concert_2024.webp"),
        ]);
        assert_eq!(pool.len(), 2);

        let merged = pool
            .iter()
            .find(|c| c.card.id == "special_anniv_2024")
            .expect("canonical");
        assert_eq!(merged.weight, 20);
    }

    #[test]
    fn test_candidate_ordering_is_stable() {
        let a = vec![
            year_card("yuna_year_2024_h1", "yuna", "h1", 50, "cards/a.webp"),
            year_card("haru_year_2024_h1", "haru", "h1", 50, "cards/b.webp"),
        ];
        let b: Vec<cards::Model> = a.iter().rev().cloned().collect();

        let ids_a: Vec<String> = dedup_candidates(a).into_iter().map(|c| c.card.id).collect();
        let ids_b: Vec<String> = dedup_candidates(b).into_iter().map(|c| c.card.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(ids_a, vec!["haru_year_2024_h1", "yuna_year_2024_h1"]);
    }

    #[test]
    fn test_parse_year_asset() {
        let am = parse_card_from_asset("cards/haru_year_2024_h1_v2.webp").expect("year card");
        assert_eq!(am.id.clone().unwrap(), "haru_year_2024_h1_v2");
        assert_eq!(am.card_type.clone().unwrap(), CardType::Year);
        assert_eq!(am.owner_tag.clone().unwrap(), Some("haru".to_string()));
        assert_eq!(am.year.clone().unwrap(), Some(2024));
        assert_eq!(am.period.clone().unwrap(), Some("h1".to_string()));
        // 变体版式权重低于基础版式
        assert_eq!(am.drop_weight.clone().unwrap(), 30);
    }

    #[test]
    fn test_parse_signature_and_prestige_assets() {
        let sig = parse_card_from_asset("cards/mina_sig_2024.webp").expect("signature card");
        assert_eq!(sig.card_type.clone().unwrap(), CardType::Signature);
        assert_eq!(sig.rarity.clone().unwrap(), CardRarity::Epic);

        let prestige = parse_card_from_asset("cards/prestige_aurora.webp").expect("prestige card");
        assert_eq!(prestige.card_type.clone().unwrap(), CardType::Prestige);
        assert_eq!(prestige.drop_weight.clone().unwrap(), 0);
        assert!(!prestige.craft_eligible.clone().unwrap());
    }

    #[test]
    fn test_unrecognized_asset_is_rejected() {
        assert!(parse_card_from_asset("cards/README.txt").is_none());
        assert!(parse_card_from_asset("cards/haru_2024.webp").is_none());
        assert!(parse_card_from_asset("").is_none());
    }

    #[test]
    fn test_fallback_card_is_droppable_shape() {
        let card = fallback_card();
        assert_eq!(card.id, FALLBACK_CARD_ID);
        assert!(card.drop_weight > 0);
        assert_ne!(card.card_type, CardType::Prestige);
    }
}

use crate::entities::{
    card_entity as cards, card_ledger_entity as ledger, AcquiredVia, CardType, LedgerKind,
};
use crate::error::{AppError, AppResult};
use crate::models::{CardView, ConsumedCard, CraftResponse};
use crate::services::{CatalogService, InventoryService, StatsService};
use crate::utils::resolve_user_key;
use rand::Rng;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use std::collections::HashMap;

/// 标准配方: 未锁定库存中 year 卡合计 7 张
pub const YEAR_UNITS_REQUIRED: i32 = 7;
/// 标准配方: special 卡合计 3 张
pub const SPECIAL_UNITS_REQUIRED: i32 = 3;
/// 标准配方: signature 卡 1 张
pub const SIGNATURE_UNITS_REQUIRED: i32 = 1;

/// 合成成功概率
pub const CRAFT_SUCCESS_RATE: f64 = 0.70;
/// 成功时抽中个人 prestige 卡的概率 (否则发团体卡)
pub const PERSONAL_PRESTIGE_RATE: f64 = 0.175;

/// 参与合成结算的库存行 (卡片本身已确认 craft_eligible)
#[derive(Debug, Clone)]
pub struct CraftableEntry {
    pub card_id: String,
    pub card_type: CardType,
    pub quantity: i32,
    pub locked: bool,
}

/// 是否持有可用的 material 催化剂 (锁定的不算)
pub fn has_material_catalyst(entries: &[CraftableEntry]) -> bool {
    entries
        .iter()
        .any(|e| e.card_type == CardType::Material && e.quantity > 0 && !e.locked)
}

/// 构建标准路径的消耗计划
/// 按 card_id 升序贪心抽取: year 卡凑满 7 张, special 卡凑满 3 张,
/// signature 卡恰好 1 张; 同一库存快照下结果确定。
/// 锁定的行即使数量足够也不参与抽取。
/// 凑不齐任意一项返回 None (调用方按 InsufficientMaterials 处理)
pub fn build_consumption_plan(entries: &[CraftableEntry]) -> Option<Vec<ConsumedCard>> {
    let mut sorted: Vec<&CraftableEntry> = entries
        .iter()
        .filter(|e| e.quantity > 0 && !e.locked)
        .collect();
    sorted.sort_by(|a, b| a.card_id.cmp(&b.card_id));

    let mut plan: Vec<ConsumedCard> = Vec::new();

    let mut drain = |card_type: CardType, mut needed: i32, plan: &mut Vec<ConsumedCard>| -> bool {
        for entry in sorted.iter().filter(|e| e.card_type == card_type) {
            if needed == 0 {
                break;
            }
            let take = entry.quantity.min(needed);
            plan.push(ConsumedCard {
                card_id: entry.card_id.clone(),
                quantity: take,
            });
            needed -= take;
        }
        needed == 0
    };

    if !drain(CardType::Year, YEAR_UNITS_REQUIRED, &mut plan) {
        return None;
    }
    if !drain(CardType::Special, SPECIAL_UNITS_REQUIRED, &mut plan) {
        return None;
    }
    if !drain(CardType::Signature, SIGNATURE_UNITS_REQUIRED, &mut plan) {
        return None;
    }

    Some(plan)
}

/// 成功后的 prestige 奖励选择
/// 0.175 概率在个人卡中等概率抽一张, 否则发团体卡 (owner_tag 为空的那张);
/// 目录缺团体卡时退回个人卡, 两者皆缺返回 None
pub fn pick_prestige<'a, R: Rng>(
    rng: &mut R,
    prestige_pool: &'a [cards::Model],
) -> Option<&'a cards::Model> {
    let (personal, group): (Vec<&cards::Model>, Vec<&cards::Model>) =
        prestige_pool.iter().partition(|c| c.owner_tag.is_some());

    if !personal.is_empty() && (group.is_empty() || rng.gen_bool(PERSONAL_PRESTIGE_RATE)) {
        return Some(personal[rng.gen_range(0..personal.len())]);
    }

    group.first().copied().or_else(|| personal.first().copied())
}

#[derive(Clone)]
pub struct CraftService {
    pool: DatabaseConnection,
    catalog: CatalogService,
    inventory: InventoryService,
    stats: StatsService,
}

impl CraftService {
    pub fn new(
        pool: DatabaseConnection,
        catalog: CatalogService,
        inventory: InventoryService,
        stats: StatsService,
    ) -> Self {
        Self {
            pool,
            catalog,
            inventory,
            stats,
        }
    }

    /// 执行一次合成
    ///
    /// 逻辑:
    /// 1. 校验: material 路径要求一张未锁定 material 卡;
    ///    标准路径按 7 year + 3 special + 1 signature 构建消耗计划
    /// 2. 标准路径先扣减消耗 (守卫式, 并发合成不会重复消耗同一批卡);
    ///    material 路径不消耗任何卡
    /// 3. 0.70 概率判定成败; 标准路径无论成败消耗都已发生
    /// 4. 成功时选取 prestige 卡入库存
    /// 5. 写流水 (消耗快照 + 结果), 更新合成计数与稀有度计数
    /// 校验不通过是正常业务失败: 无任何副作用, 不计入尝试次数
    pub async fn craft(&self, raw_user: &str, use_material_path: bool) -> AppResult<CraftResponse> {
        let user_id = resolve_user_key(raw_user);

        let txn = self.pool.begin().await?;

        self.stats.ensure_stats(&txn, &user_id).await?;

        let craftable = self.load_craftable_entries(&txn, &user_id).await?;

        // Validating
        let plan: Vec<ConsumedCard> = if use_material_path {
            if !has_material_catalyst(&craftable) {
                txn.rollback().await?;
                return Ok(CraftResponse {
                    success: false,
                    card: None,
                    message: "You need at least one unlocked material card to craft this way."
                        .to_string(),
                    consumed: vec![],
                });
            }
            // 催化剂路径不消耗卡片
            vec![]
        } else {
            match build_consumption_plan(&craftable) {
                Some(plan) => plan,
                None => {
                    txn.rollback().await?;
                    return Ok(CraftResponse {
                        success: false,
                        card: None,
                        message: format!(
                            "Crafting requires {YEAR_UNITS_REQUIRED} year cards, \
                             {SPECIAL_UNITS_REQUIRED} special cards and \
                             {SIGNATURE_UNITS_REQUIRED} signature card (unlocked)."
                        ),
                        consumed: vec![],
                    });
                }
            }
        };

        // Consuming (标准路径)
        if !plan.is_empty() {
            self.inventory.consume(&txn, &user_id, &plan).await?;
        }

        // Rolling
        let success = {
            let mut rng = rand::thread_rng();
            rng.gen_bool(CRAFT_SUCCESS_RATE)
        };

        // Awarding
        let awarded = if success {
            let prestige_pool = self.catalog.prestige_cards(&txn).await?;
            let selected = {
                let mut rng = rand::thread_rng();
                pick_prestige(&mut rng, &prestige_pool).cloned()
            };
            let card = selected.ok_or_else(|| {
                AppError::InternalError("No prestige cards configured in catalog".to_string())
            })?;
            self.inventory
                .add_card(&txn, &user_id, &card.id, AcquiredVia::Craft)
                .await?;
            Some(card)
        } else {
            None
        };

        ledger::ActiveModel {
            user_id: Set(user_id.clone()),
            card_id: Set(awarded.as_ref().map(|c| c.id.clone())),
            kind: Set(LedgerKind::Craft),
            success: Set(success),
            consumed: Set(Some(serde_json::to_string(&plan)?)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        self.stats
            .record_craft_outcome(&txn, &user_id, success)
            .await?;
        self.stats.recompute_rarity_counters(&txn, &user_id).await?;

        txn.commit().await?;

        let message = match (&awarded, use_material_path) {
            (Some(card), _) => format!("The stars aligned! You crafted {}!", card.display_name),
            (None, true) => {
                "The craft failed, but your material card was not consumed.".to_string()
            }
            (None, false) => "The craft failed and the consumed cards were lost.".to_string(),
        };

        Ok(CraftResponse {
            success,
            card: awarded.map(|c| CardView::from_card(&c, self.catalog.placeholder_ref())),
            message,
            consumed: plan,
        })
    }

    /// 载入参与合成结算的库存行 (卡片需 craft_eligible; 锁定状态原样带出)
    async fn load_craftable_entries<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> AppResult<Vec<CraftableEntry>> {
        let entries = self.inventory.entries_for_user(db, user_id).await?;

        let ids: Vec<String> = entries.iter().map(|e| e.card_id.clone()).collect();
        let card_map: HashMap<String, cards::Model> = self
            .catalog
            .cards_by_ids(db, &ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut craftable = Vec::new();
        for entry in entries {
            if entry.quantity <= 0 {
                continue;
            }
            let card = card_map
                .get(&entry.card_id)
                .ok_or_else(|| AppError::UnknownCard(entry.card_id.clone()))?;
            if !card.craft_eligible {
                continue;
            }
            craftable.push(CraftableEntry {
                card_id: entry.card_id,
                card_type: card.card_type,
                quantity: entry.quantity,
                locked: entry.locked,
            });
        }
        Ok(craftable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CardRarity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(card_id: &str, card_type: CardType, quantity: i32) -> CraftableEntry {
        CraftableEntry {
            card_id: card_id.to_string(),
            card_type,
            quantity,
            locked: false,
        }
    }

    fn locked_entry(card_id: &str, card_type: CardType, quantity: i32) -> CraftableEntry {
        CraftableEntry {
            locked: true,
            ..entry(card_id, card_type, quantity)
        }
    }

    fn prestige(id: &str, owner: Option<&str>) -> cards::Model {
        cards::Model {
            id: id.to_string(),
            display_name: id.to_string(),
            card_type: CardType::Prestige,
            rarity: CardRarity::Legendary,
            owner_tag: owner.map(|s| s.to_string()),
            year: None,
            period: None,
            drop_weight: 0,
            craft_eligible: false,
            image_ref: Some(format!("cards/{id}.webp")),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_exact_recipe_builds_plan() {
        // 正好 7 year + 3 special + 1 signature: 永远能进入掷骰阶段
        let entries = vec![
            entry("haru_year_2024_h1", CardType::Year, 4),
            entry("mina_year_2024_h1", CardType::Year, 3),
            entry("special_anniv_2024", CardType::Special, 3),
            entry("haru_sig_2024", CardType::Signature, 1),
        ];

        let plan = build_consumption_plan(&entries).expect("plan");
        let total_year: i32 = plan
            .iter()
            .filter(|c| c.card_id.contains("year"))
            .map(|c| c.quantity)
            .sum();
        let total_special: i32 = plan
            .iter()
            .filter(|c| c.card_id.starts_with("special"))
            .map(|c| c.quantity)
            .sum();
        let total_sig: i32 = plan
            .iter()
            .filter(|c| c.card_id.contains("sig"))
            .map(|c| c.quantity)
            .sum();

        assert_eq!(total_year, YEAR_UNITS_REQUIRED);
        assert_eq!(total_special, SPECIAL_UNITS_REQUIRED);
        assert_eq!(total_sig, SIGNATURE_UNITS_REQUIRED);
    }

    #[test]
    fn test_plan_drains_in_ascending_card_id_order() {
        let entries = vec![
            entry("yuna_year_2024_h1", CardType::Year, 10),
            entry("haru_year_2024_h1", CardType::Year, 10),
            entry("special_anniv_2024", CardType::Special, 5),
            entry("haru_sig_2024", CardType::Signature, 2),
        ];

        let plan = build_consumption_plan(&entries).expect("plan");
        // haru 在前: 7 张 year 全部从 haru 抽取
        assert_eq!(
            plan[0],
            ConsumedCard {
                card_id: "haru_year_2024_h1".to_string(),
                quantity: 7
            }
        );
        // signature 恰好 1 张
        assert!(plan
            .iter()
            .any(|c| c.card_id == "haru_sig_2024" && c.quantity == 1));
    }

    #[test]
    fn test_plan_is_deterministic_for_snapshot() {
        let entries = vec![
            entry("mina_year_2024_h1", CardType::Year, 5),
            entry("haru_year_2024_h1", CardType::Year, 5),
            entry("special_anniv_2024", CardType::Special, 3),
            entry("mina_sig_2024", CardType::Signature, 1),
        ];
        let a = build_consumption_plan(&entries).expect("plan");
        let reversed: Vec<CraftableEntry> = entries.iter().rev().cloned().collect();
        let b = build_consumption_plan(&reversed).expect("plan");
        assert_eq!(a, b);
    }

    #[test]
    fn test_insufficient_materials_rejected() {
        // 6 year 卡不够
        let entries = vec![
            entry("haru_year_2024_h1", CardType::Year, 6),
            entry("special_anniv_2024", CardType::Special, 3),
            entry("haru_sig_2024", CardType::Signature, 1),
        ];
        assert!(build_consumption_plan(&entries).is_none());

        // 缺 signature
        let entries = vec![
            entry("haru_year_2024_h1", CardType::Year, 7),
            entry("special_anniv_2024", CardType::Special, 3),
        ];
        assert!(build_consumption_plan(&entries).is_none());
    }

    #[test]
    fn test_material_cards_do_not_satisfy_standard_recipe() {
        let entries = vec![
            entry("material_stardust", CardType::Material, 20),
            entry("haru_sig_2024", CardType::Signature, 1),
        ];
        assert!(build_consumption_plan(&entries).is_none());
        assert!(has_material_catalyst(&entries));
    }

    #[test]
    fn test_material_catalyst_requires_positive_quantity() {
        let entries = vec![entry("material_stardust", CardType::Material, 0)];
        assert!(!has_material_catalyst(&entries));
        assert!(!has_material_catalyst(&[]));
    }

    #[test]
    fn test_locked_entries_never_selected() {
        // 锁定的 signature 卡数量足够也不参与, 配方无法凑齐
        let entries = vec![
            entry("haru_year_2024_h1", CardType::Year, 7),
            entry("special_anniv_2024", CardType::Special, 3),
            locked_entry("haru_sig_2024", CardType::Signature, 5),
        ];
        assert!(build_consumption_plan(&entries).is_none());

        // 锁定行存在时从未锁定的行抽取
        let entries = vec![
            locked_entry("haru_year_2024_h1", CardType::Year, 7),
            entry("mina_year_2024_h1", CardType::Year, 7),
            entry("special_anniv_2024", CardType::Special, 3),
            entry("mina_sig_2024", CardType::Signature, 1),
        ];
        let plan = build_consumption_plan(&entries).expect("plan");
        assert!(plan.iter().all(|c| c.card_id != "haru_year_2024_h1"));
    }

    #[test]
    fn test_locked_material_is_not_a_catalyst() {
        let entries = vec![locked_entry("material_stardust", CardType::Material, 3)];
        assert!(!has_material_catalyst(&entries));
    }

    #[test]
    fn test_craft_success_rate_converges() {
        // 10000 次掷骰成功率收敛到 0.70 (±0.02)
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 10_000;
        let successes = (0..trials)
            .filter(|_| rng.gen_bool(CRAFT_SUCCESS_RATE))
            .count();
        let rate = successes as f64 / trials as f64;
        assert!((rate - CRAFT_SUCCESS_RATE).abs() < 0.02, "rate off: {rate}");
    }

    #[test]
    fn test_prestige_personal_rate_converges() {
        let pool = vec![
            prestige("prestige_aurora", None),
            prestige("prestige_haru", Some("haru")),
            prestige("prestige_mina", Some("mina")),
        ];

        let mut rng = StdRng::seed_from_u64(7);
        let trials = 10_000;
        let personal_hits = (0..trials)
            .filter(|_| {
                pick_prestige(&mut rng, &pool)
                    .expect("prestige")
                    .owner_tag
                    .is_some()
            })
            .count();
        let rate = personal_hits as f64 / trials as f64;
        assert!(
            (rate - PERSONAL_PRESTIGE_RATE).abs() < 0.02,
            "personal rate off: {rate}"
        );
    }

    #[test]
    fn test_prestige_fallbacks() {
        let mut rng = StdRng::seed_from_u64(1);

        // 目录里没有 prestige 卡
        assert!(pick_prestige(&mut rng, &[]).is_none());

        // 只有团体卡: 永远发团体卡
        let group_only = vec![prestige("prestige_aurora", None)];
        for _ in 0..20 {
            assert_eq!(
                pick_prestige(&mut rng, &group_only).expect("prestige").id,
                "prestige_aurora"
            );
        }

        // 只有个人卡: 退回个人卡
        let personal_only = vec![prestige("prestige_haru", Some("haru"))];
        assert_eq!(
            pick_prestige(&mut rng, &personal_only).expect("prestige").id,
            "prestige_haru"
        );
    }
}

use crate::entities::{card_ledger_entity as ledger, AcquiredVia, LedgerKind};
use crate::error::{AppError, AppResult};
use crate::models::{CardView, DropResponse};
use crate::services::catalog_service::DropCandidate;
use crate::services::stats_service::{remaining_in_window, MAX_DROPS_PER_WINDOW};
use crate::services::{CatalogService, InventoryService, StatsService};
use crate::utils::resolve_user_key;
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};

/// 掉落池中按权重随机选卡
/// 合计权重为 0 时退化为等概率; 否则取 r ∈ [0, total) 做累计扫描。
/// 池的顺序在同一目录快照下稳定, 配合种子 RNG 结果可复现
pub fn pick_weighted<'a, R: Rng>(rng: &mut R, pool: &'a [DropCandidate]) -> &'a DropCandidate {
    let total: i64 = pool.iter().map(|c| c.weight.max(0)).sum();
    if total <= 0 {
        return &pool[rng.gen_range(0..pool.len())];
    }

    let pick = rng.gen_range(0..total);
    let mut acc = 0i64;
    for candidate in pool {
        acc += candidate.weight.max(0);
        if pick < acc {
            return candidate;
        }
    }
    // r < total 恒成立, 扫描必然命中; 这里仅为类型完备
    pool.last().expect("non-empty pool")
}

#[derive(Clone)]
pub struct DropService {
    pool: DatabaseConnection,
    catalog: CatalogService,
    inventory: InventoryService,
    stats: StatsService,
}

impl DropService {
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

    /// 执行一次掉落
    ///
    /// 逻辑:
    /// 1. 解析用户标识, 确保统计行存在, 失效窗口先重置
    /// 2. 窗口名额用尽直接拒绝 (无副作用)
    /// 3. 取归并后的掉落池 (为空时重建目录一次)
    /// 4. 守卫式原子占用名额 (并发下只有一个请求能拿到最后一个名额)
    /// 5. 按权重随机选卡, 入库存, 写流水, 重算稀有度计数
    /// 全部变更在同一事务内, 任一步失败整体回滚
    pub async fn perform_drop(&self, raw_user: &str) -> AppResult<DropResponse> {
        let user_id = resolve_user_key(raw_user);

        let txn = self.pool.begin().await?;

        let stats = self.stats.ensure_stats(&txn, &user_id).await?;
        let stats = self.stats.refresh_window(&txn, stats, Utc::now()).await?;

        if remaining_in_window(&stats) <= 0 {
            txn.rollback().await?;
            return Ok(DropResponse {
                success: false,
                card: None,
                message: format!(
                    "You have used all {MAX_DROPS_PER_WINDOW} drops in this window. Come back later!"
                ),
                remaining_drops: 0,
            });
        }

        let candidates = self.catalog.drop_candidates_with_repair(&txn).await?;
        if candidates.is_empty() {
            txn.rollback().await?;
            return Err(AppError::NoCandidates(
                "No droppable cards in the catalog, even after resync".to_string(),
            ));
        }

        // 名额占用是最终闸门: 上面的余量检查只是快速路径
        if !self.stats.take_drop_slot(&txn, &user_id).await? {
            txn.rollback().await?;
            return Ok(DropResponse {
                success: false,
                card: None,
                message: format!(
                    "You have used all {MAX_DROPS_PER_WINDOW} drops in this window. Come back later!"
                ),
                remaining_drops: 0,
            });
        }

        let selected = {
            let mut rng = rand::thread_rng();
            pick_weighted(&mut rng, &candidates).card.clone()
        };

        self.inventory
            .add_card(&txn, &user_id, &selected.id, AcquiredVia::Drop)
            .await?;

        ledger::ActiveModel {
            user_id: Set(user_id.clone()),
            card_id: Set(Some(selected.id.clone())),
            kind: Set(LedgerKind::Drop),
            success: Set(true),
            consumed: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        self.stats.recompute_rarity_counters(&txn, &user_id).await?;

        let remaining_after = remaining_in_window(&stats) - 1;

        txn.commit().await?;

        let card = CardView::from_card(&selected, self.catalog.placeholder_ref());
        Ok(DropResponse {
            success: true,
            message: format!("You got {} ({})!", card.display_name, card.rarity),
            card: Some(card),
            remaining_drops: remaining_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{card_entity as cards, CardRarity, CardType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn candidate(id: &str, weight: i64) -> DropCandidate {
        DropCandidate {
            card: cards::Model {
                id: id.to_string(),
                display_name: id.to_string(),
                card_type: CardType::Year,
                rarity: CardRarity::Basic,
                owner_tag: None,
                year: None,
                period: None,
                drop_weight: weight as i32,
                craft_eligible: true,
                image_ref: Some(format!("cards/{id}.webp")),
                created_at: None,
                updated_at: None,
            },
            weight,
        }
    }

    #[test]
    fn test_weighted_ratio_converges() {
        // 权重 [1,1,2], 3000 次采样应接近 1:1:2 (±10%)
        let pool = vec![candidate("a", 1), candidate("b", 1), candidate("c", 2)];
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 3000;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for _ in 0..trials {
            let picked = pick_weighted(&mut rng, &pool);
            *counts.entry(picked.card.id.clone()).or_insert(0) += 1;
        }

        let a = counts["a"] as f64 / trials as f64;
        let b = counts["b"] as f64 / trials as f64;
        let c = counts["c"] as f64 / trials as f64;
        assert!((a - 0.25).abs() < 0.025, "a ratio off: {a}");
        assert!((b - 0.25).abs() < 0.025, "b ratio off: {b}");
        assert!((c - 0.50).abs() < 0.05, "c ratio off: {c}");
    }

    #[test]
    fn test_zero_total_weight_falls_back_to_uniform() {
        let pool = vec![candidate("a", 0), candidate("b", 0)];
        let mut rng = StdRng::seed_from_u64(7);

        let mut counts: HashMap<String, i64> = HashMap::new();
        for _ in 0..2000 {
            let picked = pick_weighted(&mut rng, &pool);
            *counts.entry(picked.card.id.clone()).or_insert(0) += 1;
        }

        let a = counts["a"] as f64 / 2000.0;
        assert!((a - 0.5).abs() < 0.05, "uniform fallback off: {a}");
    }

    #[test]
    fn test_selection_is_reproducible_with_seed() {
        let pool = vec![candidate("a", 3), candidate("b", 5), candidate("c", 2)];

        let picks_1: Vec<String> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..50)
                .map(|_| pick_weighted(&mut rng, &pool).card.id.clone())
                .collect()
        };
        let picks_2: Vec<String> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..50)
                .map(|_| pick_weighted(&mut rng, &pool).card.id.clone())
                .collect()
        };

        assert_eq!(picks_1, picks_2);
    }

    #[test]
    fn test_single_candidate_always_selected() {
        let pool = vec![candidate("only", 10)];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(pick_weighted(&mut rng, &pool).card.id, "only");
        }
    }
}

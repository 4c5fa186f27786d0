use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

/// Cards (卡片目录表)
#[derive(DeriveIden)]
enum Cards {
    Table,
    Id,
    DisplayName,
    CardType,
    Rarity,
    OwnerTag,
    Year,
    Period,
    DropWeight,
    CraftEligible,
    ImageRef,
    CreatedAt,
    UpdatedAt,
}

/// User Stats (用户收集统计表)
#[derive(DeriveIden)]
enum UserStats {
    Table,
    UserId,
    WindowStart,
    DropsUsedInWindow,
    TotalDropsUsed,
    TotalCardsCollected,
    CraftingAttempts,
    SuccessfulCrafts,
    FailedCrafts,
    BasicCards,
    RareCards,
    EpicCards,
    LegendaryCards,
    MaterialCards,
    CreatedAt,
    UpdatedAt,
}

/// Inventory Entries (用户库存表)
#[derive(DeriveIden)]
enum InventoryEntries {
    Table,
    Id,
    UserId,
    CardId,
    Quantity,
    Locked,
    AcquiredVia,
    AcquiredAt,
}

/// Card Ledger (掉落/合成流水表, 仅追加)
#[derive(DeriveIden)]
enum CardLedger {
    Table,
    Id,
    UserId,
    CardId,
    Kind,
    Success,
    Consumed,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 掉落权重为相对值, 同组变体的权重在查询端合并
/// 初始目录 (英文 id, 中文仅注释说明):
/// - year 卡: 每位成员 2024 上/下半期, basic, 权重 50 (部分含第二版式变体)
/// - signature 卡: 每位成员 2024, epic, 权重 5
/// - special 卡: 周年/演唱会纪念, rare, 权重 20
/// - material 卡: 星尘催化剂, material, 权重 10, 可重复使用不消耗
/// - prestige 卡: 团体卡 + 各成员个人卡, legendary, 权重 0 (仅合成产出)
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 枚举类型
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("card_type"))
                    .values(vec![
                        Alias::new("year"),
                        Alias::new("signature"),
                        Alias::new("special"),
                        Alias::new("material"),
                        Alias::new("prestige"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("card_rarity"))
                    .values(vec![
                        Alias::new("basic"),
                        Alias::new("rare"),
                        Alias::new("epic"),
                        Alias::new("legendary"),
                        Alias::new("material"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("acquired_via"))
                    .values(vec![
                        Alias::new("drop"),
                        Alias::new("craft"),
                        Alias::new("gift"),
                        Alias::new("admin"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("ledger_kind"))
                    .values(vec![Alias::new("drop"), Alias::new("craft")])
                    .to_owned(),
            )
            .await?;

        // 卡片目录表
        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cards::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Cards::DisplayName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cards::CardType)
                            .custom(Alias::new("card_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cards::Rarity)
                            .custom(Alias::new("card_rarity"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Cards::OwnerTag).string_len(64).null())
                    .col(ColumnDef::new(Cards::Year).integer().null())
                    .col(ColumnDef::new(Cards::Period).string_len(8).null())
                    .col(
                        ColumnDef::new(Cards::DropWeight)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Cards::CraftEligible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Cards::ImageRef).string_len(255).null())
                    .col(
                        ColumnDef::new(Cards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Cards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 掉落池查询索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_cards_type_weight")
                    .table(Cards::Table)
                    .col(Cards::CardType)
                    .col(Cards::DropWeight)
                    .to_owned(),
            )
            .await?;

        // 用户统计表 (user_id 为外部标识解析后的内部键)
        manager
            .create_table(
                Table::create()
                    .table(UserStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserStats::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserStats::WindowStart)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserStats::DropsUsedInWindow)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::TotalDropsUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::TotalCardsCollected)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::CraftingAttempts)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::SuccessfulCrafts)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::FailedCrafts)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::BasicCards)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::RareCards)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::EpicCards)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::LegendaryCards)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::MaterialCards)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserStats::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(UserStats::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 库存表
        manager
            .create_table(
                Table::create()
                    .table(InventoryEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::CardId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::Locked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::AcquiredVia)
                            .custom(Alias::new("acquired_via"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::AcquiredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // (user_id, card_id) 唯一 (重复获得走 quantity 递增)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_user_card_unique")
                    .table(InventoryEntries::Table)
                    .col(InventoryEntries::UserId)
                    .col(InventoryEntries::CardId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 库存卡片外键
        manager
            .alter_table(
                Table::alter()
                    .table(InventoryEntries::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_inventory_entry_card")
                            .from_tbl(InventoryEntries::Table)
                            .from_col(InventoryEntries::CardId)
                            .to_tbl(Cards::Table)
                            .to_col(Cards::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 流水表
        manager
            .create_table(
                Table::create()
                    .table(CardLedger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CardLedger::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CardLedger::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CardLedger::CardId).string_len(64).null())
                    .col(
                        ColumnDef::new(CardLedger::Kind)
                            .custom(Alias::new("ledger_kind"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardLedger::Success)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(CardLedger::Consumed).text().null())
                    .col(
                        ColumnDef::new(CardLedger::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 用户流水查询索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_card_ledger_user")
                    .table(CardLedger::Table)
                    .col(CardLedger::UserId)
                    .to_owned(),
            )
            .await?;

        // 初始卡片目录
        // 注意: haru 2024 上半期 year 卡带第二版式 (v2), 两行在掉落端合并为一个候选
        let conn = manager.get_connection();
        let insert_sql = r#"
INSERT INTO cards (id, display_name, card_type, rarity, owner_tag, year, period, drop_weight, craft_eligible, image_ref)
VALUES
 ('haru_year_2024_h1',    'Haru 2024 First Half',    'year',      'basic',     'haru', 2024, 'h1', 50, TRUE, 'cards/haru_year_2024_h1.webp'),
 ('haru_year_2024_h1_v2', 'Haru 2024 First Half',    'year',      'basic',     'haru', 2024, 'h1', 30, TRUE, 'cards/haru_year_2024_h1_v2.webp'),
 ('haru_year_2024_h2',    'Haru 2024 Second Half',   'year',      'basic',     'haru', 2024, 'h2', 50, TRUE, 'cards/haru_year_2024_h2.webp'),
 ('mina_year_2024_h1',    'Mina 2024 First Half',    'year',      'basic',     'mina', 2024, 'h1', 50, TRUE, 'cards/mina_year_2024_h1.webp'),
 ('mina_year_2024_h2',    'Mina 2024 Second Half',   'year',      'basic',     'mina', 2024, 'h2', 50, TRUE, 'cards/mina_year_2024_h2.webp'),
 ('sora_year_2024_h1',    'Sora 2024 First Half',    'year',      'basic',     'sora', 2024, 'h1', 50, TRUE, 'cards/sora_year_2024_h1.webp'),
 ('sora_year_2024_h2',    'Sora 2024 Second Half',   'year',      'basic',     'sora', 2024, 'h2', 50, TRUE, 'cards/sora_year_2024_h2.webp'),
 ('yuna_year_2024_h1',    'Yuna 2024 First Half',    'year',      'basic',     'yuna', 2024, 'h1', 50, TRUE, 'cards/yuna_year_2024_h1.webp'),
 ('yuna_year_2024_h2',    'Yuna 2024 Second Half',   'year',      'basic',     'yuna', 2024, 'h2', 50, TRUE, 'cards/yuna_year_2024_h2.webp'),
 ('haru_sig_2024',        'Haru Signature 2024',     'signature', 'epic',      'haru', 2024, NULL,  5, TRUE, 'cards/haru_sig_2024.webp'),
 ('mina_sig_2024',        'Mina Signature 2024',     'signature', 'epic',      'mina', 2024, NULL,  5, TRUE, 'cards/mina_sig_2024.webp'),
 ('sora_sig_2024',        'Sora Signature 2024',     'signature', 'epic',      'sora', 2024, NULL,  5, TRUE, 'cards/sora_sig_2024.webp'),
 ('yuna_sig_2024',        'Yuna Signature 2024',     'signature', 'epic',      'yuna', 2024, NULL,  5, TRUE, 'cards/yuna_sig_2024.webp'),
 ('special_anniv_2024',   '5th Anniversary',         'special',   'rare',      NULL,   2024, NULL, 20, TRUE, 'cards/special_anniv_2024.webp'),
 ('special_concert_2024', 'Aurora Night Concert',    'special',   'rare',      NULL,   2024, NULL, 20, TRUE, 'cards/special_concert_2024.webp'),
 ('material_stardust',    'Stardust Catalyst',       'material',  'material',  NULL,   NULL, NULL, 10, TRUE, 'cards/material_stardust.webp'),
 ('prestige_aurora',      'Aurora Group Prestige',   'prestige',  'legendary', NULL,   NULL, NULL,  0, FALSE, 'cards/prestige_aurora.webp'),
 ('prestige_haru',        'Haru Prestige',           'prestige',  'legendary', 'haru', NULL, NULL,  0, FALSE, 'cards/prestige_haru.webp'),
 ('prestige_mina',        'Mina Prestige',           'prestige',  'legendary', 'mina', NULL, NULL,  0, FALSE, 'cards/prestige_mina.webp'),
 ('prestige_sora',        'Sora Prestige',           'prestige',  'legendary', 'sora', NULL, NULL,  0, FALSE, 'cards/prestige_sora.webp'),
 ('prestige_yuna',        'Yuna Prestige',           'prestige',  'legendary', 'yuna', NULL, NULL,  0, FALSE, 'cards/prestige_yuna.webp')
ON CONFLICT (id) DO NOTHING;
"#;
        conn.execute(Statement::from_string(
            manager.get_database_backend(),
            insert_sql.to_string(),
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序: 流水 -> 库存 -> 统计 -> 目录 -> 枚举类型
        manager
            .drop_table(Table::drop().if_exists().table(CardLedger::Table).to_owned())
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(InventoryEntries::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(UserStats::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Cards::Table).to_owned())
            .await?;

        for ty in ["ledger_kind", "acquired_via", "card_rarity", "card_type"] {
            manager
                .drop_type(Type::drop().if_exists().name(Alias::new(ty)).to_owned())
                .await?;
        }

        Ok(())
    }
}

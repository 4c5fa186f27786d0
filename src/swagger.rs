use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{AcquiredVia, CardRarity, CardType, LedgerKind};
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cards::drop_card,
        handlers::cards::craft_card,
        handlers::cards::get_inventory,
        handlers::cards::get_remaining_drops,
        handlers::cards::get_stats,
        handlers::cards::get_ledger,
        handlers::cards::get_drop_pool,
        handlers::cards::resync_catalog,
    ),
    components(schemas(
        CardView,
        CardType,
        CardRarity,
        AcquiredVia,
        LedgerKind,
        DropResponse,
        RemainingDropsResponse,
        CraftRequest,
        CraftResponse,
        ConsumedCard,
        InventoryQuery,
        InventoryEntryResponse,
        LedgerQuery,
        LedgerRecordResponse,
        UserStatsResponse,
        OwnedByRarity,
        DropPoolEntry,
        CatalogResyncResponse,
    )),
    tags(
        (name = "cards", description = "卡片掉落 / 合成 / 库存")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}

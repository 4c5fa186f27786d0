use crate::models::*;
use crate::services::{
    CatalogService, CraftService, DropService, InventoryService, LedgerService, StatsService,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// 从请求头取外部用户标识 (鉴权由站点网关处理, 这里只拿标识)
/// 缺失时为空串, 解析端会落到固定的访客键
fn get_user_id_from_request(req: &HttpRequest) -> String {
    req.headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[utoipa::path(
    post,
    path = "/cards/drop",
    tag = "cards",
    responses(
        (status = 200, description = "掉落结果 (含限流拒绝)", body = DropResponse)
    )
)]
/// 进行一次卡片掉落:
/// 1. 检查24小时窗口剩余次数 (满5次拒绝)
/// 2. 在归并后的掉落池中按权重随机选卡
/// 3. 入库存 / 写流水 / 更新统计, 同一事务提交
pub async fn drop_card(
    service: web::Data<DropService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    match service.perform_drop(&user_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cards/craft",
    tag = "cards",
    request_body = CraftRequest,
    responses(
        (status = 200, description = "合成结果 (含材料不足拒绝)", body = CraftResponse)
    )
)]
/// 进行一次合成:
/// - 标准路径: 消耗 7 year + 3 special + 1 signature, 成败都扣
/// - material 路径: 持有未锁定 material 卡即可, 不消耗
/// 成功以 0.70 概率判定, 奖励为 prestige 卡
pub async fn craft_card(
    service: web::Data<CraftService>,
    req: HttpRequest,
    body: web::Json<CraftRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    match service.craft(&user_id, body.use_material_path).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cards/inventory",
    tag = "cards",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "获取库存成功", body = PaginatedResponse<InventoryEntryResponse>)
    )
)]
/// 分页获取用户库存 (最近获得优先, 已连接卡片信息)
pub async fn get_inventory(
    service: web::Data<InventoryService>,
    req: HttpRequest,
    query: web::Query<InventoryQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    let params = PaginationParams::new(query.page, query.per_page);
    match service.list_inventory(&user_id, &params).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cards/drops/remaining",
    tag = "cards",
    responses(
        (status = 200, description = "当前窗口剩余掉落次数", body = RemainingDropsResponse)
    )
)]
/// 获取当前窗口剩余掉落次数 (失效窗口先重置)
pub async fn get_remaining_drops(
    service: web::Data<StatsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    match service.remaining_drops(&user_id).await {
        Ok(remaining) => {
            let data = RemainingDropsResponse { remaining };
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cards/stats",
    tag = "cards",
    responses(
        (status = 200, description = "用户收集统计", body = UserStatsResponse)
    )
)]
/// 获取用户收集统计 (累计掉落/合成计数, 按稀有度持有数量)
pub async fn get_stats(
    service: web::Data<StatsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    match service.get_user_stats(&user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cards/ledger",
    tag = "cards",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "掉落/合成流水", body = PaginatedResponse<LedgerRecordResponse>)
    )
)]
/// 分页获取掉落/合成流水 (倒序)
pub async fn get_ledger(
    service: web::Data<LedgerService>,
    req: HttpRequest,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req);
    let params = PaginationParams::new(query.page, query.per_page);
    match service.list_records(&user_id, &params).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cards/pool",
    tag = "cards",
    responses(
        (status = 200, description = "当前掉落池 (已归并, 含合计权重)", body = [DropPoolEntry])
    )
)]
/// 获取当前掉落池 (同组变体已合并; 目录未初始化时回退到兜底卡)
pub async fn get_drop_pool(service: web::Data<CatalogService>) -> Result<HttpResponse> {
    match service.list_drop_candidates().await {
        Ok(pool) => {
            let list: Vec<DropPoolEntry> = pool
                .iter()
                .map(|c| DropPoolEntry {
                    card: CardView::from_card(&c.card, service.placeholder_ref()),
                    weight: c.weight,
                })
                .collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cards/catalog/resync",
    tag = "cards",
    responses(
        (status = 200, description = "目录重建完成", body = CatalogResyncResponse)
    )
)]
/// 从素材源重建卡片目录 (幂等, 已存在的卡跳过)
pub async fn resync_catalog(service: web::Data<CatalogService>) -> Result<HttpResponse> {
    match service.resync_from_assets().await {
        Ok(upserted) => {
            let data = CatalogResyncResponse { upserted };
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn cards_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cards")
            .route("/drop", web::post().to(drop_card))
            .route("/craft", web::post().to(craft_card))
            .route("/pool", web::get().to(get_drop_pool))
            .route("/inventory", web::get().to(get_inventory))
            .route("/drops/remaining", web::get().to(get_remaining_drops))
            .route("/stats", web::get().to(get_stats))
            .route("/ledger", web::get().to(get_ledger))
            .route("/catalog/resync", web::post().to(resync_catalog)),
    );
}

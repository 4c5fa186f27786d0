use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use fancard_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::AssetCatalogApi,
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建外部服务
    let asset_api = AssetCatalogApi::new(config.assets.clone());

    // 创建服务
    let catalog_service = CatalogService::new(pool.clone(), asset_api);
    let inventory_service = InventoryService::new(pool.clone(), catalog_service.clone());
    let stats_service = StatsService::new(pool.clone());
    let drop_service = DropService::new(
        pool.clone(),
        catalog_service.clone(),
        inventory_service.clone(),
        stats_service.clone(),
    );
    let craft_service = CraftService::new(
        pool.clone(),
        catalog_service.clone(),
        inventory_service.clone(),
        stats_service.clone(),
    );
    let ledger_service = LedgerService::new(pool.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(inventory_service.clone()))
            .app_data(web::Data::new(stats_service.clone()))
            .app_data(web::Data::new(drop_service.clone()))
            .app_data(web::Data::new(craft_service.clone()))
            .app_data(web::Data::new(ledger_service.clone()))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::cards_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

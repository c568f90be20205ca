use actix_web::{App, HttpServer, middleware, web};

use aidline::config::AppConfig;
use aidline::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = AppConfig::from_env();

    if let Some(parent) = std::path::Path::new(&cfg.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("Failed to create data directory");
        }
    }

    let pool = db::init_pool(&cfg.database_path);
    db::run_migrations(&pool);

    // One shared outbound client; its timeout bounds every model call.
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.llm_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");

    match &cfg.llm.api_key {
        Some(_) => log::info!(
            "Draft generation: model {} with heuristic fallback",
            cfg.llm.model
        ),
        None => log::info!("Draft generation: heuristic fallback only (no GEMINI_API_KEY)"),
    }

    log::info!("Starting server at http://{}", cfg.bind_addr);

    let bind_addr = cfg.bind_addr.clone();
    let llm = cfg.llm.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(http.clone()))
            .app_data(web::Data::new(llm.clone()))
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}

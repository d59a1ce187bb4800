use actix_web::{web, App, HttpServer};
use lorapaint::{
    logger::{self, LoggerConfig},
    server, Config, PipelineCoordinator,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_config_info(&config);

    let coordinator = match PipelineCoordinator::from_config(&config).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            log::error!("❌ Failed to initialize pipeline services: {}", e);
            return Err(e.into());
        }
    };

    let host = config.host.clone();
    let port = config.port_or_default();
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &host, port);

    let data = web::Data::new(coordinator);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(server::configure))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    Ok(())
}

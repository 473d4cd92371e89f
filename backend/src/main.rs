mod config;
mod error;
mod handlers;
mod models;
mod services;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use services::market_data::MarketDataService;
use services::price_poller::PricePoller;
use services::session_manager::SessionManager;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info,actix_server=info")),
        )
        .init();

    let config = Config::from_env();

    let market_service = Arc::new(MarketDataService::new(&config));
    let poller = Arc::new(PricePoller::new(
        market_service,
        config.price_symbol.clone(),
        config.fallback_base_price,
        config.poll_interval,
    ));
    let manager = Arc::new(SessionManager::new(poller.subscribe(), config.clone()));

    tokio::spawn(poller.clone().start_background_task());
    tokio::spawn(manager.clone().start_tick_listener());

    info!("Server starting at {}", config.server_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(manager.clone()))
            .configure(handlers::market_handler::config)
            .configure(handlers::simulation_handler::config)
    })
    .bind(&config.server_addr)?
    .run()
    .await?;

    Ok(())
}

#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;

use actix_web::{App, HttpServer, web};

mod error;
mod routes;
mod state;

use error::AppError;
use logger::init_tracing;
use state::AppState;
use tracing::info;
use uptime_engine::Engine;
use uptime_engine::config::Config;

/// Optional override for the engine's config file location
const CONFIG_PATH_VAR: &str = "UPTIME_ENGINE_CONFIG";

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut config = Config::from_config(std::env::var_os(CONFIG_PATH_VAR))?;
    config.apply_env();

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let engine = Engine::open(&config).await?;
    let state = web::Data::new(AppState::new(engine, config.server.cron_secret.clone()));

    run_server(addr, state).await
}

async fn run_server(addr: SocketAddr, state: web::Data<AppState>) -> Result<(), AppError> {
    info!(%addr, "Starting HTTP trigger");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}

mod admission;
mod auth;
mod bookings;
mod catalog;
mod config;
mod contacts;
mod db;
mod error;
mod models;
mod routes;
mod schedule;
mod slots;
mod state;

use actix_web::{middleware, web, App, HttpServer};

use crate::{config::AppConfig, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = AppConfig::from_env();
    db::ensure_sqlite_dir(&config.database_url)?;

    let pool = db::connect(&config).await?;
    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool, &config).await?;

    let state = AppState::new(pool);

    let address = config.bind_address();
    log::info!("Starting Salonbook on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::public::configure)
            .configure(routes::account::configure)
            .configure(routes::admin::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::time::Duration;

mod api;
mod auth;
mod calendar;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod notifications;
mod queue;
mod report;
mod routes;
mod scheduler;
mod settings;
mod utils;
mod weekly_hours;
mod workday;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::notifications::build_notifier;
use crate::queue::start_long_queue;
use crate::routes::Limiters;
use crate::scheduler::Scheduler;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR Addon"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let notifier = build_notifier(config.smtp.as_ref())?;
    let queue = start_long_queue(pool.clone());

    Scheduler::new(
        pool.clone(),
        queue.clone(),
        notifier,
        Duration::from_secs(config.scheduler_tick_secs),
    )
    .spawn();

    let limiters = Limiters::from_config(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        let config_data = config.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(queue.clone()))
            .service(index)
            .configure(move |cfg| routes::configure(cfg, &config_data, limiters))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}

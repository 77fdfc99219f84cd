use std::sync::Arc;

use actix_easy_multipart::MultipartFormConfig;
use actix_web::web;
use colored::Colorize;
use tracing::{error, info};

use crate::api;
use crate::infrastructure::{build_config, telemetry::initialize_telemetry, ServiceProvider};

pub fn run() {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(x) => x,
        Err(e) => return eprintln!("{}: {}", "Cannot build runtime".red(), e),
    };
    runtime.block_on(async_run());
}

pub async fn async_run() {
    let config = match build_config() {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build config".red(), e);
        }
    };
    if let Err(e) = initialize_telemetry(&config.telemetry) {
        return eprintln!("{}: {}", "Cannot build logger".red(), e);
    };
    let service_provider = match ServiceProvider::build(config).await {
        Ok(x) => Arc::new(x),
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build Service Provider".red(), e);
        }
    };
    let reaper = service_provider.reaper().map(|reaper| {
        info!("Upload reaper started.");
        tokio::spawn(async move { reaper.run().await })
    });
    tokio::select! {
        _ = initialize_web_host(service_provider) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping services (ctrl-c handling).");
        }
    }
    if let Some(handle) = reaper {
        handle.abort();
    }
}

pub async fn initialize_web_host(sp: Arc<ServiceProvider>) {
    let host = sp.config().host.clone();
    let route = host.route();
    let limit = host.max_chunk_bytes;
    let upload_service = sp.upload_service();
    info!(
        address = %host.bind_address,
        port = host.bind_port,
        route = %route,
        upload_dir = %sp.config().storage.upload_dir().display(),
        "Starting web server."
    );
    let server = actix_web::HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_header()
            .allow_any_method()
            .max_age(86400);

        actix_web::App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(cors)
            .app_data(MultipartFormConfig::default().total_limit(limit))
            .app_data(web::PayloadConfig::new(limit))
            .app_data(web::Data::from(upload_service.clone()))
            .configure(|cfg| api::upload::routes(cfg, &route))
    })
    .bind((host.bind_address.to_owned(), host.bind_port));
    let server = match server {
        Ok(x) => x,
        Err(e) => return error!("Cannot bind {}:{}: {}", host.bind_address, host.bind_port, e),
    };
    match server.disable_signals().run().await {
        Ok(_) => info!("Web server stopped successfully."),
        Err(e) => error!("Web server into error: {}", e),
    }
}

mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
use dotenv::dotenv;
use std::io;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::state::AppState;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("❌ {}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    log::info!("🚀 Starting ASHA Health Service...");
    if config.jwt.secret == "default-secret-change-me" {
        log::warn!("⚠️  JWT_SECRET is not set, using the development default");
    }
    if config.email.api_url.is_none() {
        log::warn!("⚠️  EMAIL_API_URL is not set, OTP emails will only be logged");
    }

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url)
        .await
        .map_err(|e| startup_error("Failed to connect to MongoDB", e))?;
    if db.ping().await {
        log::info!("✅ MongoDB connected successfully");
    } else {
        log::warn!("⚠️  MongoDB did not answer ping, continuing anyway");
    }

    let bind_address = config.bind_address();
    let mut origins = config.cors_origins.clone();
    if !origins.contains(&config.frontend_url) {
        origins.push(config.frontend_url.clone());
    }

    let state = AppState::new(config, db).map_err(|e| startup_error("Failed to build application state", e))?;
    let state_data = web::Data::new(state);

    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    // Generate OpenAPI specification
    let openapi = api::swagger::ApiDoc::openapi();

    // Start HTTP server
    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ])
            .expose_headers(vec![header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(api::configure)
    })
    .bind(bind_address.as_str())?
    .run()
    .await
}

pub mod ai;
pub mod chats;
pub mod health;
pub mod patients;
pub mod swagger;
pub mod users;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, Error, HttpRequest};

use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

// JSON bodies carry base64 profile photos
const JSON_LIMIT: usize = 10 * 1024 * 1024;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    AppError::bad_request(format!("Invalid request body: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    AppError::bad_request(format!("Invalid query string: {}", err)).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> Error {
    AppError::bad_request(format!("Invalid path: {}", err)).into()
}

/// Registers every route. Shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Extractor failures use the same envelope as handler errors
        .app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Users: registration and sessions are public, the rest needs a JWT
        .service(
            web::scope("/users")
                .route("/send-otp", web::post().to(users::send_otp))
                .route("/verify-otp", web::post().to(users::verify_otp))
                .route("/login", web::post().to(users::login))
                .route("/google", web::post().to(users::google_login))
                .route("/refresh", web::post().to(users::refresh_token))
                .service(
                    web::resource("/complete-asha")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(users::complete_asha)),
                )
                .service(
                    web::resource("/create")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(users::create_user)),
                )
                .service(
                    web::resource("/get_user")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(users::get_user)),
                )
                .service(
                    web::resource("/logout")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(users::logout)),
                ),
        )
        // Patients: scoped to the registering ASHA worker
        .service(
            web::scope("/patients")
                .wrap(AuthMiddleware)
                .route("", web::post().to(patients::create_patient))
                .route("", web::get().to(patients::list_patients))
                .route("/{id}", web::get().to(patients::get_patient))
                .route("/{id}", web::put().to(patients::update_patient))
                .route("/{id}", web::delete().to(patients::delete_patient)),
        )
        // AI: proxied to the external model service
        .service(
            web::scope("/ai")
                .wrap(AuthMiddleware)
                .route("/predict", web::post().to(ai::predict))
                .route("/consultation", web::post().to(ai::consultation))
                .route("/lifestyle", web::post().to(ai::lifestyle))
                .route("/symptoms", web::get().to(ai::symptoms)),
        )
        // Chats
        .service(
            web::scope("/chats")
                .wrap(AuthMiddleware)
                .route("", web::post().to(chats::create_chat))
                .route("", web::get().to(chats::list_chats))
                .route("/{id}/messages", web::get().to(chats::get_messages))
                .route("/{id}/messages", web::post().to(chats::add_message))
                .route("/{id}", web::delete().to(chats::delete_chat)),
        );
}

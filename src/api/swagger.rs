use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ASHA Health Service API",
        version = "1.0.0",
        description = "Backend for ASHA community health workers.\n\n**Authentication:** endpoints other than health and sign-in require a JWT, sent as a Bearer token or the `token` cookie.\n\n**Features:**\n- Email OTP registration and Google sign-in\n- ASHA worker onboarding\n- Patient records with QR identity cards\n- AI symptom prediction and consultations\n- Chat history",
        contact(
            name = "ASHA Health Team",
            email = "support@asha-health.local"
        )
    ),
    paths(
        // Health
        crate::api::health::health_check,

        // Users
        crate::api::users::send_otp,
        crate::api::users::verify_otp,
        crate::api::users::login,
        crate::api::users::google_login,
        crate::api::users::refresh_token,
        crate::api::users::complete_asha,
        crate::api::users::create_user,
        crate::api::users::get_user,
        crate::api::users::logout,

        // Patients
        crate::api::patients::create_patient,
        crate::api::patients::list_patients,
        crate::api::patients::get_patient,
        crate::api::patients::update_patient,
        crate::api::patients::delete_patient,

        // AI
        crate::api::ai::predict,
        crate::api::ai::consultation,
        crate::api::ai::lifestyle,
        crate::api::ai::symptoms,

        // Chats
        crate::api::chats::create_chat,
        crate::api::chats::list_chats,
        crate::api::chats::get_messages,
        crate::api::chats::add_message,
        crate::api::chats::delete_chat,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,

            crate::services::auth_service::SendOtpRequest,
            crate::services::auth_service::SendOtpResponse,
            crate::services::auth_service::VerifyOtpRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::GoogleLoginRequest,
            crate::services::auth_service::RefreshTokenRequest,
            crate::services::auth_service::CreateUserRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::CompleteAshaResponse,
            crate::services::auth_service::CurrentUserResponse,
            crate::models::Role,
            crate::models::UserInfo,
            crate::models::GeoPoint,
            crate::models::CompleteAshaRequest,
            crate::models::AshaWorkerInfo,

            crate::models::CreatePatientRequest,
            crate::models::UpdatePatientRequest,
            crate::models::PatientResponse,
            crate::models::PatientListResponse,

            crate::models::MessageRole,
            crate::models::CreateChatRequest,
            crate::models::AddMessageRequest,
            crate::models::ChatResponse,
            crate::models::SectionResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness check."),
        (name = "Users", description = "Registration with email OTP, password and Google sign-in, ASHA onboarding and session management."),
        (name = "Patients", description = "Patient records owned by the registering ASHA worker, with profile photo and QR card."),
        (name = "AI", description = "Proxy to the AI service for symptom prediction, consultations and lifestyle advice."),
        (name = "Chats", description = "Conversation threads and their messages."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /users/login, /users/verify-otp or /users/google"))
                        .build(),
                ),
            );
        }
    }
}

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};

use crate::config::AppConfig;
use crate::middleware::auth::Claims;
use crate::models::{CompleteAshaRequest, UserInfo};
use crate::services::auth_service::{
    self, AuthResponse, CompleteAshaResponse, CreateUserRequest, CurrentUserResponse,
    GoogleLoginRequest, LoginRequest, RefreshTokenRequest, SendOtpRequest, SendOtpResponse,
    VerifyOtpRequest,
};
use crate::state::AppState;
use crate::utils::{response, AppError};

fn auth_cookie(config: &AppConfig, token: &str) -> Cookie<'static> {
    Cookie::build(config.auth_cookie_name.clone(), token.to_string())
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::minutes(config.jwt.access_ttl_minutes))
        .finish()
}

fn with_cookie(mut response: HttpResponse, cookie: &Cookie<'_>) -> Result<HttpResponse, AppError> {
    response
        .add_cookie(cookie)
        .map_err(|e| AppError::Internal(format!("Failed to set auth cookie: {}", e)))?;
    Ok(response)
}

fn signed_in(config: &AppConfig, message: &str, auth: AuthResponse) -> Result<HttpResponse, AppError> {
    let cookie = auth_cookie(config, &auth.token);
    with_cookie(response::ok(message, auth), &cookie)
}

#[utoipa::path(
    post,
    path = "/users/send-otp",
    tag = "Users",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP emailed", body = SendOtpResponse),
        (status = 400, description = "Invalid input or email already registered")
    )
)]
pub async fn send_otp(
    state: web::Data<AppState>,
    request: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📨 POST /users/send-otp - email: {}", request.email);
    let sent = auth_service::send_otp(&state, &request).await?;
    Ok(response::ok("OTP sent to your email", sent))
}

#[utoipa::path(
    post,
    path = "/users/verify-otp",
    tag = "Users",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified, tokens issued", body = AuthResponse),
        (status = 400, description = "Wrong, expired or already used OTP"),
        (status = 404, description = "No pending registration")
    )
)]
pub async fn verify_otp(
    state: web::Data<AppState>,
    request: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔑 POST /users/verify-otp - email: {}", request.email);
    let auth = auth_service::verify_otp(&state, &request).await?;
    signed_in(&state.config, "Email verified successfully", auth)
}

#[utoipa::path(
    post,
    path = "/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials"),
        (status = 403, description = "Email not verified or account inactive"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /users/login - email: {}", request.email);
    let auth = auth_service::login(&state, &request).await?;
    log::info!("✅ Login successful: {}", auth.user.email);
    signed_in(&state.config, "Login successful", auth)
}

#[utoipa::path(
    post,
    path = "/users/google",
    tag = "Users",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Signed in with Google", body = AuthResponse),
        (status = 401, description = "Invalid Google ID token")
    )
)]
pub async fn google_login(
    state: web::Data<AppState>,
    request: web::Json<GoogleLoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /users/google");
    let auth = auth_service::google_login(&state, &request).await?;
    signed_in(&state.config, "Google login successful", auth)
}

#[utoipa::path(
    post,
    path = "/users/refresh",
    tag = "Users",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid or revoked refresh token")
    )
)]
pub async fn refresh_token(
    state: web::Data<AppState>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔄 POST /users/refresh");
    let auth = auth_service::refresh_token(&state, &request).await?;
    signed_in(&state.config, "Token refreshed", auth)
}

#[utoipa::path(
    post,
    path = "/users/complete-asha",
    tag = "Users",
    request_body = CompleteAshaRequest,
    responses(
        (status = 200, description = "ASHA profile linked, tokens re-issued", body = CompleteAshaResponse),
        (status = 400, description = "Profile already completed or ASHA ID taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_asha(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    request: web::Json<CompleteAshaRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🩺 POST /users/complete-asha - user: {}", user.email);
    let done = auth_service::complete_asha(&state, &user, &request).await?;
    let cookie = auth_cookie(&state.config, &done.token);
    with_cookie(response::ok("ASHA registration completed", done), &cookie)
}

#[utoipa::path(
    post,
    path = "/users/create",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Invalid input or email already registered"),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 POST /users/create - admin: {}", user.email);
    let created = auth_service::create_user(&state, &user, &request).await?;
    Ok(response::created("User created", created))
}

#[utoipa::path(
    get,
    path = "/users/get_user",
    tag = "Users",
    responses(
        (status = 200, description = "Current user", body = CurrentUserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let current = auth_service::get_current_user(&state, &user).await?;
    Ok(response::ok("User fetched", current))
}

#[utoipa::path(
    post,
    path = "/users/logout",
    tag = "Users",
    responses(
        (status = 200, description = "Logged out, refresh tokens revoked")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👋 POST /users/logout - user: {}", user.email);
    auth_service::logout(&state, &user).await?;

    let mut cookie = auth_cookie(&state.config, "");
    cookie.make_removal();
    with_cookie(response::message("Logged out successfully"), &cookie)
}

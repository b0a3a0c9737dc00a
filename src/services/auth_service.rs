use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{
    normalize_email, AshaWorker, AshaWorkerInfo, CompleteAshaRequest, Role, User, UserInfo,
};
use crate::services::email_service::otp_email;
use crate::state::AppState;
use crate::utils::{AppError, AppResult};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
    pub token_type: TokenType,
    pub ver: u32, // user's token_version at issue time
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<ObjectId> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::unauthorized("Malformed token subject"))
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendOtpRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SendOtpResponse {
    pub email: String,
    pub verification_token: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Admin provisioning of an already-verified account.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub plan: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CompleteAshaResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserInfo,
    pub asha_worker: AshaWorkerInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CurrentUserResponse {
    pub user: UserInfo,
    pub asha_worker: Option<AshaWorkerInfo>,
}

fn bson_now_plus(duration: Duration) -> BsonDateTime {
    BsonDateTime::from_millis((Utc::now() + duration).timestamp_millis())
}

fn is_expired(at: BsonDateTime) -> bool {
    at.timestamp_millis() <= Utc::now().timestamp_millis()
}

pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}

fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request("Invalid email address"))
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

// Generate a signed token of the given type
pub fn generate_token(jwt: &JwtConfig, user: &User, token_type: TokenType) -> AppResult<String> {
    let now = Utc::now();
    let ttl = match token_type {
        TokenType::Access => Duration::minutes(jwt.access_ttl_minutes),
        TokenType::Refresh => Duration::days(jwt.refresh_ttl_days),
    };

    let claims = Claims {
        sub: user.id_hex(),
        email: user.email.clone(),
        role: user.role,
        is_admin: user.is_admin,
        token_type,
        ver: user.token_version,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify a token and check it is of the expected type
pub fn verify_token(jwt: &JwtConfig, token: &str, expected: TokenType) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);
    validation.set_issuer(&[jwt.issuer.as_str()]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )?
    .claims;

    if claims.token_type != expected {
        return Err(AppError::unauthorized("Wrong token type"));
    }
    Ok(claims)
}

fn issue_tokens(jwt: &JwtConfig, user: &User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        token: generate_token(jwt, user, TokenType::Access)?,
        refresh_token: generate_token(jwt, user, TokenType::Refresh)?,
        user: UserInfo::from(user),
    })
}

async fn load_user(state: &AppState, claims: &Claims) -> AppResult<User> {
    state
        .users
        .find_by_id(&claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Starts (or restarts) email registration: stores a hashed OTP on an
/// unverified account and mails the code.
pub async fn send_otp(state: &AppState, request: &SendOtpRequest) -> AppResult<SendOtpResponse> {
    let email = normalize_email(&request.email);
    validate_email(&email)?;
    validate_password(&request.password)?;

    let existing = state.users.find_by_email(&email).await?;
    if existing.as_ref().map(|u| u.is_verified).unwrap_or(false) {
        return Err(AppError::bad_request("User already exists"));
    }

    let cost = state.config.bcrypt_cost;
    let otp = generate_otp();
    let verification_token = Uuid::new_v4().to_string();
    let expires = bson_now_plus(Duration::minutes(state.config.otp_ttl_minutes));

    let is_new = existing.is_none();
    let mut user = existing.unwrap_or_else(|| User::new(&email));
    user.password = Some(hash(&request.password, cost)?);
    user.name = request.name.clone().or(user.name);
    user.phone = request.phone.clone().or(user.phone);
    user.otp_hash = Some(hash(&otp, cost)?);
    user.verification_token = Some(verification_token.clone());
    user.verification_expires = Some(expires);
    user.updated_at = BsonDateTime::now();

    if is_new {
        state.users.insert(&user).await?;
    } else {
        state.users.replace(&user).await?;
    }

    let message = otp_email(&state.config.email.from, &email, &otp, state.config.otp_ttl_minutes);
    state.mailer.send(message).await?;

    log::info!("📨 OTP issued for {} (new account: {})", email, is_new);

    Ok(SendOtpResponse {
        email,
        verification_token,
        expires_at: expires.timestamp_millis(),
    })
}

/// Confirms the OTP, activates the account and signs the user in.
pub async fn verify_otp(state: &AppState, request: &VerifyOtpRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&request.email);

    let mut user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("No pending registration for this email"))?;

    if user.is_verified {
        return Err(AppError::bad_request("User already verified"));
    }

    let expires = user
        .verification_expires
        .ok_or_else(|| AppError::bad_request("No OTP was requested for this email"))?;
    if is_expired(expires) {
        return Err(AppError::bad_request("OTP has expired, request a new one"));
    }

    let otp_hash = user
        .otp_hash
        .as_deref()
        .ok_or_else(|| AppError::bad_request("No OTP was requested for this email"))?;
    if !verify(request.otp.trim(), otp_hash)? {
        return Err(AppError::bad_request("Invalid OTP"));
    }

    user.is_verified = true;
    user.is_active = true;
    user.clear_verification();
    user.last_login = Some(BsonDateTime::now());
    user.updated_at = BsonDateTime::now();
    state.users.replace(&user).await?;

    log::info!("✅ Email verified: {}", email);

    issue_tokens(&state.config.jwt, &user)
}

/// Attaches the ASHA worker profile and grants the `asha_worker` role.
pub async fn complete_asha(
    state: &AppState,
    claims: &Claims,
    request: &CompleteAshaRequest,
) -> AppResult<CompleteAshaResponse> {
    let mut user = load_user(state, claims).await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("stored user has no _id".into()))?;

    if !user.is_verified {
        return Err(AppError::forbidden("Verify your email before completing the ASHA profile"));
    }
    if user.asha_worker_id.is_some() || state.asha_workers.find_by_user(&user_id).await?.is_some() {
        return Err(AppError::bad_request("ASHA profile already completed"));
    }

    let asha_id = request.asha_id.trim().to_uppercase();
    if asha_id.is_empty() {
        return Err(AppError::bad_request("ASHA ID is required"));
    }
    if !request.location.is_valid() {
        return Err(AppError::bad_request("Invalid location coordinates"));
    }
    if state.asha_workers.find_by_asha_id(&asha_id).await?.is_some() {
        return Err(AppError::bad_request("ASHA ID already registered"));
    }

    let mut worker = AshaWorker {
        id: None,
        user_id,
        asha_id,
        location: request.location,
        address: request.address.clone(),
        district: request.district.clone(),
        state: request.state.clone(),
        qualifications: request.qualifications.clone(),
        languages: request.languages.clone(),
        experience_years: request.experience_years,
        phone: request.phone.clone().or_else(|| user.phone.clone()),
        created_at: BsonDateTime::now(),
    };
    let worker_id = state.asha_workers.insert(&worker).await?;
    worker.id = Some(worker_id);

    user.role = Role::AshaWorker;
    user.asha_worker_id = Some(worker_id);
    if user.phone.is_none() {
        user.phone = worker.phone.clone();
    }
    user.updated_at = BsonDateTime::now();
    if let Err(e) = state.users.replace(&user).await {
        // Drop the profile so its unique keys do not block a retry
        log::error!("❌ Failed to link ASHA profile {} to {}: {}", worker.asha_id, user.email, e);
        if let Err(cleanup) = state.asha_workers.delete(&worker_id).await {
            log::warn!("⚠️  Could not remove unlinked ASHA profile {}: {}", worker.asha_id, cleanup);
        }
        return Err(e);
    }

    log::info!("✅ ASHA profile {} linked to {}", worker.asha_id, user.email);

    let tokens = issue_tokens(&state.config.jwt, &user)?;
    Ok(CompleteAshaResponse {
        token: tokens.token,
        refresh_token: tokens.refresh_token,
        user: tokens.user,
        asha_worker: AshaWorkerInfo::from(worker),
    })
}

pub async fn create_user(
    state: &AppState,
    claims: &Claims,
    request: &CreateUserRequest,
) -> AppResult<UserInfo> {
    if !claims.is_admin {
        return Err(AppError::forbidden("Only administrators can create users"));
    }

    let email = normalize_email(&request.email);
    validate_email(&email)?;
    validate_password(&request.password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::bad_request("User already exists"));
    }

    let mut user = User::new(&email);
    user.password = Some(hash(&request.password, state.config.bcrypt_cost)?);
    user.name = request.name.clone();
    user.phone = request.phone.clone();
    user.is_admin = request.is_admin;
    user.plan = request.plan.clone();
    user.is_verified = true;
    user.is_active = true;

    let id = state.users.insert(&user).await?;
    user.id = Some(id);

    log::info!("✅ User {} created by admin {}", email, claims.email);

    Ok(UserInfo::from(&user))
}

pub async fn login(state: &AppState, request: &LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&request.email);

    let mut user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let stored_password = user
        .password
        .as_deref()
        .ok_or_else(|| AppError::bad_request("This account uses Google sign-in"))?;

    if !verify(&request.password, stored_password)? {
        return Err(AppError::bad_request("Invalid credentials"));
    }

    if !user.is_verified {
        return Err(AppError::forbidden("Email not verified"));
    }
    if !user.is_active {
        return Err(AppError::forbidden("Account is inactive"));
    }

    user.last_login = Some(BsonDateTime::now());
    state.users.replace(&user).await?;

    issue_tokens(&state.config.jwt, &user)
}

/// Signs in with a Google ID token: matches by Google id, then links by
/// email, otherwise creates a verified account.
pub async fn google_login(state: &AppState, request: &GoogleLoginRequest) -> AppResult<AuthResponse> {
    let identity = state.google.verify(&request.id_token).await?;
    let email = normalize_email(&identity.email);

    let user = if let Some(mut user) = state.users.find_by_google_id(&identity.google_id).await? {
        log::info!("✅ Found existing user by google_id: {}", user.email);
        user.name = identity.name.clone().or(user.name);
        user.picture = identity.picture.clone().or(user.picture);
        user
    } else if let Some(mut user) = state.users.find_by_email(&email).await? {
        log::info!("✅ Linking Google account to existing user: {}", user.email);
        if !user.is_verified {
            // Google has proven ownership of the address. The pending
            // password was chosen by whoever requested the OTP.
            user.is_verified = true;
            user.is_active = true;
            user.password = None;
            user.token_version = user.token_version.wrapping_add(1);
            user.clear_verification();
        }
        user.google_id = Some(identity.google_id.clone());
        user.name = user.name.or(identity.name.clone());
        user.picture = identity.picture.clone().or(user.picture);
        user
    } else {
        log::info!("✅ Creating new Google user: {}", email);
        let mut user = User::new(&email);
        user.google_id = Some(identity.google_id.clone());
        user.name = identity.name.clone();
        user.picture = identity.picture.clone();
        user.is_verified = true;
        user.is_active = true;
        user.last_login = Some(BsonDateTime::now());
        let id = state.users.insert(&user).await?;
        user.id = Some(id);
        return issue_tokens(&state.config.jwt, &user);
    };

    if !user.is_active {
        return Err(AppError::forbidden("Account is inactive"));
    }

    let mut user = user;
    user.last_login = Some(BsonDateTime::now());
    user.updated_at = BsonDateTime::now();
    state.users.replace(&user).await?;

    issue_tokens(&state.config.jwt, &user)
}

pub async fn get_current_user(state: &AppState, claims: &Claims) -> AppResult<CurrentUserResponse> {
    let user = load_user(state, claims).await?;

    let asha_worker = match user.id {
        Some(id) if user.role == Role::AshaWorker => state
            .asha_workers
            .find_by_user(&id)
            .await?
            .map(AshaWorkerInfo::from),
        _ => None,
    };

    Ok(CurrentUserResponse {
        user: UserInfo::from(&user),
        asha_worker,
    })
}

pub async fn refresh_token(state: &AppState, request: &RefreshTokenRequest) -> AppResult<AuthResponse> {
    let claims = verify_token(&state.config.jwt, &request.refresh_token, TokenType::Refresh)?;
    let user = load_user(state, &claims).await?;

    if claims.ver != user.token_version {
        return Err(AppError::unauthorized("Refresh token has been revoked"));
    }
    if !user.is_active {
        return Err(AppError::forbidden("Account is inactive"));
    }

    issue_tokens(&state.config.jwt, &user)
}

/// Revokes every outstanding refresh token of the user.
pub async fn logout(state: &AppState, claims: &Claims) -> AppResult<()> {
    let mut user = load_user(state, claims).await?;
    user.token_version = user.token_version.wrapping_add(1);
    user.updated_at = BsonDateTime::now();
    state.users.replace(&user).await?;
    log::info!("👋 Logged out {}", user.email);
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::state::testing::TestContext;

    /// Registers and verifies a user, returning its access-token claims.
    pub async fn verified_user(ctx: &TestContext, email: &str) -> Claims {
        let state = &ctx.state;
        send_otp(
            state,
            &SendOtpRequest {
                email: email.to_string(),
                password: "secret123".into(),
                name: Some("Test User".into()),
                phone: None,
            },
        )
        .await
        .unwrap();
        let otp = ctx.mailer.last_otp_for(email).unwrap();
        let auth = verify_otp(state, &VerifyOtpRequest { email: email.to_string(), otp })
            .await
            .unwrap();
        verify_token(&state.config.jwt, &auth.token, TokenType::Access).unwrap()
    }

    pub fn asha_request(asha_id: &str) -> CompleteAshaRequest {
        CompleteAshaRequest {
            asha_id: asha_id.to_string(),
            location: crate::models::GeoPoint { lat: 25.6, lng: 85.1 },
            address: Some("Ward 4".into()),
            district: Some("Patna".into()),
            state: Some("Bihar".into()),
            qualifications: vec!["10th pass".into()],
            languages: vec!["Hindi".into()],
            experience_years: 3,
            phone: Some("9876543210".into()),
        }
    }

    /// A verified user that has completed the ASHA profile.
    pub async fn asha_worker(ctx: &TestContext, email: &str, asha_id: &str) -> Claims {
        let claims = verified_user(ctx, email).await;
        let done = complete_asha(&ctx.state, &claims, &asha_request(asha_id)).await.unwrap();
        verify_token(&ctx.state.config.jwt, &done.token, TokenType::Access).unwrap()
    }
}

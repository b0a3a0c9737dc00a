use actix_web::{web, HttpResponse};
use serde_json::Value;

use crate::middleware::auth::Claims;
use crate::state::AppState;
use crate::utils::{response, AppError};

#[utoipa::path(
    post,
    path = "/ai/predict",
    tag = "AI",
    request_body = Object,
    responses(
        (status = 200, description = "Disease prediction; `fallback: true` when the AI service was unavailable", body = Object)
    ),
    security(("bearer_auth" = []))
)]
pub async fn predict(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    log::info!("🤖 POST /ai/predict - user: {}", user.email);
    let prediction = state.ai.predict_with_fallback(&body).await;
    Ok(response::ok("Prediction generated", prediction))
}

#[utoipa::path(
    post,
    path = "/ai/consultation",
    tag = "AI",
    request_body = Object,
    responses(
        (status = 200, description = "Full consultation", body = Object),
        (status = 502, description = "AI service unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn consultation(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    log::info!("🤖 POST /ai/consultation - user: {}", user.email);
    let result = state.ai.full_consultation(&body).await?;
    Ok(response::ok("Consultation generated", result))
}

#[utoipa::path(
    post,
    path = "/ai/lifestyle",
    tag = "AI",
    request_body = Object,
    responses(
        (status = 200, description = "Lifestyle recommendations", body = Object),
        (status = 502, description = "AI service unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn lifestyle(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    log::info!("🤖 POST /ai/lifestyle - user: {}", user.email);
    let result = state.ai.lifestyle_recommendations(&body).await?;
    Ok(response::ok("Recommendations generated", result))
}

#[utoipa::path(
    get,
    path = "/ai/symptoms",
    tag = "AI",
    responses(
        (status = 200, description = "Symptoms known to the model", body = Object),
        (status = 502, description = "AI service unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn symptoms(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let result = state.ai.symptoms().await?;
    Ok(response::ok("Symptoms fetched", result))
}

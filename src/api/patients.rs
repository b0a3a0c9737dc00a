use actix_web::{web, HttpResponse};

use crate::middleware::auth::Claims;
use crate::models::{
    CreatePatientRequest, PatientListQuery, PatientListResponse, PatientResponse,
    UpdatePatientRequest,
};
use crate::services::patient_service;
use crate::state::AppState;
use crate::utils::{response, AppError};

#[utoipa::path(
    post,
    path = "/patients",
    tag = "Patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient registered", body = PatientResponse),
        (status = 400, description = "Invalid input or Aadhar already registered"),
        (status = 403, description = "Caller is not an ASHA worker")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    request: web::Json<CreatePatientRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🧾 POST /patients - by: {}", user.email);
    let patient = patient_service::create_patient(&state, &user, &request).await?;
    Ok(response::created("Patient registered successfully", patient))
}

#[utoipa::path(
    get,
    path = "/patients",
    tag = "Patients",
    params(PatientListQuery),
    responses(
        (status = 200, description = "Patients registered by the caller", body = PatientListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    query: web::Query<PatientListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = patient_service::list_patients(&state, &user, &query).await?;
    Ok(response::ok("Patients fetched", page))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    tag = "Patients",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientResponse),
        (status = 404, description = "No such patient for this caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let patient = patient_service::get_patient(&state, &user, &path).await?;
    Ok(response::ok("Patient fetched", patient))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    tag = "Patients",
    params(("id" = String, Path, description = "Patient id")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = PatientResponse),
        (status = 400, description = "Invalid input or Aadhar already registered"),
        (status = 404, description = "No such patient for this caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdatePatientRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /patients/{} - by: {}", path, user.email);
    let patient = patient_service::update_patient(&state, &user, &path, &request).await?;
    Ok(response::ok("Patient updated successfully", patient))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    tag = "Patients",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient and hosted images deleted"),
        (status = 404, description = "No such patient for this caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_patient(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️ DELETE /patients/{} - by: {}", path, user.email);
    patient_service::delete_patient(&state, &user, &path).await?;
    Ok(response::message("Patient deleted successfully"))
}
